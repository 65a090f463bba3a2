//! Stockroom Core - Shared types library.
//!
//! This crate provides common types used across all Stockroom components:
//! - `outbound` - Outbound shipment draft engine and API client
//! - `cli` - Command-line tools for replaying drafts and allocating stock
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, colours,
//!   statuses, and the generic list sorter

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
