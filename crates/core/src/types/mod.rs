//! Core types for Stockroom.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod colour;
pub mod id;
pub mod price;
pub mod sort;
pub mod status;

pub use colour::{Colour, ColourError};
pub use id::*;
pub use price::Price;
pub use sort::{Direction, SortBy, SortValue, Sortable, compare, data_sorter, sort_records};
pub use status::*;
