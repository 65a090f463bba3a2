//! Pack sizes offered when issuing an item.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::allocation::BatchRow;
use crate::stock::StockLine;

/// Anything that offers stock in a fixed pack size.
pub trait PackSizeSource {
    fn pack_size(&self) -> u32;
    fn available_number_of_packs(&self) -> u32;
    fn on_hold(&self) -> bool;

    /// Whether stock can currently be issued from this source.
    fn is_issuable(&self) -> bool {
        self.available_number_of_packs() > 0 && !self.on_hold()
    }
}

impl PackSizeSource for BatchRow {
    fn pack_size(&self) -> u32 {
        self.pack_size
    }

    fn available_number_of_packs(&self) -> u32 {
        self.available_number_of_packs
    }

    fn on_hold(&self) -> bool {
        self.on_hold
    }
}

impl PackSizeSource for StockLine {
    fn pack_size(&self) -> u32 {
        self.pack_size
    }

    fn available_number_of_packs(&self) -> u32 {
        self.available_number_of_packs
    }

    fn on_hold(&self) -> bool {
        self.on_hold
    }
}

/// Ascending distinct pack sizes of the sources stock can be issued from.
#[must_use]
pub fn distinct_pack_sizes<S: PackSizeSource>(sources: &[S]) -> Vec<u32> {
    sources
        .iter()
        .filter(|source| source.is_issuable())
        .map(PackSizeSource::pack_size)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The pack size the user issues in, chosen from what is on offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackSizeSelector {
    options: Vec<u32>,
    selected: Option<u32>,
}

impl PackSizeSelector {
    /// A selector over `sources`, defaulting to the smallest pack size.
    #[must_use]
    pub fn new<S: PackSizeSource>(sources: &[S]) -> Self {
        let mut selector = Self::default();
        selector.refresh(sources);
        selector
    }

    /// Re-derive the options after the sources changed.
    ///
    /// The current choice is kept while it is still offered; otherwise the
    /// smallest size is selected, or none when nothing is offered.
    pub fn refresh<S: PackSizeSource>(&mut self, sources: &[S]) {
        self.options = distinct_pack_sizes(sources);
        self.selected = match self.selected {
            Some(size) if self.options.contains(&size) => Some(size),
            _ => self.options.first().copied(),
        };
    }

    /// Choose `pack_size`. Sizes not on offer are ignored and `false` is
    /// returned.
    pub fn select(&mut self, pack_size: u32) -> bool {
        if self.options.contains(&pack_size) {
            self.selected = Some(pack_size);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub const fn selected(&self) -> Option<u32> {
        self.selected
    }

    #[must_use]
    pub fn options(&self) -> &[u32] {
        &self.options
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use stockroom_core::StockLineId;

    fn row(id: &str, pack_size: u32, available: u32, on_hold: bool) -> BatchRow {
        BatchRow {
            id: StockLineId::new(id),
            pack_size,
            available_number_of_packs: available,
            on_hold,
            ..BatchRow::placeholder()
        }
    }

    #[test]
    fn test_distinct_sizes_are_sorted_and_filtered() {
        let rows = vec![
            row("a", 10, 1, false),
            row("b", 1, 5, false),
            row("c", 10, 2, false),
            row("d", 50, 0, false),
            row("e", 25, 4, true),
        ];
        assert_eq!(distinct_pack_sizes(&rows), vec![1, 10]);
    }

    #[test]
    fn test_selection_defaults_to_smallest() {
        let selector = PackSizeSelector::new(&[row("a", 12, 1, false), row("b", 6, 1, false)]);
        assert_eq!(selector.options(), &[6, 12]);
        assert_eq!(selector.selected(), Some(6));
    }

    #[test]
    fn test_selection_survives_refresh_while_offered() {
        let mut selector = PackSizeSelector::new(&[row("a", 12, 1, false), row("b", 6, 1, false)]);
        assert!(selector.select(12));
        assert!(!selector.select(7));
        assert_eq!(selector.selected(), Some(12));

        selector.refresh(&[row("a", 12, 3, false), row("c", 1, 1, false)]);
        assert_eq!(selector.selected(), Some(12));

        selector.refresh(&[row("c", 1, 1, false), row("b", 6, 1, false)]);
        assert_eq!(selector.selected(), Some(1));
    }

    #[test]
    fn test_selection_clears_when_nothing_offered() {
        let mut selector = PackSizeSelector::new(&[row("a", 12, 1, false)]);
        selector.refresh(&[row("a", 12, 0, false)]);
        assert!(selector.options().is_empty());
        assert_eq!(selector.selected(), None);
        assert_eq!(PackSizeSelector::new::<BatchRow>(&[]).selected(), None);
    }
}
