//! Persistable line changes of a draft.

use serde::Serialize;

use crate::draft::Draft;
use crate::line::Line;

/// Dirty lines of a draft, grouped by what the server must do with them.
///
/// A deleted line never appears as an insert or update. A line that was
/// created and deleted locally never reached the server and is left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChanges {
    pub inserts: Vec<Line>,
    pub updates: Vec<Line>,
    pub deletes: Vec<Line>,
}

impl LineChanges {
    #[must_use]
    pub fn from_draft(draft: &Draft) -> Self {
        let mut changes = Self::default();
        for line in draft.lines() {
            match (line.is_created, line.is_updated, line.is_deleted) {
                (true, _, false) => changes.inserts.push(line.clone()),
                (false, true, false) => changes.updates.push(line.clone()),
                (false, _, true) => changes.deletes.push(line.clone()),
                _ => {}
            }
        }
        changes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Total number of changed lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }
}
