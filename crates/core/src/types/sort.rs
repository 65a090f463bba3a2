//! Generic, direction-aware sorting for list views.
//!
//! Records expose their sortable columns through [`Sortable`]; [`compare`]
//! orders two records by a single column, and [`sort_records`] applies a
//! [`SortBy`] to a slice with a stable sort, so records with equal keys keep
//! their relative order.

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single comparable field value extracted from a record.
///
/// Present values order by their variant's own ordering. [`compare`] places
/// [`SortValue::Missing`] after every present value in both directions.
/// Records of one type always yield the same variant for a given column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue<'a> {
    Missing,
    Integer(i64),
    Decimal(Decimal),
    Date(NaiveDate),
    Text(Cow<'a, str>),
}

impl<'a> SortValue<'a> {
    /// Borrowed text value.
    #[must_use]
    pub const fn text(value: &'a str) -> Self {
        Self::Text(Cow::Borrowed(value))
    }
}

impl From<Option<NaiveDate>> for SortValue<'_> {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(Self::Missing, Self::Date)
    }
}

impl From<Option<Decimal>> for SortValue<'_> {
    fn from(value: Option<Decimal>) -> Self {
        value.map_or(Self::Missing, Self::Decimal)
    }
}

impl From<u32> for SortValue<'_> {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u64> for SortValue<'_> {
    fn from(value: u64) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// A record whose columns can be used as sort keys.
pub trait Sortable {
    /// The column identifier (usually a fieldless enum).
    type Key: Copy + Eq;

    /// Extract the value of `key` from this record.
    fn sort_value(&self, key: Self::Key) -> SortValue<'_>;
}

/// Sort direction token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    const fn from_desc(is_desc: bool) -> Self {
        if is_desc { Self::Desc } else { Self::Asc }
    }
}

/// Current sort state of a list: column, descending flag and derived direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortBy<K> {
    pub key: K,
    pub is_desc: bool,
    pub direction: Direction,
}

impl<K: Copy + Eq> SortBy<K> {
    /// Create a sort state; the direction is derived from `is_desc`.
    #[must_use]
    pub const fn new(key: K, is_desc: bool) -> Self {
        Self {
            key,
            is_desc,
            direction: Direction::from_desc(is_desc),
        }
    }

    /// The sort state after the user clicks `column`.
    ///
    /// Clicking the current column flips the direction. Clicking any other
    /// column selects it, starting descending.
    #[must_use]
    pub fn toggled(&self, column: K) -> Self {
        if column == self.key {
            Self::new(column, !self.is_desc)
        } else {
            Self::new(column, true)
        }
    }
}

/// Compare two records by a single column.
///
/// Missing values sort last whichever way the column is ordered.
pub fn compare<T: Sortable>(a: &T, b: &T, key: T::Key, descending: bool) -> Ordering {
    match (a.sort_value(key), b.sort_value(key)) {
        (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
        (SortValue::Missing, _) => Ordering::Greater,
        (_, SortValue::Missing) => Ordering::Less,
        (a, b) if descending => b.cmp(&a),
        (a, b) => a.cmp(&b),
    }
}

/// Build a comparator closure for `key` and direction, for use with `sort_by`.
pub fn data_sorter<T: Sortable>(key: T::Key, descending: bool) -> impl Fn(&T, &T) -> Ordering {
    move |a, b| compare(a, b, key, descending)
}

/// Stable-sort `records` according to `sort_by`.
pub fn sort_records<T: Sortable>(records: &mut [T], sort_by: &SortBy<T::Key>) {
    records.sort_by(data_sorter(sort_by.key, sort_by.is_desc));
}
