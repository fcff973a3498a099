//! Fiscal year span definitions.
//!
//! A report always covers a fixed, ascending range of fiscal years. The span
//! drives the column set of the wide table and the ratio table: column `i`
//! in every derived series corresponds to year `first + i`.

use serde::{Deserialize, Serialize};

/// An inclusive, ascending range of fiscal years.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiscalSpan {
    first: i32,
    last: i32,
}

impl FiscalSpan {
    /// Creates a span covering `first..=last`.
    ///
    /// Swaps the bounds if they are given in descending order.
    #[must_use]
    pub const fn new(first: i32, last: i32) -> Self {
        if first <= last {
            Self { first, last }
        } else {
            Self {
                first: last,
                last: first,
            }
        }
    }

    /// First (oldest) year of the span.
    #[must_use]
    pub const fn first(&self) -> i32 {
        self.first
    }

    /// Last (most recent) year of the span.
    #[must_use]
    pub const fn last(&self) -> i32 {
        self.last
    }

    /// Number of years covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    /// Always false: a span covers at least one year.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterates the years in ascending order.
    pub fn years(&self) -> impl Iterator<Item = i32> + use<> {
        self.first..=self.last
    }

    /// Column labels for the span, oldest first (e.g. `["2020", ..., "2024"]`).
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.years().map(|y| y.to_string()).collect()
    }

    /// Position of `year` within the span, if covered.
    #[must_use]
    pub fn index_of(&self, year: i32) -> Option<usize> {
        (year >= self.first && year <= self.last).then(|| (year - self.first) as usize)
    }
}

impl Default for FiscalSpan {
    /// The five-year window the report generator was built around.
    fn default() -> Self {
        Self::new(2020, 2024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_labels() {
        let span = FiscalSpan::new(2020, 2024);
        assert_eq!(span.len(), 5);
        assert_eq!(span.labels(), ["2020", "2021", "2022", "2023", "2024"]);
    }

    #[test]
    fn test_index_of() {
        let span = FiscalSpan::default();
        assert_eq!(span.index_of(2020), Some(0));
        assert_eq!(span.index_of(2024), Some(4));
        assert_eq!(span.index_of(2019), None);
        assert_eq!(span.index_of(2025), None);
    }

    #[test]
    fn test_reversed_bounds() {
        let span = FiscalSpan::new(2024, 2020);
        assert_eq!(span.first(), 2020);
        assert_eq!(span.last(), 2024);
    }
}
