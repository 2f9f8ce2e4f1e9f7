//! # Fuzzy Dates
//!
//! Reduces loosely formatted date text ("abt 1850", "12 MAR 1901", "1890s?")
//! to an optional year.
//!
//! The first maximal run of exactly four ASCII digits is the year. Shorter or
//! longer runs are skipped, so "05/06/07" has no year and "ABT 18500" has none
//! either. A missing year is never an error: it renders as `?` and sorts as 0.

use crate::primitives::{UNKNOWN_SORT_YEAR, UNKNOWN_YEAR, YEAR_DIGITS};

/// Extract the year from a free-form date string.
#[must_use]
pub fn year_of(text: &str) -> Option<u32> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i - start == YEAR_DIGITS {
            // Four ASCII digits always fit in u32.
            return text[start..i].parse().ok();
        }
    }
    None
}

/// Sort key for a date: the year, or 0 when unknown.
#[must_use]
pub fn sort_year(text: &str) -> u32 {
    year_of(text).unwrap_or(UNKNOWN_SORT_YEAR)
}

/// Render the year for display, `?` when unknown.
#[must_use]
pub fn year_label(text: &str) -> String {
    year_of(text).map_or_else(|| UNKNOWN_YEAR.to_string(), |y| y.to_string())
}
