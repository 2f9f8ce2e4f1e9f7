//! # Name Formatting
//!
//! Display strings derived from a person's name fields and fuzzy dates.
//!
//! - `full_name`: "Alice Aitken"
//! - `formal_name`: "Aitken, Alice"
//! - `lifetime`: "(1900-?)", or "" when both years are unknown
//! - `display_name`: "Aitken, Alice (1900-?)", the string form of an individual

use crate::fuzzy_date::{year_label, year_of};
use crate::types::{Individual, PersonDetails};
use std::fmt;

/// First name then last name, skipping empty parts.
#[must_use]
pub fn full_name(first: &str, last: &str) -> String {
    join_non_empty(first, last, " ")
}

/// Last name, comma, first name, skipping empty parts.
#[must_use]
pub fn formal_name(first: &str, last: &str) -> String {
    join_non_empty(last, first, ", ")
}

/// Life span from birth and death dates.
#[must_use]
pub fn lifetime(birth: &str, death: &str) -> String {
    if year_of(birth).is_none() && year_of(death).is_none() {
        return String::new();
    }
    format!("({}-{})", year_label(birth), year_label(death))
}

/// Formal name followed by the life span.
#[must_use]
pub fn display_name(details: &PersonDetails) -> String {
    let name = formal_name(&details.first_name, &details.last_name);
    let span = lifetime(&details.birth.date, &details.death.date);
    join_non_empty(&name, &span, " ")
}

fn join_non_empty(a: &str, b: &str, sep: &str) -> String {
    let a = a.trim();
    let b = b.trim();
    match (a.is_empty(), b.is_empty()) {
        (true, true) => String::new(),
        (false, true) => a.to_string(),
        (true, false) => b.to_string(),
        (false, false) => format!("{a}{sep}{b}"),
    }
}

impl PersonDetails {
    #[must_use]
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }

    #[must_use]
    pub fn formal_name(&self) -> String {
        formal_name(&self.first_name, &self.last_name)
    }

    #[must_use]
    pub fn lifetime(&self) -> String {
        lifetime(&self.birth.date, &self.death.date)
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_name(&self.details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IndividualId, Sex};

    #[test]
    fn formal_name_cases() {
        assert_eq!(formal_name("", ""), "");
        assert_eq!(formal_name("Alice", "Aitken"), "Aitken, Alice");
        assert_eq!(formal_name("Alice", ""), "Alice");
        assert_eq!(formal_name("", "Aitken"), "Aitken");
    }

    #[test]
    fn full_name_cases() {
        assert_eq!(full_name("Alice", "Aitken"), "Alice Aitken");
        assert_eq!(full_name("", "Aitken"), "Aitken");
        assert_eq!(full_name("Alice", ""), "Alice");
        assert_eq!(full_name("", ""), "");
    }

    #[test]
    fn lifetime_cases() {
        assert_eq!(lifetime("", ""), "");
        assert_eq!(lifetime("1900", ""), "(1900-?)");
        assert_eq!(lifetime("", "d. 1950"), "(?-1950)");
        assert_eq!(lifetime("ABT 1900", "3 MAY 1970"), "(1900-1970)");
        assert_eq!(lifetime("sometime", "later"), "");
    }

    #[test]
    fn display_name_omits_separator_without_lifetime() {
        let details = PersonDetails::named("Alice", "Aitken", Sex::Female);
        assert_eq!(display_name(&details), "Aitken, Alice");

        let details = details.born("1900");
        assert_eq!(display_name(&details), "Aitken, Alice (1900-?)");
    }

    #[test]
    fn display_name_of_nameless_person_with_dates() {
        let details = PersonDetails::default().born("1801").died("1850");
        assert_eq!(display_name(&details), "(1801-1850)");
    }

    #[test]
    fn individual_display_uses_display_name() {
        let ind = Individual::new(
            IndividualId(1),
            PersonDetails::named("Bob", "Baker", Sex::Male).died("1999"),
        );
        assert_eq!(ind.to_string(), "Baker, Bob (?-1999)");
    }
}
