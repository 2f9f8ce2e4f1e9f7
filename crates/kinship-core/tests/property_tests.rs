//! # Property-Based Tests
//!
//! Ordering, naming and search invariants checked with proptest.

use kinship_core::fuzzy_date::{sort_year, year_of};
use kinship_core::index::tokenize;
use kinship_core::{
    FamilyDetails, FamilyId, Genealogy, IndividualId, PersonDetails, Sex, formal_name, full_name,
};
use proptest::collection::vec;
use proptest::prelude::*;

fn sex() -> impl Strategy<Value = Sex> {
    prop_oneof![Just(Sex::Male), Just(Sex::Female), Just(Sex::Unknown)]
}

fn name() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{0,8}"
}

/// A birth date string that may or may not contain a year.
fn birth() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        (1500u32..2024).prop_map(|y| y.to_string()),
        (1500u32..2024).prop_map(|y| format!("abt {y}")),
        (1u32..99).prop_map(|d| format!("{d}/{d}")),
    ]
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Only a run of exactly four digits is a year, and the first one wins.
    #[test]
    fn year_of_finds_first_four_digit_run(a in 1000u32..10000, b in 1000u32..10000, short in 0u32..1000) {
        prop_assert_eq!(year_of(&format!("{short} {a} {b}")), Some(a));
        prop_assert_eq!(year_of(&format!("{a}{b}")), None);
        prop_assert_eq!(year_of(&short.to_string()), None);
        prop_assert_eq!(sort_year(&short.to_string()), 0);
    }

    /// Names never carry doubled or dangling separators.
    #[test]
    fn names_have_no_stray_separators(first in "[a-z]{0,5}", last in "[a-z]{0,5}") {
        let formal = formal_name(&first, &last);
        let full = full_name(&first, &last);
        prop_assert!(!formal.starts_with(", ") && !formal.ends_with(", "));
        prop_assert!(!full.starts_with(' ') && !full.ends_with(' '));
        prop_assert_eq!(formal.is_empty(), first.is_empty() && last.is_empty());
    }

    /// Tokens are lowercase, alphabetic and non-empty.
    #[test]
    fn tokens_are_normalized(text in "[a-zA-Z\u{e9}\u{eb}\u{fc}\u{df}0-9' &.-]{0,40}") {
        for token in tokenize(&text) {
            prop_assert!(!token.is_empty());
            prop_assert!(token.chars().all(char::is_alphabetic));
            prop_assert_eq!(token.to_lowercase(), token.clone());
        }
    }

    /// children() is always sorted by birth year, unknown first.
    #[test]
    fn children_sorted_by_birth(dates in vec(birth(), 1..12)) {
        let mut g = Genealogy::new();
        let parent = g
            .add_individual(PersonDetails::named("P", "Parent", Sex::Male))
            .expect("add");
        let f = g.create_family(FamilyDetails::default(), &[parent]).expect("family");
        for (n, date) in dates.iter().enumerate() {
            let kid = g
                .add_individual(PersonDetails::named(format!("K{n}"), "Kid", Sex::Unknown).born(date.clone()))
                .expect("add");
            g.set_child_in_family(kid, f).expect("link");
        }

        let years: Vec<u32> = g
            .children(parent)
            .expect("children")
            .iter()
            .map(|c| sort_year(&c.details.birth.date))
            .collect();
        prop_assert!(years.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(years.len(), dates.len());
    }

    /// Family names do not depend on the order partners were attached.
    #[test]
    fn family_name_ignores_attach_order(people in vec((name(), name(), sex()), 1..5)) {
        let mut g = Genealogy::new();
        let ids: Vec<IndividualId> = people
            .iter()
            .map(|(first, last, sex)| {
                g.add_individual(PersonDetails::named(first.clone(), last.clone(), *sex))
                    .expect("add")
            })
            .collect();
        let forward = g.create_family(FamilyDetails::default(), &ids).expect("family");
        let reversed: Vec<IndividualId> = ids.iter().rev().copied().collect();
        let backward = g.create_family(FamilyDetails::default(), &reversed).expect("family");

        let a = g.family(forward).expect("get").name;
        let b = g.family(backward).expect("get").name;
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(g.recompute_family_name(forward).expect("recompute"), a);
    }

    /// Searching for a partner's full name always finds their family.
    #[test]
    fn search_finds_partner(first in name(), last in name()) {
        let mut g = Genealogy::new();
        let id = g
            .add_individual(PersonDetails::named(first.clone(), last.clone(), Sex::Unknown))
            .expect("add");
        let f = g.create_family(FamilyDetails::default(), &[id]).expect("family");

        let hits: Vec<FamilyId> = g
            .search(&format!("{first} {last}"))
            .expect("search")
            .into_iter()
            .map(|fam| fam.id)
            .collect();
        prop_assert_eq!(hits, vec![f]);
    }
}
