//! # Family Name Index
//!
//! An inverted index from normalized name tokens to families, for ranked
//! approximate search over family display names.
//!
//! ## Tokens
//!
//! Text is decomposed (NFD), lowercased and split on whitespace. Every
//! character that is not alphabetic is dropped from each word, combining
//! marks included, so "Zoë O'Keefe" yields `zoe` and `okeefe`.
//!
//! ## Ranking
//!
//! Each distinct query word prefix-matches index tokens. A family scores one
//! point per query word it matches (however many of its tokens match that
//! word). Only the families with the best score are returned, ordered by
//! their cached display name.

use crate::{FamilyId, PersonDetails};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Split text into normalized search tokens.
#[must_use]
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let normalized: String = text.nfd().filter(|c| !is_combining_mark(*c)).collect();
    normalized
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphabetic())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

/// Tokens produced by one person's first and last name.
#[must_use]
pub fn person_tokens(details: &PersonDetails) -> BTreeSet<String> {
    let mut tokens = tokenize(&details.first_name);
    tokens.extend(tokenize(&details.last_name));
    tokens
}

/// Inverted word index over family partner names.
///
/// Uses `BTreeMap` so prefix lookups are range scans and results are
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct FamilyNameIndex {
    /// token -> families whose partners produced it
    entries: BTreeMap<String, BTreeSet<FamilyId>>,
    /// family -> tokens it is listed under, for removal
    family_tokens: BTreeMap<FamilyId, BTreeSet<String>>,
    /// family -> cached display name, for result ordering
    names: BTreeMap<FamilyId, String>,
}

impl FamilyNameIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything indexed for a family.
    ///
    /// `name` is the family's cached display name; `partners` are the name
    /// fields of every current partner.
    pub fn reindex<'a>(
        &mut self,
        family: FamilyId,
        name: &str,
        partners: impl IntoIterator<Item = &'a PersonDetails>,
    ) {
        self.remove(family);

        let tokens: BTreeSet<String> = partners.into_iter().flat_map(person_tokens).collect();
        for token in &tokens {
            self.entries
                .entry(token.clone())
                .or_default()
                .insert(family);
        }
        tracing::trace!(%family, tokens = tokens.len(), "family reindexed");
        self.family_tokens.insert(family, tokens);
        self.names.insert(family, name.to_string());
    }

    /// Drop a family from the index entirely.
    pub fn remove(&mut self, family: FamilyId) {
        self.names.remove(&family);
        let Some(tokens) = self.family_tokens.remove(&family) else {
            return;
        };
        for token in tokens {
            if let Some(families) = self.entries.get_mut(&token) {
                families.remove(&family);
                if families.is_empty() {
                    self.entries.remove(&token);
                }
            }
        }
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.family_tokens.clear();
        self.names.clear();
    }

    /// Ranked search. Returns family identifiers ordered by display name.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<FamilyId> {
        let words = tokenize(query);
        if words.is_empty() {
            return Vec::new();
        }

        let mut scores: BTreeMap<FamilyId, usize> = BTreeMap::new();
        for word in &words {
            let matched: BTreeSet<FamilyId> = self
                .entries
                .range::<str, _>((Bound::Included(word.as_str()), Bound::Unbounded))
                .take_while(|(token, _)| token.starts_with(word.as_str()))
                .flat_map(|(_, families)| families.iter().copied())
                .collect();
            for family in matched {
                *scores.entry(family).or_insert(0) += 1;
            }
        }

        let Some(best) = scores.values().copied().max() else {
            return Vec::new();
        };

        let mut hits: Vec<(&str, FamilyId)> = scores
            .into_iter()
            .filter(|(_, score)| *score == best)
            .map(|(family, _)| (self.name(family).unwrap_or_default(), family))
            .collect();
        hits.sort();
        hits.into_iter().map(|(_, family)| family).collect()
    }

    /// Cached display name of an indexed family.
    #[must_use]
    pub fn name(&self, family: FamilyId) -> Option<&str> {
        self.names.get(&family).map(String::as_str)
    }

    /// Tokens a family is currently listed under.
    #[must_use]
    pub fn tokens(&self, family: FamilyId) -> Option<&BTreeSet<String>> {
        self.family_tokens.get(&family)
    }

    /// Families listed under an exact token.
    #[must_use]
    pub fn families_for(&self, token: &str) -> Vec<FamilyId> {
        self.entries
            .get(token)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of distinct tokens.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of indexed families.
    #[must_use]
    pub fn family_count(&self) -> usize {
        self.names.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
