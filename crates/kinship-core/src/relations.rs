//! # Relations
//!
//! Read-side relationship queries over a `RecordStore`.
//!
//! Nothing here writes. Every function takes the store by shared reference,
//! so any number of these can run at once against the same snapshot.
//!
//! ## Ordering
//!
//! - Children: ascending birth year, unknown birth as year 0, ties by identifier.
//! - Partners (family names, parents): male, female, unknown, then last name,
//!   ties by identifier.
//! - Families of an individual: ascending identifier (storage order).

use crate::fuzzy_date::sort_year;
use crate::names::display_name;
use crate::primitives::PARTNER_SEPARATOR;
use crate::store::RecordStore;
use crate::{Family, FamilyId, Individual, IndividualId, KinshipError};
use std::cmp::Ordering;
use std::collections::BTreeSet;

// =============================================================================
// COMPARATORS
// =============================================================================

/// Order by birth year (unknown first), then identifier.
pub fn by_birth(a: &Individual, b: &Individual) -> Ordering {
    sort_year(&a.details.birth.date)
        .cmp(&sort_year(&b.details.birth.date))
        .then(a.id.cmp(&b.id))
}

/// Order by sex rank (male, female, unknown), then last name, then identifier.
pub fn by_sex_then_surname(a: &Individual, b: &Individual) -> Ordering {
    a.details
        .sex
        .rank()
        .cmp(&b.details.sex.rank())
        .then_with(|| a.details.last_name.cmp(&b.details.last_name))
        .then(a.id.cmp(&b.id))
}

/// Build a family's display name from its partners.
///
/// Partners are sorted with [`by_sex_then_surname`] and their display names
/// joined with `" & "`. A family with no partners has an empty name.
#[must_use]
pub fn family_name(partners: &[Individual]) -> String {
    let mut sorted: Vec<&Individual> = partners.iter().collect();
    sorted.sort_by(|a, b| by_sex_then_surname(a, b));
    sorted
        .into_iter()
        .map(|p| display_name(&p.details))
        .collect::<Vec<_>>()
        .join(PARTNER_SEPARATOR)
}

// =============================================================================
// LOOKUPS
// =============================================================================

/// Fetch a person or fail with not-found.
pub fn require_individual<S: RecordStore + ?Sized>(
    store: &S,
    id: IndividualId,
) -> Result<Individual, KinshipError> {
    store
        .individual(id)?
        .ok_or(KinshipError::IndividualNotFound(id))
}

/// Fetch a family or fail with not-found.
pub fn require_family<S: RecordStore + ?Sized>(
    store: &S,
    id: FamilyId,
) -> Result<Family, KinshipError> {
    store.family(id)?.ok_or(KinshipError::FamilyNotFound(id))
}

/// Load a family's partner records in storage order.
pub fn family_partners<S: RecordStore + ?Sized>(
    store: &S,
    family: &Family,
) -> Result<Vec<Individual>, KinshipError> {
    family
        .partners
        .iter()
        .map(|id| require_individual(store, *id))
        .collect()
}

/// Children of one family, ordered by birth.
pub fn family_children<S: RecordStore + ?Sized>(
    store: &S,
    family: FamilyId,
) -> Result<Vec<Individual>, KinshipError> {
    let mut children = store
        .children_in_family(family)?
        .into_iter()
        .map(|id| require_individual(store, id))
        .collect::<Result<Vec<_>, _>>()?;
    children.sort_by(by_birth);
    Ok(children)
}

/// Families in which the individual is a partner, in storage order.
pub fn families_of<S: RecordStore + ?Sized>(
    store: &S,
    individual: IndividualId,
) -> Result<Vec<Family>, KinshipError> {
    require_individual(store, individual)?;
    store
        .families_with_partner(individual)?
        .into_iter()
        .map(|id| require_family(store, id))
        .collect()
}

// =============================================================================
// RELATIONSHIP QUERIES
// =============================================================================

/// Partners of the family the individual is a child in.
pub fn parents<S: RecordStore + ?Sized>(
    store: &S,
    individual: IndividualId,
) -> Result<Vec<Individual>, KinshipError> {
    let ind = require_individual(store, individual)?;
    let Some(family) = ind.child_in_family else {
        return Ok(Vec::new());
    };
    let family = require_family(store, family)?;
    let mut parents = family_partners(store, &family)?;
    parents.sort_by(by_sex_then_surname);
    Ok(parents)
}

/// Children across every family the individual is a partner in, by birth.
pub fn children<S: RecordStore + ?Sized>(
    store: &S,
    individual: IndividualId,
) -> Result<Vec<Individual>, KinshipError> {
    require_individual(store, individual)?;
    let mut seen = BTreeSet::new();
    let mut children = Vec::new();
    for family in store.families_with_partner(individual)? {
        for child in store.children_in_family(family)? {
            if seen.insert(child) {
                children.push(require_individual(store, child)?);
            }
        }
    }
    children.sort_by(by_birth);
    Ok(children)
}

/// Other partners across every family the individual is a partner in.
///
/// A spouse shared by several families is listed once, at first occurrence.
pub fn spouses<S: RecordStore + ?Sized>(
    store: &S,
    individual: IndividualId,
) -> Result<Vec<Individual>, KinshipError> {
    let mut seen = BTreeSet::new();
    let mut spouses = Vec::new();
    for family in families_of(store, individual)? {
        for partner in family.partners {
            if partner != individual && seen.insert(partner) {
                spouses.push(require_individual(store, partner)?);
            }
        }
    }
    Ok(spouses)
}

// =============================================================================
// TESTS
// =============================================================================
