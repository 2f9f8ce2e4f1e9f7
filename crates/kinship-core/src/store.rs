//! # Record Store
//!
//! The keyed store the engine runs on top of.
//!
//! This module defines the `RecordStore` trait and its in-memory
//! implementation. All data structures use `BTreeMap` for deterministic
//! ordering.
//!
//! ## Write Batches
//!
//! Every engine mutation is computed up front and handed to the store as
//! one `WriteBatch`. A store applies a batch entirely or not at all, so a
//! family's cached name and its membership can never be observed half-updated.

use crate::{Family, FamilyDetails, FamilyId, Individual, IndividualId, KinshipError, PersonDetails};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// WRITE BATCH
// =============================================================================

/// A single record write inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Replace an existing person record.
    PutIndividual(Individual),
    /// Delete a person record.
    RemoveIndividual(IndividualId),
    /// Replace an existing family record.
    PutFamily(Family),
    /// Delete a family record.
    RemoveFamily(FamilyId),
}

/// An ordered list of writes applied as one atomic unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_individual(&mut self, individual: Individual) {
        self.ops.push(WriteOp::PutIndividual(individual));
    }

    pub fn remove_individual(&mut self, id: IndividualId) {
        self.ops.push(WriteOp::RemoveIndividual(id));
    }

    pub fn put_family(&mut self, family: Family) {
        self.ops.push(WriteOp::PutFamily(family));
    }

    pub fn remove_family(&mut self, id: FamilyId) {
        self.ops.push(WriteOp::RemoveFamily(id));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> impl Iterator<Item = &WriteOp> {
        self.ops.iter()
    }

    #[must_use]
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

// =============================================================================
// RECORDSTORE TRAIT
// =============================================================================

/// The RecordStore trait defines the persistence operations the engine needs.
///
/// All fallible operations return `Result<T, KinshipError>` to support both
/// in-memory and persistent storage backends uniformly.
///
/// Membership queries return identifiers in ascending order, which is the
/// "natural storage order" used by lineage walks.
pub trait RecordStore {
    /// Create a person record and return its new identifier.
    fn insert_individual(&mut self, details: PersonDetails) -> Result<IndividualId, KinshipError>;

    /// Create an empty family record and return its new identifier.
    fn insert_family(&mut self, details: FamilyDetails) -> Result<FamilyId, KinshipError>;

    /// Fetch a person record.
    fn individual(&self, id: IndividualId) -> Result<Option<Individual>, KinshipError>;

    /// Fetch a family record.
    fn family(&self, id: FamilyId) -> Result<Option<Family>, KinshipError>;

    /// Apply every write in the batch, or none of them.
    ///
    /// `Put*` ops on records that do not exist are rejected with not-found.
    fn apply(&mut self, batch: WriteBatch) -> Result<(), KinshipError>;

    /// All person identifiers in ascending order.
    fn individual_ids(&self) -> Result<Vec<IndividualId>, KinshipError>;

    /// All family identifiers in ascending order.
    fn family_ids(&self) -> Result<Vec<FamilyId>, KinshipError>;

    /// Families in which the individual is a partner.
    fn families_with_partner(&self, id: IndividualId) -> Result<Vec<FamilyId>, KinshipError>;

    /// Individuals whose `child_in_family` is this family.
    fn children_in_family(&self, id: FamilyId) -> Result<Vec<IndividualId>, KinshipError>;

    /// Number of person records.
    fn individual_count(&self) -> Result<usize, KinshipError>;

    /// Number of family records.
    fn family_count(&self) -> Result<usize, KinshipError>;
}

// =============================================================================
// IN-MEMORY IMPLEMENTATION
// =============================================================================

/// In-memory record store.
///
/// Keeps reverse membership indexes next to the records so partner and
/// child queries never scan.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    individuals: BTreeMap<IndividualId, Individual>,
    families: BTreeMap<FamilyId, Family>,
    /// individual -> families where they are a partner
    partner_index: BTreeMap<IndividualId, BTreeSet<FamilyId>>,
    /// family -> individuals that are children in it
    child_index: BTreeMap<FamilyId, BTreeSet<IndividualId>>,
    next_individual_id: u64,
    next_family_id: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate all person records in identifier order.
    pub fn individuals(&self) -> impl Iterator<Item = &Individual> {
        self.individuals.values()
    }

    /// Iterate all family records in identifier order.
    pub fn families(&self) -> impl Iterator<Item = &Family> {
        self.families.values()
    }

    /// Import a record with its original identifier (snapshot restore).
    pub fn import_individual(&mut self, individual: Individual) {
        if individual.id.0 >= self.next_individual_id {
            self.next_individual_id = individual.id.0.saturating_add(1);
        }
        self.link_child(&individual);
        self.individuals.insert(individual.id, individual);
    }

    /// Import a family with its original identifier (snapshot restore).
    pub fn import_family(&mut self, family: Family) {
        if family.id.0 >= self.next_family_id {
            self.next_family_id = family.id.0.saturating_add(1);
        }
        self.link_partners(&family);
        self.families.insert(family.id, family);
    }

    fn link_child(&mut self, individual: &Individual) {
        if let Some(family) = individual.child_in_family {
            self.child_index
                .entry(family)
                .or_default()
                .insert(individual.id);
        }
    }

    fn unlink_child(&mut self, individual: &Individual) {
        if let Some(family) = individual.child_in_family
            && let Some(children) = self.child_index.get_mut(&family)
        {
            children.remove(&individual.id);
            if children.is_empty() {
                self.child_index.remove(&family);
            }
        }
    }

    fn link_partners(&mut self, family: &Family) {
        for partner in &family.partners {
            self.partner_index
                .entry(*partner)
                .or_default()
                .insert(family.id);
        }
    }

    fn unlink_partners(&mut self, family: &Family) {
        for partner in &family.partners {
            if let Some(families) = self.partner_index.get_mut(partner) {
                families.remove(&family.id);
                if families.is_empty() {
                    self.partner_index.remove(partner);
                }
            }
        }
    }

    fn check(&self, batch: &WriteBatch) -> Result<(), KinshipError> {
        // Track existence across the batch so a later op sees earlier removals.
        let mut removed_individuals = BTreeSet::new();
        let mut removed_families = BTreeSet::new();
        for op in batch.ops() {
            match op {
                WriteOp::PutIndividual(ind) => {
                    if !self.individuals.contains_key(&ind.id)
                        || removed_individuals.contains(&ind.id)
                    {
                        return Err(KinshipError::IndividualNotFound(ind.id));
                    }
                }
                WriteOp::RemoveIndividual(id) => {
                    removed_individuals.insert(*id);
                }
                WriteOp::PutFamily(fam) => {
                    if !self.families.contains_key(&fam.id) || removed_families.contains(&fam.id)
                    {
                        return Err(KinshipError::FamilyNotFound(fam.id));
                    }
                }
                WriteOp::RemoveFamily(id) => {
                    removed_families.insert(*id);
                }
            }
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn insert_individual(&mut self, details: PersonDetails) -> Result<IndividualId, KinshipError> {
        let id = IndividualId(self.next_individual_id);
        self.next_individual_id = self.next_individual_id.saturating_add(1);
        self.individuals.insert(id, Individual::new(id, details));
        Ok(id)
    }

    fn insert_family(&mut self, details: FamilyDetails) -> Result<FamilyId, KinshipError> {
        let id = FamilyId(self.next_family_id);
        self.next_family_id = self.next_family_id.saturating_add(1);
        self.families.insert(id, Family::new(id, details));
        Ok(id)
    }

    fn individual(&self, id: IndividualId) -> Result<Option<Individual>, KinshipError> {
        Ok(self.individuals.get(&id).cloned())
    }

    fn family(&self, id: FamilyId) -> Result<Option<Family>, KinshipError> {
        Ok(self.families.get(&id).cloned())
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<(), KinshipError> {
        // Validate the whole batch before touching any record.
        self.check(&batch)?;

        for op in batch.ops {
            match op {
                WriteOp::PutIndividual(ind) => {
                    if let Some(old) = self.individuals.remove(&ind.id) {
                        self.unlink_child(&old);
                    }
                    self.link_child(&ind);
                    self.individuals.insert(ind.id, ind);
                }
                WriteOp::RemoveIndividual(id) => {
                    if let Some(old) = self.individuals.remove(&id) {
                        self.unlink_child(&old);
                    }
                }
                WriteOp::PutFamily(fam) => {
                    if let Some(old) = self.families.remove(&fam.id) {
                        self.unlink_partners(&old);
                    }
                    self.link_partners(&fam);
                    self.families.insert(fam.id, fam);
                }
                WriteOp::RemoveFamily(id) => {
                    if let Some(old) = self.families.remove(&id) {
                        self.unlink_partners(&old);
                    }
                }
            }
        }
        Ok(())
    }

    fn individual_ids(&self) -> Result<Vec<IndividualId>, KinshipError> {
        Ok(self.individuals.keys().copied().collect())
    }

    fn family_ids(&self) -> Result<Vec<FamilyId>, KinshipError> {
        Ok(self.families.keys().copied().collect())
    }

    fn families_with_partner(&self, id: IndividualId) -> Result<Vec<FamilyId>, KinshipError> {
        Ok(self
            .partner_index
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    fn children_in_family(&self, id: FamilyId) -> Result<Vec<IndividualId>, KinshipError> {
        Ok(self
            .child_index
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    fn individual_count(&self) -> Result<usize, KinshipError> {
        Ok(self.individuals.len())
    }

    fn family_count(&self) -> Result<usize, KinshipError> {
        Ok(self.families.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
