//! # Genealogy
//!
//! The engine façade: a record store plus the family name index.
//!
//! Every mutation here is one atomic unit. It validates its input, computes
//! the full set of record writes including the cascade (cached family names),
//! commits them as a single `WriteBatch`, and only then updates the name
//! index. Mutations take `&mut self` and queries take `&self`, so callers can
//! never observe a family whose cached name or index entry is stale.
//!
//! ## New Families
//!
//! A family needs an identifier before partners can be attached, so creation
//! is an explicit three-step contract:
//!
//! 1. [`Genealogy::create_empty_family`] returns the new identifier
//! 2. [`Genealogy::attach_partners`] links partners
//! 3. [`Genealogy::recompute_family_name`] rebuilds the cached name and index entries
//!
//! `attach_partners` runs step 3 itself before returning; `create_family`
//! runs all three.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` (ACID, on disk). The name index is rebuilt
//!   from the records on open.

use crate::export::Snapshot;
use crate::index::FamilyNameIndex;
use crate::names::display_name;
use crate::relations::{self, family_name, require_family, require_individual};
use crate::store::{MemoryStore, RecordStore, WriteBatch};
use crate::storage::RedbStore;
use crate::traversal::{self, AncestorEntry, DescendantEntry, FamilyView};
use crate::{
    Family, FamilyDetails, FamilyId, Individual, IndividualId, KinshipError, PersonDetails,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a Genealogy.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl RecordStore for StorageBackend {
    fn insert_individual(&mut self, details: PersonDetails) -> Result<IndividualId, KinshipError> {
        match self {
            Self::InMemory(s) => s.insert_individual(details),
            Self::Persistent(s) => s.insert_individual(details),
        }
    }

    fn insert_family(&mut self, details: FamilyDetails) -> Result<FamilyId, KinshipError> {
        match self {
            Self::InMemory(s) => s.insert_family(details),
            Self::Persistent(s) => s.insert_family(details),
        }
    }

    fn individual(&self, id: IndividualId) -> Result<Option<Individual>, KinshipError> {
        match self {
            Self::InMemory(s) => s.individual(id),
            Self::Persistent(s) => s.individual(id),
        }
    }

    fn family(&self, id: FamilyId) -> Result<Option<Family>, KinshipError> {
        match self {
            Self::InMemory(s) => s.family(id),
            Self::Persistent(s) => s.family(id),
        }
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<(), KinshipError> {
        match self {
            Self::InMemory(s) => s.apply(batch),
            Self::Persistent(s) => s.apply(batch),
        }
    }

    fn individual_ids(&self) -> Result<Vec<IndividualId>, KinshipError> {
        match self {
            Self::InMemory(s) => s.individual_ids(),
            Self::Persistent(s) => s.individual_ids(),
        }
    }

    fn family_ids(&self) -> Result<Vec<FamilyId>, KinshipError> {
        match self {
            Self::InMemory(s) => s.family_ids(),
            Self::Persistent(s) => s.family_ids(),
        }
    }

    fn families_with_partner(&self, id: IndividualId) -> Result<Vec<FamilyId>, KinshipError> {
        match self {
            Self::InMemory(s) => s.families_with_partner(id),
            Self::Persistent(s) => s.families_with_partner(id),
        }
    }

    fn children_in_family(&self, id: FamilyId) -> Result<Vec<IndividualId>, KinshipError> {
        match self {
            Self::InMemory(s) => s.children_in_family(id),
            Self::Persistent(s) => s.children_in_family(id),
        }
    }

    fn individual_count(&self) -> Result<usize, KinshipError> {
        match self {
            Self::InMemory(s) => s.individual_count(),
            Self::Persistent(s) => s.individual_count(),
        }
    }

    fn family_count(&self) -> Result<usize, KinshipError> {
        match self {
            Self::InMemory(s) => s.family_count(),
            Self::Persistent(s) => s.family_count(),
        }
    }
}

// =============================================================================
// DETAIL VIEW
// =============================================================================

/// Everything needed to render one person's page: the person, their parents,
/// and each family they are a partner in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndividualDetail {
    pub individual: Individual,
    pub display_name: String,
    pub parents: Vec<Individual>,
    pub families: Vec<FamilyView>,
}

// =============================================================================
// GENEALOGY
// =============================================================================

/// The genealogical graph engine.
#[derive(Debug, Default)]
pub struct Genealogy {
    backend: StorageBackend,
    index: FamilyNameIndex,
}

impl Genealogy {
    /// Create an empty in-memory genealogy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing in-memory store, rebuilding the name index.
    pub fn with_memory_store(store: MemoryStore) -> Result<Self, KinshipError> {
        Self::with_backend(StorageBackend::InMemory(store))
    }

    /// Open or create a redb-backed genealogy at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KinshipError> {
        Self::with_backend(StorageBackend::Persistent(RedbStore::open(path)?))
    }

    /// Wrap any backend, rebuilding the name index from its records.
    pub fn with_backend(backend: StorageBackend) -> Result<Self, KinshipError> {
        let mut genealogy = Self {
            backend,
            index: FamilyNameIndex::new(),
        };
        genealogy.rebuild_index()?;
        Ok(genealogy)
    }

    /// Restore an in-memory genealogy from a snapshot.
    ///
    /// Rejects dangling references and cyclic child links. Cached names are
    /// recomputed rather than trusted.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, KinshipError> {
        snapshot.check_references()?;
        let mut store = MemoryStore::new();
        for individual in snapshot.individuals {
            individual.details.validate()?;
            store.import_individual(individual);
        }
        for family in snapshot.families {
            family.details.validate()?;
            store.import_family(family);
        }

        for individual in store.individuals() {
            let Some(fid) = individual.child_in_family else {
                continue;
            };
            for partner in require_family(&store, fid)?.partners {
                if traversal::is_ancestor_or_self(&store, individual.id, partner)? {
                    tracing::warn!(child = %individual.id, family = %fid, "cyclic snapshot rejected");
                    return Err(KinshipError::CyclicRelationship(individual.id));
                }
            }
        }

        let mut genealogy = Self::with_memory_store(store)?;
        genealogy.recompute_all_family_names()?;
        Ok(genealogy)
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// The underlying record store.
    #[must_use]
    pub fn store(&self) -> &StorageBackend {
        &self.backend
    }

    /// The family name index.
    #[must_use]
    pub fn index(&self) -> &FamilyNameIndex {
        &self.index
    }

    fn rebuild_index(&mut self) -> Result<(), KinshipError> {
        self.index.clear();
        for id in self.backend.family_ids()? {
            let family = require_family(&self.backend, id)?;
            let partners = relations::family_partners(&self.backend, &family)?;
            self.index
                .reindex(family.id, &family.name, partners.iter().map(|p| &p.details));
        }
        tracing::debug!(
            families = self.index.family_count(),
            tokens = self.index.token_count(),
            "name index rebuilt"
        );
        Ok(())
    }

    /// Load a family's partners, preferring pending (uncommitted) versions.
    fn pending_partners(
        &self,
        family: &Family,
        pending: &BTreeMap<IndividualId, Individual>,
    ) -> Result<Vec<Individual>, KinshipError> {
        family
            .partners
            .iter()
            .map(|id| match pending.get(id) {
                Some(ind) => Ok(ind.clone()),
                None => require_individual(&self.backend, *id),
            })
            .collect()
    }

    /// Commit a batch, then refresh the index for the touched families.
    fn commit(
        &mut self,
        batch: WriteBatch,
        reindex: Vec<(Family, Vec<Individual>)>,
    ) -> Result<(), KinshipError> {
        self.backend.apply(batch)?;
        for (family, partners) in reindex {
            self.index
                .reindex(family.id, &family.name, partners.iter().map(|p| &p.details));
            tracing::debug!(family = %family.id, name = %family.name, "family name recomputed");
        }
        Ok(())
    }

    // =========================================================================
    // INDIVIDUAL MUTATIONS
    // =========================================================================

    /// Create a person record.
    pub fn add_individual(&mut self, details: PersonDetails) -> Result<IndividualId, KinshipError> {
        details.validate()?;
        let id = self.backend.insert_individual(details)?;
        tracing::debug!(individual = %id, "individual added");
        Ok(id)
    }

    /// Replace a person's fields.
    ///
    /// When a name field changes, every family they are a partner in gets its
    /// cached name and index entries rebuilt in the same unit.
    pub fn update_individual(
        &mut self,
        id: IndividualId,
        details: PersonDetails,
    ) -> Result<(), KinshipError> {
        details.validate()?;
        let old = require_individual(&self.backend, id)?;
        let names_changed = old.details.name_fields_differ(&details);
        let updated = Individual { details, ..old };

        let mut batch = WriteBatch::new();
        batch.put_individual(updated.clone());

        let mut reindex = Vec::new();
        if names_changed {
            let pending = BTreeMap::from([(id, updated)]);
            for fid in self.backend.families_with_partner(id)? {
                let mut family = require_family(&self.backend, fid)?;
                let partners = self.pending_partners(&family, &pending)?;
                family.name = family_name(&partners);
                batch.put_family(family.clone());
                reindex.push((family, partners));
            }
        }
        self.commit(batch, reindex)
    }

    /// Delete a person, removing them from every partner set.
    ///
    /// Families they were a partner in survive with the remaining partners.
    pub fn delete_individual(&mut self, id: IndividualId) -> Result<(), KinshipError> {
        require_individual(&self.backend, id)?;

        let mut batch = WriteBatch::new();
        let mut reindex = Vec::new();
        for fid in self.backend.families_with_partner(id)? {
            let mut family = require_family(&self.backend, fid)?;
            family.partners.retain(|p| *p != id);
            let partners = relations::family_partners(&self.backend, &family)?;
            family.name = family_name(&partners);
            batch.put_family(family.clone());
            reindex.push((family, partners));
        }
        batch.remove_individual(id);
        self.commit(batch, reindex)?;
        tracing::debug!(individual = %id, "individual deleted");
        Ok(())
    }

    /// Record `child` as a child of `family`.
    ///
    /// Fails if the child already belongs to a different family; the existing
    /// link must be cleared first. Re-assigning the same family is a no-op.
    /// Links that would make someone their own ancestor are rejected.
    pub fn set_child_in_family(
        &mut self,
        child: IndividualId,
        family: FamilyId,
    ) -> Result<(), KinshipError> {
        let mut ind = require_individual(&self.backend, child)?;
        let fam = require_family(&self.backend, family)?;

        match ind.child_in_family {
            Some(existing) if existing == family => return Ok(()),
            Some(existing) => {
                tracing::warn!(%child, %existing, requested = %family, "second child-in-family rejected");
                return Err(KinshipError::AlreadyChildInFamily {
                    individual: child,
                    existing,
                    requested: family,
                });
            }
            None => {}
        }

        for partner in &fam.partners {
            if traversal::is_ancestor_or_self(&self.backend, child, *partner)? {
                tracing::warn!(%child, %family, "child link would create a cycle");
                return Err(KinshipError::CyclicRelationship(child));
            }
        }

        ind.child_in_family = Some(family);
        let mut batch = WriteBatch::new();
        batch.put_individual(ind);
        self.commit(batch, Vec::new())
    }

    /// Remove a person's child-in-family link. Returns the old family.
    pub fn clear_child_in_family(
        &mut self,
        child: IndividualId,
    ) -> Result<Option<FamilyId>, KinshipError> {
        let mut ind = require_individual(&self.backend, child)?;
        let Some(previous) = ind.child_in_family.take() else {
            return Ok(None);
        };
        let mut batch = WriteBatch::new();
        batch.put_individual(ind);
        self.commit(batch, Vec::new())?;
        Ok(Some(previous))
    }

    // =========================================================================
    // FAMILY MUTATIONS
    // =========================================================================

    /// Step 1: create a family with no partners. Its name is empty.
    pub fn create_empty_family(&mut self, details: FamilyDetails) -> Result<FamilyId, KinshipError> {
        details.validate()?;
        let id = self.backend.insert_family(details)?;
        self.index.reindex(id, "", std::iter::empty());
        tracing::debug!(family = %id, "family created");
        Ok(id)
    }

    /// Step 2: add partners to a family, then recompute its name.
    ///
    /// All partners are checked before anything is written: each must exist,
    /// appear once, not already be a partner, and not be a descendant-or-self
    /// of any of the family's children.
    pub fn attach_partners(
        &mut self,
        family: FamilyId,
        partners: &[IndividualId],
    ) -> Result<(), KinshipError> {
        let mut fam = require_family(&self.backend, family)?;
        self.check_new_partners(&fam.partners, partners)?;

        let children = self.backend.children_in_family(family)?;
        for partner in partners {
            for child in &children {
                if traversal::is_ancestor_or_self(&self.backend, *child, *partner)? {
                    tracing::warn!(%partner, %family, "partner link would create a cycle");
                    return Err(KinshipError::CyclicRelationship(*partner));
                }
            }
        }

        fam.partners.extend_from_slice(partners);
        self.write_family_name(fam)?;
        Ok(())
    }

    fn check_new_partners(
        &self,
        existing: &[IndividualId],
        partners: &[IndividualId],
    ) -> Result<(), KinshipError> {
        let mut seen: BTreeSet<IndividualId> = existing.iter().copied().collect();
        for partner in partners {
            require_individual(&self.backend, *partner)?;
            if !seen.insert(*partner) {
                return Err(KinshipError::InvalidRecord(format!(
                    "{partner} is listed more than once as a partner"
                )));
            }
        }
        Ok(())
    }

    /// Step 3: rebuild a family's cached name and index entries.
    ///
    /// Idempotent: running it twice without data changes yields the same name.
    pub fn recompute_family_name(&mut self, family: FamilyId) -> Result<String, KinshipError> {
        let fam = require_family(&self.backend, family)?;
        self.write_family_name(fam)
    }

    fn write_family_name(&mut self, mut family: Family) -> Result<String, KinshipError> {
        let partners = relations::family_partners(&self.backend, &family)?;
        family.name = family_name(&partners);
        let name = family.name.clone();
        let mut batch = WriteBatch::new();
        batch.put_family(family.clone());
        self.commit(batch, vec![(family, partners)])?;
        Ok(name)
    }

    /// Create a family and attach its partners in one call.
    ///
    /// Partners are validated before the family record is created, so a bad
    /// partner list leaves nothing behind.
    pub fn create_family(
        &mut self,
        details: FamilyDetails,
        partners: &[IndividualId],
    ) -> Result<FamilyId, KinshipError> {
        details.validate()?;
        self.check_new_partners(&[], partners)?;

        let id = self.create_empty_family(details)?;
        self.attach_partners(id, partners)?;
        Ok(id)
    }

    /// Remove one partner from a family, then recompute its name.
    pub fn detach_partner(
        &mut self,
        family: FamilyId,
        partner: IndividualId,
    ) -> Result<(), KinshipError> {
        let mut fam = require_family(&self.backend, family)?;
        if !fam.has_partner(partner) {
            return Err(KinshipError::InvalidRecord(format!(
                "{} is not a partner in {}",
                partner, family
            )));
        }
        fam.partners.retain(|p| *p != partner);
        self.write_family_name(fam)?;
        Ok(())
    }

    /// Replace a family's hand-edited fields (marriage event, note).
    pub fn update_family(
        &mut self,
        family: FamilyId,
        details: FamilyDetails,
    ) -> Result<(), KinshipError> {
        details.validate()?;
        let mut fam = require_family(&self.backend, family)?;
        fam.details = details;
        let mut batch = WriteBatch::new();
        batch.put_family(fam);
        self.commit(batch, Vec::new())
    }

    /// Delete a family, clearing every child's link to it.
    pub fn delete_family(&mut self, family: FamilyId) -> Result<(), KinshipError> {
        require_family(&self.backend, family)?;

        let mut batch = WriteBatch::new();
        for child in self.backend.children_in_family(family)? {
            let mut ind = require_individual(&self.backend, child)?;
            ind.child_in_family = None;
            batch.put_individual(ind);
        }
        batch.remove_family(family);
        self.backend.apply(batch)?;
        self.index.remove(family);
        tracing::debug!(%family, "family deleted");
        Ok(())
    }

    /// Rebuild every cached family name and the whole index.
    ///
    /// Returns the number of families processed.
    pub fn recompute_all_family_names(&mut self) -> Result<usize, KinshipError> {
        let mut batch = WriteBatch::new();
        let mut reindex = Vec::new();
        for id in self.backend.family_ids()? {
            let mut family = require_family(&self.backend, id)?;
            let partners = relations::family_partners(&self.backend, &family)?;
            family.name = family_name(&partners);
            batch.put_family(family.clone());
            reindex.push((family, partners));
        }
        let count = reindex.len();
        self.backend.apply(batch)?;
        self.index.clear();
        for (family, partners) in &reindex {
            self.index
                .reindex(family.id, &family.name, partners.iter().map(|p| &p.details));
        }
        tracing::info!(families = count, "all family names recomputed");
        Ok(count)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Fetch a person.
    pub fn individual(&self, id: IndividualId) -> Result<Individual, KinshipError> {
        require_individual(&self.backend, id)
    }

    /// Fetch a family.
    pub fn family(&self, id: FamilyId) -> Result<Family, KinshipError> {
        require_family(&self.backend, id)
    }

    /// All people in identifier order.
    pub fn individuals(&self) -> Result<Vec<Individual>, KinshipError> {
        self.backend
            .individual_ids()?
            .into_iter()
            .map(|id| require_individual(&self.backend, id))
            .collect()
    }

    /// All families in identifier order.
    pub fn families(&self) -> Result<Vec<Family>, KinshipError> {
        self.backend
            .family_ids()?
            .into_iter()
            .map(|id| require_family(&self.backend, id))
            .collect()
    }

    pub fn individual_count(&self) -> Result<usize, KinshipError> {
        self.backend.individual_count()
    }

    pub fn family_count(&self) -> Result<usize, KinshipError> {
        self.backend.family_count()
    }

    /// The string form of a person: formal name plus life span.
    pub fn display_name(&self, id: IndividualId) -> Result<String, KinshipError> {
        Ok(display_name(&self.individual(id)?.details))
    }

    pub fn parents(&self, id: IndividualId) -> Result<Vec<Individual>, KinshipError> {
        relations::parents(&self.backend, id)
    }

    pub fn children(&self, id: IndividualId) -> Result<Vec<Individual>, KinshipError> {
        relations::children(&self.backend, id)
    }

    pub fn spouses(&self, id: IndividualId) -> Result<Vec<Individual>, KinshipError> {
        relations::spouses(&self.backend, id)
    }

    /// Families the person is a partner in.
    pub fn families_of(&self, id: IndividualId) -> Result<Vec<Family>, KinshipError> {
        relations::families_of(&self.backend, id)
    }

    /// Children of one family, by birth.
    pub fn family_children(&self, id: FamilyId) -> Result<Vec<Individual>, KinshipError> {
        require_family(&self.backend, id)?;
        relations::family_children(&self.backend, id)
    }

    /// Ranked family-name search. Empty or unmatched queries return nothing.
    pub fn search(&self, query: &str) -> Result<Vec<Family>, KinshipError> {
        self.index
            .search(query)
            .into_iter()
            .map(|id| require_family(&self.backend, id))
            .collect()
    }

    pub fn descendants(&self, id: IndividualId) -> Result<Vec<DescendantEntry>, KinshipError> {
        traversal::descendants(&self.backend, id)
    }

    pub fn ancestors(&self, id: IndividualId) -> Result<Vec<AncestorEntry>, KinshipError> {
        traversal::ancestors(&self.backend, id)
    }

    /// The person, their parents and their families.
    pub fn individual_detail(&self, id: IndividualId) -> Result<IndividualDetail, KinshipError> {
        let individual = self.individual(id)?;
        Ok(IndividualDetail {
            display_name: display_name(&individual.details),
            parents: self.parents(id)?,
            families: traversal::family_views(&self.backend, id)?,
            individual,
        })
    }

    /// Every record, for export.
    pub fn snapshot(&self) -> Result<Snapshot, KinshipError> {
        Ok(Snapshot::new(self.individuals()?, self.families()?))
    }
}
