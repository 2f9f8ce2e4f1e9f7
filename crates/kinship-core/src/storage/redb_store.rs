//! # redb-backed Record Storage
//!
//! A disk-backed record store using the redb embedded database, providing:
//! - ACID transactions (a `WriteBatch` is one write transaction)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are postcard-encoded. Membership is kept in two key-only tables
//! keyed by `(individual, family)` and `(family, individual)`, so partner and
//! child queries are range scans.

use crate::store::{RecordStore, WriteBatch, WriteOp};
use crate::{Family, FamilyDetails, FamilyId, Individual, IndividualId, KinshipError, PersonDetails};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table, TableDefinition,
    WriteTransaction,
};
use std::path::Path;

/// Table for people: IndividualId(u64) -> serialized Individual bytes
const INDIVIDUALS: TableDefinition<u64, &[u8]> = TableDefinition::new("individuals");

/// Table for families: FamilyId(u64) -> serialized Family bytes
const FAMILIES: TableDefinition<u64, &[u8]> = TableDefinition::new("families");

/// Partner membership: (individual_id, family_id) -> ()
const PARTNERS: TableDefinition<(u64, u64), ()> = TableDefinition::new("partners");

/// Child membership: (family_id, individual_id) -> ()
const CHILDREN: TableDefinition<(u64, u64), ()> = TableDefinition::new("children");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_INDIVIDUAL_ID: &str = "next_individual_id";
const NEXT_FAMILY_ID: &str = "next_family_id";

fn io_err(e: impl std::fmt::Display) -> KinshipError {
    KinshipError::IoError(e.to_string())
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, KinshipError> {
    postcard::to_allocvec(value).map_err(|e| KinshipError::SerializationError(e.to_string()))
}

fn decode<'a, T: serde::Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, KinshipError> {
    postcard::from_bytes(bytes).map_err(|e| KinshipError::DeserializationError(e.to_string()))
}

/// A disk-backed record store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
    next_individual_id: u64,
    next_family_id: u64,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("next_individual_id", &self.next_individual_id)
            .field("next_family_id", &self.next_family_id)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a record database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KinshipError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(INDIVIDUALS).map_err(io_err)?;
            let _ = write_txn.open_table(FAMILIES).map_err(io_err)?;
            let _ = write_txn.open_table(PARTNERS).map_err(io_err)?;
            let _ = write_txn.open_table(CHILDREN).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        let (next_individual_id, next_family_id) = {
            let read_txn = db.begin_read().map_err(io_err)?;
            let table = read_txn.open_table(METADATA).map_err(io_err)?;
            let individual = table
                .get(NEXT_INDIVIDUAL_ID)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            let family = table
                .get(NEXT_FAMILY_ID)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            (individual, family)
        };

        tracing::debug!(
            next_individual_id,
            next_family_id,
            "opened record database at {}",
            path.as_ref().display()
        );

        Ok(Self {
            db,
            next_individual_id,
            next_family_id,
        })
    }

    fn read_individual(
        table: &Table<'_, u64, &'static [u8]>,
        id: IndividualId,
    ) -> Result<Option<Individual>, KinshipError> {
        match table.get(id.0).map_err(io_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn read_family(
        table: &Table<'_, u64, &'static [u8]>,
        id: FamilyId,
    ) -> Result<Option<Family>, KinshipError> {
        match table.get(id.0).map_err(io_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    /// Apply one op inside an open write transaction.
    fn apply_op(txn: &WriteTransaction, op: WriteOp) -> Result<(), KinshipError> {
        match op {
            WriteOp::PutIndividual(individual) => {
                let mut people = txn.open_table(INDIVIDUALS).map_err(io_err)?;
                let mut children = txn.open_table(CHILDREN).map_err(io_err)?;
                let old = Self::read_individual(&people, individual.id)?
                    .ok_or(KinshipError::IndividualNotFound(individual.id))?;
                if let Some(family) = old.child_in_family {
                    children.remove((family.0, old.id.0)).map_err(io_err)?;
                }
                if let Some(family) = individual.child_in_family {
                    children
                        .insert((family.0, individual.id.0), ())
                        .map_err(io_err)?;
                }
                let bytes = encode(&individual)?;
                people
                    .insert(individual.id.0, bytes.as_slice())
                    .map_err(io_err)?;
            }
            WriteOp::RemoveIndividual(id) => {
                let mut people = txn.open_table(INDIVIDUALS).map_err(io_err)?;
                let mut children = txn.open_table(CHILDREN).map_err(io_err)?;
                if let Some(old) = Self::read_individual(&people, id)? {
                    if let Some(family) = old.child_in_family {
                        children.remove((family.0, id.0)).map_err(io_err)?;
                    }
                    people.remove(id.0).map_err(io_err)?;
                }
            }
            WriteOp::PutFamily(family) => {
                let mut families = txn.open_table(FAMILIES).map_err(io_err)?;
                let mut partners = txn.open_table(PARTNERS).map_err(io_err)?;
                let old = Self::read_family(&families, family.id)?
                    .ok_or(KinshipError::FamilyNotFound(family.id))?;
                for partner in &old.partners {
                    partners.remove((partner.0, old.id.0)).map_err(io_err)?;
                }
                for partner in &family.partners {
                    partners.insert((partner.0, family.id.0), ()).map_err(io_err)?;
                }
                let bytes = encode(&family)?;
                families
                    .insert(family.id.0, bytes.as_slice())
                    .map_err(io_err)?;
            }
            WriteOp::RemoveFamily(id) => {
                let mut families = txn.open_table(FAMILIES).map_err(io_err)?;
                let mut partners = txn.open_table(PARTNERS).map_err(io_err)?;
                if let Some(old) = Self::read_family(&families, id)? {
                    for partner in &old.partners {
                        partners.remove((partner.0, id.0)).map_err(io_err)?;
                    }
                    families.remove(id.0).map_err(io_err)?;
                }
            }
        }
        Ok(())
    }

    /// Scan a membership table for all second-key values under `first`.
    fn members(
        &self,
        table: TableDefinition<'_, (u64, u64), ()>,
        first: u64,
    ) -> Result<Vec<u64>, KinshipError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(table).map_err(io_err)?;
        let mut out = Vec::new();
        for entry in table
            .range((first, 0u64)..=(first, u64::MAX))
            .map_err(io_err)?
        {
            let (key, _) = entry.map_err(io_err)?;
            out.push(key.value().1);
        }
        Ok(out)
    }

    fn keys(&self, table: TableDefinition<'_, u64, &'static [u8]>) -> Result<Vec<u64>, KinshipError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(table).map_err(io_err)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (key, _) = entry.map_err(io_err)?;
            out.push(key.value());
        }
        Ok(out)
    }

    fn count(&self, table: TableDefinition<'_, u64, &'static [u8]>) -> Result<usize, KinshipError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(table).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    fn insert_record(
        &self,
        table: TableDefinition<'_, u64, &'static [u8]>,
        id: u64,
        bytes: &[u8],
        counter: &str,
        next: u64,
    ) -> Result<(), KinshipError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut records = write_txn.open_table(table).map_err(io_err)?;
            records.insert(id, bytes).map_err(io_err)?;
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            meta.insert(counter, next).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }
}

// =============================================================================
// RECORDSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl RecordStore for RedbStore {
    fn insert_individual(&mut self, details: PersonDetails) -> Result<IndividualId, KinshipError> {
        let id = IndividualId(self.next_individual_id);
        let next = self.next_individual_id.saturating_add(1);
        let bytes = encode(&Individual::new(id, details))?;
        self.insert_record(INDIVIDUALS, id.0, &bytes, NEXT_INDIVIDUAL_ID, next)?;

        // Update counter only after successful commit.
        self.next_individual_id = next;
        Ok(id)
    }

    fn insert_family(&mut self, details: FamilyDetails) -> Result<FamilyId, KinshipError> {
        let id = FamilyId(self.next_family_id);
        let next = self.next_family_id.saturating_add(1);
        let bytes = encode(&Family::new(id, details))?;
        self.insert_record(FAMILIES, id.0, &bytes, NEXT_FAMILY_ID, next)?;

        self.next_family_id = next;
        Ok(id)
    }

    fn individual(&self, id: IndividualId) -> Result<Option<Individual>, KinshipError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(INDIVIDUALS).map_err(io_err)?;
        match table.get(id.0).map_err(io_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn family(&self, id: FamilyId) -> Result<Option<Family>, KinshipError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(FAMILIES).map_err(io_err)?;
        match table.get(id.0).map_err(io_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<(), KinshipError> {
        if batch.is_empty() {
            return Ok(());
        }
        let write_txn = self.db.begin_write().map_err(io_err)?;
        for op in batch.into_ops() {
            // An error drops the transaction uncommitted, which aborts it.
            Self::apply_op(&write_txn, op)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn individual_ids(&self) -> Result<Vec<IndividualId>, KinshipError> {
        Ok(self
            .keys(INDIVIDUALS)?
            .into_iter()
            .map(IndividualId)
            .collect())
    }

    fn family_ids(&self) -> Result<Vec<FamilyId>, KinshipError> {
        Ok(self.keys(FAMILIES)?.into_iter().map(FamilyId).collect())
    }

    fn families_with_partner(&self, id: IndividualId) -> Result<Vec<FamilyId>, KinshipError> {
        Ok(self
            .members(PARTNERS, id.0)?
            .into_iter()
            .map(FamilyId)
            .collect())
    }

    fn children_in_family(&self, id: FamilyId) -> Result<Vec<IndividualId>, KinshipError> {
        Ok(self
            .members(CHILDREN, id.0)?
            .into_iter()
            .map(IndividualId)
            .collect())
    }

    fn individual_count(&self) -> Result<usize, KinshipError> {
        self.count(INDIVIDUALS)
    }

    fn family_count(&self) -> Result<usize, KinshipError> {
        self.count(FAMILIES)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::Sex;
    use tempfile::tempdir;

    fn person(first: &str, last: &str) -> PersonDetails {
        PersonDetails::named(first, last, Sex::Unknown)
    }

    #[test]
    fn basic_operations() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let a = store.insert_individual(person("Alice", "Aitken")).expect("insert");
        let b = store.insert_individual(person("Bob", "Baker")).expect("insert");
        assert_ne!(a, b);
        assert_eq!(store.individual_count().expect("count"), 2);

        let alice = store.individual(a).expect("get").expect("exists");
        assert_eq!(alice.details.first_name, "Alice");
        assert!(store.individual(IndividualId(99)).expect("get").is_none());
    }

    #[test]
    fn persistence_across_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        let (a, f) = {
            let mut store = RedbStore::open(&db_path).expect("open db");
            let a = store.insert_individual(person("Alice", "Aitken")).expect("insert");
            let f = store.insert_family(FamilyDetails::default()).expect("insert");
            let mut family = store.family(f).expect("get").expect("exists");
            family.partners.push(a);
            family.name = "Aitken, Alice".to_string();
            let mut batch = WriteBatch::new();
            batch.put_family(family);
            store.apply(batch).expect("apply");
            (a, f)
        };

        let mut store = RedbStore::open(&db_path).expect("reopen");
        assert_eq!(store.families_with_partner(a).expect("query"), vec![f]);
        assert_eq!(
            store.family(f).expect("get").expect("exists").name,
            "Aitken, Alice"
        );

        // Counters survive the reopen.
        let next = store.insert_individual(person("Bob", "Baker")).expect("insert");
        assert_eq!(next, IndividualId(1));
    }

    #[test]
    fn child_membership_range_scan() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let f = store.insert_family(FamilyDetails::default()).expect("insert");
        let other = store.insert_family(FamilyDetails::default()).expect("insert");
        let mut batch = WriteBatch::new();
        for name in ["A", "B", "C"] {
            let id = store.insert_individual(person(name, "Child")).expect("insert");
            let mut child = store.individual(id).expect("get").expect("exists");
            child.child_in_family = Some(f);
            batch.put_individual(child);
        }
        store.apply(batch).expect("apply");

        assert_eq!(store.children_in_family(f).expect("query").len(), 3);
        assert!(store.children_in_family(other).expect("query").is_empty());
    }

    #[test]
    fn failed_batch_is_rolled_back() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let a = store.insert_individual(person("Alice", "Aitken")).expect("insert");
        let f = store.insert_family(FamilyDetails::default()).expect("insert");
        let mut family = store.family(f).expect("get").expect("exists");
        family.partners.push(a);

        let mut batch = WriteBatch::new();
        batch.put_family(family);
        batch.put_individual(Individual::new(IndividualId(42), person("No", "One")));

        let result = store.apply(batch);
        assert!(matches!(result, Err(KinshipError::IndividualNotFound(_))));
        assert!(store.families_with_partner(a).expect("query").is_empty());
        assert!(store.family(f).expect("get").expect("exists").partners.is_empty());
    }

    #[test]
    fn remove_family_drops_membership() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let a = store.insert_individual(person("Alice", "Aitken")).expect("insert");
        let f = store.insert_family(FamilyDetails::default()).expect("insert");
        let mut family = store.family(f).expect("get").expect("exists");
        family.partners.push(a);
        let mut batch = WriteBatch::new();
        batch.put_family(family);
        store.apply(batch).expect("apply");

        let mut batch = WriteBatch::new();
        batch.remove_family(f);
        store.apply(batch).expect("apply");

        assert_eq!(store.family_count().expect("count"), 0);
        assert!(store.families_with_partner(a).expect("query").is_empty());
        assert!(store.family_ids().expect("ids").is_empty());
    }
}
