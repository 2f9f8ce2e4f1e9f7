//! # kinship-core
//!
//! The genealogical graph engine for Kinship.
//!
//! People (`Individual`) and partnership units (`Family`) are linked by two
//! relations: each person is a child in at most one family, and a family
//! has any number of partners. On top of that the engine derives display
//! names, a searchable family-name index, and flattened lineage walks.
//!
//! ## Layout
//!
//! - `fuzzy_date`, `names`: leaf helpers for loosely formatted dates and names
//! - `store`, `storage`: the `RecordStore` seam with in-memory and redb backends
//! - `relations`, `traversal`: read-only queries over a store
//! - `index`: the family name index
//! - `genealogy`: the façade that runs every mutation as one atomic unit
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies (pure Rust)
//! - Deterministic: `BTreeMap`/`BTreeSet` wherever order is observable
//! - A mutation either finishes its cascade (cached family name, index
//!   entries) or is rejected without changing anything

// =============================================================================
// MODULES
// =============================================================================

pub mod export;
pub mod fuzzy_date;
pub mod genealogy;
pub mod index;
pub mod names;
pub mod primitives;
pub mod relations;
pub mod storage;
pub mod store;
pub mod traversal;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Event, Family, FamilyDetails, FamilyId, Individual, IndividualId, KinshipError,
    PersonDetails, Sex,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use export::Snapshot;
pub use genealogy::{Genealogy, IndividualDetail, StorageBackend};
pub use index::FamilyNameIndex;
pub use names::{display_name, formal_name, full_name, lifetime};
pub use store::{MemoryStore, RecordStore, WriteBatch};
pub use storage::RedbStore;
pub use traversal::{AncestorEntry, DescendantEntry, FamilyView};
