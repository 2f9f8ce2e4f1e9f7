//! # Storage
//!
//! Disk-backed `RecordStore` implementations.

mod redb_store;

pub use redb_store::RedbStore;
