//! # Snapshot Export
//!
//! A full dump of every record, in two encodings:
//!
//! - JSON, for people and other tools (`to_json` / `from_json`)
//! - a compact postcard stream behind a checked header (`encode` / `decode`)
//!
//! Records are kept in ascending identifier order, so the same data always
//! produces the same bytes.

use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES};
use crate::{Family, FamilyId, Individual, IndividualId, KinshipError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maximum number of records accepted by [`decode`].
///
/// Guards against allocating for a corrupted or hostile header.
pub const MAX_IMPORT_RECORDS: u64 = 10_000_000;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Every person and family record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u8,
    pub individuals: Vec<Individual>,
    pub families: Vec<Family>,
}

impl Snapshot {
    /// Build a snapshot, sorting records by identifier.
    #[must_use]
    pub fn new(mut individuals: Vec<Individual>, mut families: Vec<Family>) -> Self {
        individuals.sort_by_key(|i| i.id);
        families.sort_by_key(|f| f.id);
        Self {
            format_version: FORMAT_VERSION,
            individuals,
            families,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, KinshipError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| KinshipError::SerializationError(e.to_string()))
    }

    /// Parse JSON produced by [`Snapshot::to_json`].
    pub fn from_json(json: &str) -> Result<Self, KinshipError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| KinshipError::DeserializationError(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    fn check_version(&self) -> Result<(), KinshipError> {
        if self.format_version != FORMAT_VERSION {
            return Err(KinshipError::DeserializationError(format!(
                "unsupported snapshot version {}",
                self.format_version
            )));
        }
        Ok(())
    }

    /// Verify that identifiers are unique and every reference resolves.
    ///
    /// Checks partner lists (existing, no repeats) and child-in-family links.
    pub fn check_references(&self) -> Result<(), KinshipError> {
        let mut people = BTreeSet::new();
        for ind in &self.individuals {
            if !people.insert(ind.id) {
                return Err(KinshipError::InvalidRecord(format!(
                    "duplicate individual {}",
                    ind.id
                )));
            }
        }
        let mut families: BTreeSet<FamilyId> = BTreeSet::new();
        for fam in &self.families {
            if !families.insert(fam.id) {
                return Err(KinshipError::InvalidRecord(format!(
                    "duplicate family {}",
                    fam.id
                )));
            }
            let mut partners: BTreeSet<IndividualId> = BTreeSet::new();
            for partner in &fam.partners {
                if !people.contains(partner) {
                    return Err(KinshipError::IndividualNotFound(*partner));
                }
                if !partners.insert(*partner) {
                    return Err(KinshipError::InvalidRecord(format!(
                        "{partner} is listed more than once in {}",
                        fam.id
                    )));
                }
            }
        }
        for ind in &self.individuals {
            if let Some(family) = ind.child_in_family
                && !families.contains(&family)
            {
                return Err(KinshipError::FamilyNotFound(family));
            }
        }
        Ok(())
    }

    /// Deterministic checksum over the encoded body.
    ///
    /// Catches accidental corruption only; it is not a cryptographic hash.
    fn checksum(body: &[u8]) -> u64 {
        body.iter().fold(0u64, |hash, byte| {
            hash.rotate_left(5) ^ u64::from(*byte)
        })
    }
}

// =============================================================================
// BINARY FORMAT
// =============================================================================

/// Header in front of a binary snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub individual_count: u64,
    pub family_count: u64,
    pub checksum: u64,
}

impl SnapshotHeader {
    fn validate(&self) -> Result<(), KinshipError> {
        if &self.magic != MAGIC_BYTES {
            return Err(KinshipError::DeserializationError(
                "not a kinship snapshot".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(KinshipError::DeserializationError(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }
        if self.individual_count.saturating_add(self.family_count) > MAX_IMPORT_RECORDS {
            return Err(KinshipError::DeserializationError(format!(
                "snapshot exceeds {MAX_IMPORT_RECORDS} records"
            )));
        }
        Ok(())
    }
}

/// Encode a snapshot as `[header_len: u32 LE] [header] [body]`.
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, KinshipError> {
    let body = postcard::to_allocvec(snapshot)
        .map_err(|e| KinshipError::SerializationError(format!("body: {e}")))?;
    let header = SnapshotHeader {
        magic: *MAGIC_BYTES,
        version: FORMAT_VERSION,
        individual_count: snapshot.individuals.len() as u64,
        family_count: snapshot.families.len() as u64,
        checksum: Snapshot::checksum(&body),
    };
    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| KinshipError::SerializationError(format!("header: {e}")))?;
    let header_len = u32::try_from(header_bytes.len())
        .map_err(|_| KinshipError::SerializationError("header too large".to_string()))?;

    let mut out = Vec::with_capacity(4 + header_bytes.len() + body.len());
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode bytes produced by [`encode`], verifying header, checksum and counts.
pub fn decode(data: &[u8]) -> Result<Snapshot, KinshipError> {
    let too_short = || KinshipError::DeserializationError("data too short".to_string());

    let (len_bytes, rest) = data.split_first_chunk::<4>().ok_or_else(too_short)?;
    let header_len = u32::from_le_bytes(*len_bytes) as usize;
    if rest.len() < header_len {
        return Err(too_short());
    }
    let (header_bytes, body) = rest.split_at(header_len);

    let header: SnapshotHeader = postcard::from_bytes(header_bytes)
        .map_err(|e| KinshipError::DeserializationError(format!("header: {e}")))?;
    header.validate()?;

    let computed = Snapshot::checksum(body);
    if computed != header.checksum {
        return Err(KinshipError::DeserializationError(format!(
            "checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }

    let snapshot: Snapshot = postcard::from_bytes(body)
        .map_err(|e| KinshipError::DeserializationError(format!("body: {e}")))?;
    snapshot.check_version()?;
    if snapshot.individuals.len() as u64 != header.individual_count
        || snapshot.families.len() as u64 != header.family_count
    {
        return Err(KinshipError::DeserializationError(
            "record count mismatch".to_string(),
        ));
    }
    Ok(snapshot)
}

// =============================================================================
// TESTS
// =============================================================================
