//! # Core Type Definitions
//!
//! This module contains all record types for the Kinship genealogical graph:
//! - Record identifiers (`IndividualId`, `FamilyId`)
//! - Person and family data (`Individual`, `Family`, `PersonDetails`, `FamilyDetails`)
//! - Life events (`Event`) and the closed `Sex` enum
//! - Error types (`KinshipError`)
//!
//! ## Ownership of Relationships
//!
//! - A `Family` owns its partner list.
//! - An `Individual` owns its single `child_in_family` reference.
//! - "Partner in families" and "children of family" are derived by the store's
//!   membership queries and are never stored twice.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::primitives::{MAX_LOCATION_LENGTH, MAX_NAME_LENGTH, MAX_NOTE_LENGTH};

// =============================================================================
// RECORD IDENTIFIERS
// =============================================================================

/// Unique identifier for a person record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndividualId(pub u64);

/// Unique identifier for a family record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FamilyId(pub u64);

impl fmt::Display for IndividualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0)
    }
}

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// Parse `"I12"`, `"i12"` or a bare `"12"` (prefix letter optional).
fn parse_id(text: &str, prefix: char) -> Result<u64, KinshipError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix(prefix)
        .or_else(|| trimmed.strip_prefix(prefix.to_ascii_lowercase()))
        .unwrap_or(trimmed);
    digits
        .parse()
        .map_err(|_| KinshipError::InvalidRecord(format!("not a {prefix} identifier: {text:?}")))
}

impl FromStr for IndividualId {
    type Err = KinshipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id(s, 'I').map(Self)
    }
}

impl FromStr for FamilyId {
    type Err = KinshipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id(s, 'F').map(Self)
    }
}

// =============================================================================
// SEX
// =============================================================================

/// Recorded sex of an individual.
///
/// Ordering is explicit through [`Sex::rank`]: male, then female, then unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Sex {
    /// Parse a single-letter code. Anything but `M`/`F` is unknown.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "M" | "m" => Self::Male,
            "F" | "f" => Self::Female,
            _ => Self::Unknown,
        }
    }

    /// Single-letter code (`M`, `F`, `?`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Unknown => "?",
        }
    }

    /// Sort rank used when ordering partners: lower ranks come first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Male => 0,
            Self::Female => 1,
            Self::Unknown => 2,
        }
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// A life event: a loosely formatted date plus a place.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Event {
    /// Free-form date text, reduced to a year by `fuzzy_date`.
    pub date: String,
    /// Free-form place text.
    pub location: String,
}

impl Event {
    #[must_use]
    pub fn new(date: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            location: location.into(),
        }
    }

    /// A dated event with no location.
    #[must_use]
    pub fn dated(date: impl Into<String>) -> Self {
        Self::new(date, "")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.date.is_empty() && self.location.is_empty()
    }
}

// =============================================================================
// PERSON DETAILS
// =============================================================================

/// The hand-edited fields of a person record.
///
/// Used both to create an individual and to replace its fields on update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonDetails {
    pub first_name: String,
    pub last_name: String,
    pub sex: Sex,
    pub birth: Event,
    pub death: Event,
    pub burial: Event,
    pub baptism: Event,
    pub occupation: String,
    pub note: String,
}

impl PersonDetails {
    /// Details with only a name and sex.
    #[must_use]
    pub fn named(first_name: impl Into<String>, last_name: impl Into<String>, sex: Sex) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            sex,
            ..Self::default()
        }
    }

    /// Builder: set the birth date.
    #[must_use]
    pub fn born(mut self, date: impl Into<String>) -> Self {
        self.birth.date = date.into();
        self
    }

    /// Builder: set the death date.
    #[must_use]
    pub fn died(mut self, date: impl Into<String>) -> Self {
        self.death.date = date.into();
        self
    }

    /// True when the fields that feed family names and the name index differ.
    #[must_use]
    pub fn name_fields_differ(&self, other: &Self) -> bool {
        self.first_name != other.first_name
            || self.last_name != other.last_name
            || self.sex != other.sex
            || self.birth.date != other.birth.date
            || self.death.date != other.death.date
    }

    /// Check field lengths before anything is written.
    pub fn validate(&self) -> Result<(), KinshipError> {
        check_len("first name", &self.first_name, MAX_NAME_LENGTH)?;
        check_len("last name", &self.last_name, MAX_NAME_LENGTH)?;
        check_len("occupation", &self.occupation, MAX_LOCATION_LENGTH)?;
        check_len("note", &self.note, MAX_NOTE_LENGTH)?;
        for event in [&self.birth, &self.death, &self.burial, &self.baptism] {
            check_len("location", &event.location, MAX_LOCATION_LENGTH)?;
            check_len("date", &event.date, MAX_LOCATION_LENGTH)?;
        }
        Ok(())
    }
}

/// The hand-edited fields of a family record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FamilyDetails {
    pub married: Event,
    pub note: String,
}

impl FamilyDetails {
    pub fn validate(&self) -> Result<(), KinshipError> {
        check_len("married location", &self.married.location, MAX_LOCATION_LENGTH)?;
        check_len("married date", &self.married.date, MAX_LOCATION_LENGTH)?;
        check_len("note", &self.note, MAX_NOTE_LENGTH)
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), KinshipError> {
    let len = value.chars().count();
    if len > max {
        return Err(KinshipError::InvalidRecord(format!(
            "{} is {} characters (max {})",
            field, len, max
        )));
    }
    Ok(())
}

// =============================================================================
// RECORDS
// =============================================================================

/// A single person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    pub id: IndividualId,
    pub details: PersonDetails,
    /// The one family this person is a child in, if any.
    pub child_in_family: Option<FamilyId>,
}

impl Individual {
    #[must_use]
    pub fn new(id: IndividualId, details: PersonDetails) -> Self {
        Self {
            id,
            details,
            child_in_family: None,
        }
    }
}

/// A relationship unit of partners. Children point at it via `child_in_family`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub details: FamilyDetails,
    /// Partners in storage (insertion) order. Never contains duplicates.
    pub partners: Vec<IndividualId>,
    /// Cached display name. Derived; only `Genealogy` writes it.
    pub name: String,
}

impl Family {
    #[must_use]
    pub fn new(id: FamilyId, details: FamilyDetails) -> Self {
        Self {
            id,
            details,
            partners: Vec::new(),
            name: String::new(),
        }
    }

    #[must_use]
    pub fn has_partner(&self, individual: IndividualId) -> bool {
        self.partners.contains(&individual)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Kinship engine.
///
/// - Integrity violations reject the write or abort the traversal
/// - Not-found conditions are reported, never retried
/// - Unknown dates and empty searches are not errors
#[derive(Debug, Error)]
pub enum KinshipError {
    /// No person record with this identifier.
    #[error("Individual not found: {0}")]
    IndividualNotFound(IndividualId),

    /// No family record with this identifier.
    #[error("Family not found: {0}")]
    FamilyNotFound(FamilyId),

    /// The individual is already a child in another family.
    #[error("{individual} is already a child in {existing}; detach before assigning {requested}")]
    AlreadyChildInFamily {
        individual: IndividualId,
        existing: FamilyId,
        requested: FamilyId,
    },

    /// A walk reached an individual already on its own path.
    #[error("Cyclic relationship detected at {0}")]
    CyclicRelationship(IndividualId),

    /// A walk went deeper than the traversal ceiling.
    #[error("Traversal from {start} exceeded {limit} generations")]
    TraversalDepthExceeded { start: IndividualId, limit: usize },

    /// A record failed field validation.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O or storage engine error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl KinshipError {
    /// True for errors caused by malformed or conflicting relationship data.
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::AlreadyChildInFamily { .. }
                | Self::CyclicRelationship(_)
                | Self::TraversalDepthExceeded { .. }
        )
    }

    /// True for missing starting records.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::IndividualNotFound(_) | Self::FamilyNotFound(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================
