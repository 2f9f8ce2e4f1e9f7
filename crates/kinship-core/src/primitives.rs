//! # Engine Primitives
//!
//! Hardcoded runtime constants for the Kinship engine.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Maximum number of generations a lineage walk may descend or ascend.
///
/// A walk that needs more than this is treated as malformed data
/// and fails with `TraversalDepthExceeded`.
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Separator between partner names in a family's display name.
pub const PARTNER_SEPARATOR: &str = " & ";

/// Placeholder for an unknown year in a lifetime span.
pub const UNKNOWN_YEAR: &str = "?";

/// Sort key used for an individual whose birth year is unknown.
pub const UNKNOWN_SORT_YEAR: u32 = 0;

/// Number of digits a run must have to count as a year.
pub const YEAR_DIGITS: usize = 4;

/// Magic bytes for the Kinship binary snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"KINS";

/// Current binary snapshot format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a first or last name.
pub const MAX_NAME_LENGTH: usize = 50;

/// Maximum length of a location, occupation or date string.
pub const MAX_LOCATION_LENGTH: usize = 100;

/// Maximum length of a free-text note (64KB).
pub const MAX_NOTE_LENGTH: usize = 65536;
