//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Each command opens the store, runs one engine operation, saves (file
//! backend only) and prints either text or JSON.

use super::{ExportFormat, PersonArgs, Target};
use crate::config::Backend;
use crate::output::{
    MutationResponse, SearchHit, StatusResponse, render_ancestors, render_descendants,
    render_detail, render_family, render_search,
};
use kinship_core::export::{decode, encode};
use kinship_core::{
    Event, FamilyDetails, FamilyId, Genealogy, IndividualId, KinshipError, PersonDetails, Sex,
    Snapshot,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a snapshot file read by the file backend or `import` (500 MB).
const MAX_SNAPSHOT_FILE_SIZE: u64 = 500 * 1024 * 1024;

fn io_err(context: &str, e: impl std::fmt::Display) -> KinshipError {
    KinshipError::IoError(format!("{context}: {e}"))
}

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), KinshipError> {
    let metadata = std::fs::metadata(path).map_err(|e| io_err("Cannot read file metadata", e))?;

    if metadata.len() > max_size {
        return Err(KinshipError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an output path: the parent directory must exist.
///
/// Returns the path with its parent canonicalized.
fn validate_output_path(path: &Path) -> Result<PathBuf, KinshipError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent
        .canonicalize()
        .map_err(|e| io_err(&format!("Invalid output directory '{}'", parent.display()), e))?;
    if !canonical_parent.is_dir() {
        return Err(KinshipError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| KinshipError::IoError("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

// =============================================================================
// STORE HELPERS
// =============================================================================

/// Parse a snapshot file: binary first, then JSON.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, KinshipError> {
    validate_file_size(path, MAX_SNAPSHOT_FILE_SIZE)?;
    let data = std::fs::read(path).map_err(|e| io_err("Read snapshot", e))?;

    if let Ok(snapshot) = decode(&data) {
        return Ok(snapshot);
    }
    let text = std::str::from_utf8(&data).map_err(|_| {
        KinshipError::DeserializationError("Could not parse snapshot file".to_string())
    })?;
    Snapshot::from_json(text)
}

/// Open the genealogy for a run.
pub fn open_genealogy(target: &Target) -> Result<Genealogy, KinshipError> {
    match target.backend {
        Backend::Redb => Genealogy::open(&target.database),
        Backend::File => {
            if target.database.exists() {
                Genealogy::from_snapshot(read_snapshot(&target.database)?)
            } else {
                Ok(Genealogy::new())
            }
        }
    }
}

/// Persist after a mutation. redb commits as it goes; the file backend
/// rewrites the whole snapshot.
pub fn save_genealogy(genealogy: &Genealogy, target: &Target) -> Result<(), KinshipError> {
    if genealogy.is_persistent() {
        return Ok(());
    }
    let data = encode(&genealogy.snapshot()?)?;
    std::fs::write(&target.database, &data).map_err(|e| io_err("Write database", e))?;
    tracing::debug!(bytes = data.len(), "snapshot written to {}", target.database.display());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), KinshipError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| KinshipError::SerializationError(e.to_string()))?;
    println!("{json}");
    Ok(())
}

fn respond(target: &Target, response: &MutationResponse) -> Result<(), KinshipError> {
    if target.json_mode {
        return print_json(response);
    }
    match &response.id {
        Some(id) => println!("{} [{}]", response.message, id),
        None => println!("{}", response.message),
    }
    Ok(())
}

/// Apply the given fields over `base`.
#[must_use]
pub fn merge_person(args: &PersonArgs, base: PersonDetails) -> PersonDetails {
    fn set(field: &mut String, value: Option<&String>) {
        if let Some(v) = value {
            field.clone_from(v);
        }
    }

    let mut details = base;
    set(&mut details.first_name, args.first.as_ref());
    set(&mut details.last_name, args.last.as_ref());
    if let Some(code) = &args.sex {
        details.sex = Sex::from_code(code);
    }
    set(&mut details.birth.date, args.born.as_ref());
    set(&mut details.birth.location, args.born_at.as_ref());
    set(&mut details.death.date, args.died.as_ref());
    set(&mut details.death.location, args.died_at.as_ref());
    set(&mut details.baptism.date, args.baptised.as_ref());
    set(&mut details.baptism.location, args.baptised_at.as_ref());
    set(&mut details.burial.date, args.buried.as_ref());
    set(&mut details.burial.location, args.buried_at.as_ref());
    set(&mut details.occupation, args.occupation.as_ref());
    set(&mut details.note, args.note.as_ref());
    details
}

// =============================================================================
// INIT / STATUS
// =============================================================================

/// Initialize new database.
pub fn cmd_init(target: &Target, force: bool) -> Result<(), KinshipError> {
    let path = &target.database;
    if path.exists() {
        if !force {
            return Err(KinshipError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path).map_err(|e| io_err("Remove database", e))?;
        tracing::warn!("existing database {} removed", path.display());
    }

    let genealogy = match target.backend {
        Backend::Redb => Genealogy::open(path)?,
        Backend::File => Genealogy::new(),
    };
    save_genealogy(&genealogy, target)?;

    respond(
        target,
        &MutationResponse::done(format!(
            "Initialized new {} database at {}",
            target.backend.as_str(),
            path.display()
        )),
    )
}

/// Show record counts.
pub fn cmd_status(target: &Target) -> Result<(), KinshipError> {
    let genealogy = open_genealogy(target)?;
    let status = StatusResponse {
        database: target.database.display().to_string(),
        backend: target.backend.as_str().to_string(),
        persistent: genealogy.is_persistent(),
        individuals: genealogy.individual_count()?,
        families: genealogy.family_count()?,
        index_tokens: genealogy.index().token_count(),
    };

    if target.json_mode {
        return print_json(&status);
    }

    println!("Kinship Status");
    println!("==============");
    println!("Database:    {}", status.database);
    println!("Backend:     {}", status.backend);
    println!();
    println!("Individuals: {}", status.individuals);
    println!("Families:    {}", status.families);
    println!("Name tokens: {}", status.index_tokens);
    Ok(())
}

// =============================================================================
// PERSON COMMANDS
// =============================================================================

pub fn cmd_add_person(target: &Target, args: &PersonArgs) -> Result<(), KinshipError> {
    let mut genealogy = open_genealogy(target)?;
    let details = merge_person(args, PersonDetails::default());
    let id = genealogy.add_individual(details)?;
    save_genealogy(&genealogy, target)?;

    let name = genealogy.display_name(id)?;
    respond(target, &MutationResponse::ok(id, format!("Added {name}")))
}

pub fn cmd_edit_person(
    target: &Target,
    id: IndividualId,
    args: &PersonArgs,
) -> Result<(), KinshipError> {
    let mut genealogy = open_genealogy(target)?;
    let current = genealogy.individual(id)?;
    let details = merge_person(args, current.details);
    genealogy.update_individual(id, details)?;
    save_genealogy(&genealogy, target)?;

    let name = genealogy.display_name(id)?;
    respond(target, &MutationResponse::ok(id, format!("Updated {name}")))
}

pub fn cmd_remove_person(target: &Target, id: IndividualId) -> Result<(), KinshipError> {
    let mut genealogy = open_genealogy(target)?;
    let name = genealogy.display_name(id)?;
    genealogy.delete_individual(id)?;
    save_genealogy(&genealogy, target)?;

    respond(target, &MutationResponse::ok(id, format!("Removed {name}")))
}

// =============================================================================
// FAMILY COMMANDS
// =============================================================================

pub fn cmd_add_family(
    target: &Target,
    partners: &[IndividualId],
    married: Option<String>,
    married_at: Option<String>,
    note: Option<String>,
) -> Result<(), KinshipError> {
    let mut genealogy = open_genealogy(target)?;
    let details = FamilyDetails {
        married: Event::new(married.unwrap_or_default(), married_at.unwrap_or_default()),
        note: note.unwrap_or_default(),
    };
    let id = genealogy.create_family(details, partners)?;
    save_genealogy(&genealogy, target)?;

    let name = genealogy.family(id)?.name;
    respond(target, &MutationResponse::ok(id, format!("Added family {name}")))
}

pub fn cmd_remove_family(target: &Target, id: FamilyId) -> Result<(), KinshipError> {
    let mut genealogy = open_genealogy(target)?;
    let name = genealogy.family(id)?.name;
    genealogy.delete_family(id)?;
    save_genealogy(&genealogy, target)?;

    respond(target, &MutationResponse::ok(id, format!("Removed family {name}")))
}

pub fn cmd_add_child(
    target: &Target,
    family: FamilyId,
    child: IndividualId,
) -> Result<(), KinshipError> {
    let mut genealogy = open_genealogy(target)?;
    genealogy.set_child_in_family(child, family)?;
    save_genealogy(&genealogy, target)?;

    respond(
        target,
        &MutationResponse::ok(child, format!("{child} is now a child in {family}")),
    )
}

pub fn cmd_detach_child(target: &Target, child: IndividualId) -> Result<(), KinshipError> {
    let mut genealogy = open_genealogy(target)?;
    let previous = genealogy.clear_child_in_family(child)?;
    save_genealogy(&genealogy, target)?;

    let message = match previous {
        Some(family) => format!("{child} detached from {family}"),
        None => format!("{child} was not a child in any family"),
    };
    respond(target, &MutationResponse::ok(child, message))
}

// =============================================================================
// QUERY COMMANDS
// =============================================================================

/// Show a person or a family.
pub fn cmd_show(target: &Target, record: &str) -> Result<(), KinshipError> {
    let genealogy = open_genealogy(target)?;

    if record.trim_start().starts_with(['F', 'f']) {
        let id: FamilyId = record.parse()?;
        let family = genealogy.family(id)?;
        let partners = family
            .partners
            .iter()
            .map(|p| genealogy.individual(*p))
            .collect::<Result<Vec<_>, _>>()?;
        let children = genealogy.family_children(id)?;

        if target.json_mode {
            return print_json(&serde_json::json!({
                "family": family,
                "partners": partners,
                "children": children,
            }));
        }
        print!("{}", render_family(&family, &partners, &children));
        return Ok(());
    }

    let id: IndividualId = record.parse()?;
    let detail = genealogy.individual_detail(id)?;
    if target.json_mode {
        return print_json(&detail);
    }
    print!("{}", render_detail(&detail));
    Ok(())
}

pub fn cmd_search(target: &Target, query: &str) -> Result<(), KinshipError> {
    let genealogy = open_genealogy(target)?;
    let hits: Vec<SearchHit> = genealogy
        .search(query)?
        .iter()
        .map(SearchHit::from)
        .collect();
    tracing::debug!(query, hits = hits.len(), "search");

    if target.json_mode {
        return print_json(&hits);
    }
    print!("{}", render_search(&hits));
    Ok(())
}

pub fn cmd_ancestors(target: &Target, id: IndividualId) -> Result<(), KinshipError> {
    let genealogy = open_genealogy(target)?;
    let entries = genealogy.ancestors(id)?;
    if target.json_mode {
        return print_json(&entries);
    }
    print!("{}", render_ancestors(&entries));
    Ok(())
}

pub fn cmd_descendants(target: &Target, id: IndividualId) -> Result<(), KinshipError> {
    let genealogy = open_genealogy(target)?;
    let entries = genealogy.descendants(id)?;
    if target.json_mode {
        return print_json(&entries);
    }
    print!("{}", render_descendants(&entries));
    Ok(())
}

// =============================================================================
// MAINTENANCE COMMANDS
// =============================================================================

/// Recompute every family name.
pub fn cmd_rebuild_names(target: &Target) -> Result<(), KinshipError> {
    let mut genealogy = open_genealogy(target)?;
    let count = genealogy.recompute_all_family_names()?;
    save_genealogy(&genealogy, target)?;

    respond(
        target,
        &MutationResponse::done(format!("Recomputed {count} family names")),
    )
}

/// Export every record.
pub fn cmd_export(target: &Target, output: &Path, format: ExportFormat) -> Result<(), KinshipError> {
    let validated_output = validate_output_path(output)?;
    let genealogy = open_genealogy(target)?;
    let snapshot = genealogy.snapshot()?;

    let data = match format {
        ExportFormat::Json => snapshot.to_json()?.into_bytes(),
        ExportFormat::Binary => encode(&snapshot)?,
    };
    std::fs::write(&validated_output, &data).map_err(|e| io_err("Write file", e))?;

    respond(
        target,
        &MutationResponse::done(format!(
            "Exported {} individuals and {} families ({} bytes) to {}",
            snapshot.individuals.len(),
            snapshot.families.len(),
            data.len(),
            validated_output.display()
        )),
    )
}

/// Import a snapshot, replacing the file database.
pub fn cmd_import(target: &Target, input: &Path) -> Result<(), KinshipError> {
    if target.backend == Backend::Redb {
        return Err(KinshipError::IoError(
            "Import into redb is not supported. Use --backend file.".to_string(),
        ));
    }

    let genealogy = Genealogy::from_snapshot(read_snapshot(input)?)?;
    save_genealogy(&genealogy, target)?;

    respond(
        target,
        &MutationResponse::done(format!(
            "Imported {} individuals and {} families",
            genealogy.individual_count()?,
            genealogy.family_count()?
        )),
    )
}
