//! # Kinship CLI Module
//!
//! This module implements the CLI interface for Kinship.
//!
//! ## Available Commands
//!
//! - `init` - Initialize new database
//! - `status` - Show record counts
//! - `add-person` / `edit-person` / `remove-person` - Person records
//! - `add-family` / `remove-family` - Family records
//! - `add-child` / `detach-child` - Child-in-family links
//! - `show` - Show a person or family
//! - `search` - Ranked family-name search
//! - `ancestors` / `descendants` - Lineage walks
//! - `rebuild-names` - Recompute every cached family name
//! - `export` / `import` - Whole-tree snapshots

mod commands;

use crate::config::{Backend, Config};
use clap::{Args, Parser, Subcommand, ValueEnum};
use kinship_core::{FamilyId, IndividualId, KinshipError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Kinship - family tree engine
///
/// Records people and families, keeps family names and the search index in
/// step with every change, and walks lineages up and down.
#[derive(Parser, Debug)]
#[command(name = "kinship")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the database (overrides config and KINSHIP_DB)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides config)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Path to a kinship.toml config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Name, sex and life events of a person.
///
/// Every field is optional so the same set serves `edit-person`, where only
/// the given fields change.
#[derive(Args, Debug, Clone, Default)]
pub struct PersonArgs {
    /// First name
    #[arg(long)]
    pub first: Option<String>,

    /// Last name
    #[arg(long)]
    pub last: Option<String>,

    /// Sex code: M, F or anything else for unknown
    #[arg(long)]
    pub sex: Option<String>,

    /// Birth date (free text, e.g. "abt 1850")
    #[arg(long)]
    pub born: Option<String>,

    /// Birth place
    #[arg(long)]
    pub born_at: Option<String>,

    /// Death date
    #[arg(long)]
    pub died: Option<String>,

    /// Death place
    #[arg(long)]
    pub died_at: Option<String>,

    /// Baptism date
    #[arg(long)]
    pub baptised: Option<String>,

    /// Baptism place
    #[arg(long)]
    pub baptised_at: Option<String>,

    /// Burial date
    #[arg(long)]
    pub buried: Option<String>,

    /// Burial place
    #[arg(long)]
    pub buried_at: Option<String>,

    /// Occupation
    #[arg(long)]
    pub occupation: Option<String>,

    /// Free-text note
    #[arg(long)]
    pub note: Option<String>,
}

/// Export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Pretty-printed JSON
    Json,
    /// Compact binary snapshot with checksum
    Binary,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show record counts
    Status,

    /// Add a person
    AddPerson(PersonArgs),

    /// Change fields of a person
    EditPerson {
        /// Person identifier (e.g. I3)
        id: IndividualId,

        #[command(flatten)]
        person: PersonArgs,
    },

    /// Delete a person, removing them from every family they partner in
    RemovePerson {
        /// Person identifier
        id: IndividualId,
    },

    /// Create a family from its partners
    AddFamily {
        /// Partner identifier (repeat for each partner)
        #[arg(short, long = "partner")]
        partners: Vec<IndividualId>,

        /// Marriage date
        #[arg(long)]
        married: Option<String>,

        /// Marriage place
        #[arg(long)]
        married_at: Option<String>,

        /// Free-text note
        #[arg(long)]
        note: Option<String>,
    },

    /// Delete a family; its children lose their parents link
    RemoveFamily {
        /// Family identifier (e.g. F2)
        id: FamilyId,
    },

    /// Record a person as a child of a family
    AddChild {
        /// Family identifier
        #[arg(long)]
        family: FamilyId,

        /// Child identifier
        #[arg(long)]
        child: IndividualId,
    },

    /// Remove a person's child-in-family link
    DetachChild {
        /// Child identifier
        child: IndividualId,
    },

    /// Show a person (I3 or 3) or a family (F2)
    Show {
        /// Record identifier
        record: String,
    },

    /// Search families by partner names
    Search {
        /// Query words
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// List a person and all their ancestors
    Ancestors {
        /// Person identifier
        id: IndividualId,
    },

    /// List a person and all their descendants
    Descendants {
        /// Person identifier
        id: IndividualId,
    },

    /// Recompute every cached family name and rebuild the search index
    RebuildNames,

    /// Export every record to a file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format
        #[arg(short = 't', long, value_enum, default_value = "json")]
        format: ExportFormat,
    },

    /// Import a snapshot (file backend only)
    Import {
        /// Input file path (JSON or binary snapshot)
        #[arg(short, long)]
        input: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolved storage settings for one run.
#[derive(Debug, Clone)]
pub struct Target {
    pub database: PathBuf,
    pub backend: Backend,
    pub json_mode: bool,
}

impl Target {
    /// Merge command-line flags over the loaded config.
    #[must_use]
    pub fn resolve(cli: &Cli, config: &Config) -> Self {
        Self {
            database: cli
                .database
                .clone()
                .unwrap_or_else(|| config.storage.database.clone()),
            backend: cli.backend.unwrap_or(config.storage.backend),
            json_mode: cli.json_mode,
        }
    }
}

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli, config: &Config) -> Result<(), KinshipError> {
    let target = Target::resolve(&cli, config);

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&target, force),
        Some(Commands::Status) | None => cmd_status(&target),
        Some(Commands::AddPerson(person)) => cmd_add_person(&target, &person),
        Some(Commands::EditPerson { id, person }) => cmd_edit_person(&target, id, &person),
        Some(Commands::RemovePerson { id }) => cmd_remove_person(&target, id),
        Some(Commands::AddFamily {
            partners,
            married,
            married_at,
            note,
        }) => cmd_add_family(&target, &partners, married, married_at, note),
        Some(Commands::RemoveFamily { id }) => cmd_remove_family(&target, id),
        Some(Commands::AddChild { family, child }) => cmd_add_child(&target, family, child),
        Some(Commands::DetachChild { child }) => cmd_detach_child(&target, child),
        Some(Commands::Show { record }) => cmd_show(&target, &record),
        Some(Commands::Search { query }) => cmd_search(&target, &query.join(" ")),
        Some(Commands::Ancestors { id }) => cmd_ancestors(&target, id),
        Some(Commands::Descendants { id }) => cmd_descendants(&target, id),
        Some(Commands::RebuildNames) => cmd_rebuild_names(&target),
        Some(Commands::Export { output, format }) => cmd_export(&target, &output, format),
        Some(Commands::Import { input }) => cmd_import(&target, &input),
    }
}
