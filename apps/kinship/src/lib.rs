//! # Kinship
//!
//! Command-line front end for the `kinship-core` genealogy engine.
//!
//! - [`cli`] - argument parsing and `cmd_*` implementations
//! - [`config`] - `kinship.toml` settings and environment overrides
//! - [`output`] - JSON responses and text renderings

pub mod cli;
pub mod config;
pub mod output;
