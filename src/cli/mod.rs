//! CLI command implementations
//!
//! Handles all command-line interface operations:
//! - load: Ingest an extractor output pair into the database
//! - status: Show per-table row counts

mod commands;
mod config;

pub use commands::*;
pub use config::*;
