//! Command-line interface for grabtune.
//!
//! This module provides CLI commands for downloading, searching the catalog,
//! and writing or inspecting MP3 tags.

mod commands;

pub use commands::{Cli, Commands, run_command};
