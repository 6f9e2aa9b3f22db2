//! CLI command definitions for taskdeck
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod category;
pub mod project;
pub mod task;

use crate::format::OutputFormat;
use category::CategoryCommand;
use clap::{Parser, Subcommand};
use project::ProjectCommand;
use std::path::PathBuf;
use task::TaskCommand;

/// Task and project tracker over a local document store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Use the in-memory store instead of SQLite (nothing is persisted)
    #[arg(long, global = true)]
    pub memory: bool,

    /// Act as this user id (overrides config)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format: markdown or json
    #[arg(short, long, default_value = "markdown", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, list, edit and delete tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Create, list, edit and delete projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Create, list and delete categories
    #[command(subcommand)]
    Category(CategoryCommand),

    /// Show task and project counts
    Dashboard,

    /// Show tasks with due dates grouped by day
    Calendar,
}
