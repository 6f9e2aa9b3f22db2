//! taskdeck library
//!
//! Typed repositories and session-wide state stores for a task/project
//! tracker over a document store. Exported for the CLI and for testing.

pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod format;
pub mod identity;
pub mod logging;
pub mod repo;
pub mod session;
pub mod store;
pub mod types;
pub mod validation;
pub mod views;
