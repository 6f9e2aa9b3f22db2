//! Category subcommands.

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// Create a category
    Add { name: String },

    /// List categories
    List,

    /// Delete a category
    Rm { id: String },
}
