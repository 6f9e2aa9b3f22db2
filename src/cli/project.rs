//! Project subcommands.

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// List projects, newest first
    List,

    /// Rename or re-describe a project
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
    },

    /// Delete a project
    Rm { id: String },
}
