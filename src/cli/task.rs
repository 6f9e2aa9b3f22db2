//! Task subcommands.

use crate::types::{TaskPriority, TaskStatus};
use crate::views::{SortDirection, SortField, TaskFilter, TaskSort};
use chrono::NaiveDate;
use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task
    Add(AddTaskArgs),

    /// List tasks, optionally filtered and sorted
    List(ListTaskArgs),

    /// Change fields of a task
    Edit(EditTaskArgs),

    /// Mark a task completed
    Done {
        /// Task id
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task id
        id: String,
    },

    /// File a task under a category
    Categorize {
        /// Task id
        task_id: String,
        /// Category id
        category_id: String,
    },

    /// Show the categories a task is filed under
    Categories {
        /// Task id
        task_id: String,
    },
}

#[derive(Args, Debug)]
pub struct AddTaskArgs {
    /// Task title
    pub title: String,

    #[arg(long)]
    pub description: Option<String>,

    /// Owning project id
    #[arg(long)]
    pub project: Option<String>,

    /// todo, in_progress or completed
    #[arg(long)]
    pub status: Option<TaskStatus>,

    /// low, medium or high
    #[arg(long)]
    pub priority: Option<TaskPriority>,

    /// Due date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub due: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct ListTaskArgs {
    /// Case-insensitive text to look for in title or description
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub status: Option<TaskStatus>,

    #[arg(long)]
    pub priority: Option<TaskPriority>,

    /// created_at, due_date, priority, status or title
    #[arg(long, default_value = "created_at")]
    pub sort: SortField,

    /// Sort ascending instead of descending
    #[arg(long)]
    pub asc: bool,
}

impl ListTaskArgs {
    pub fn filter(&self) -> TaskFilter {
        TaskFilter {
            search: self.search.clone(),
            status: self.status,
            priority: self.priority,
        }
    }

    pub fn sort(&self) -> TaskSort {
        TaskSort {
            field: self.sort,
            direction: if self.asc {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct EditTaskArgs {
    /// Task id
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    #[arg(long)]
    pub clear_description: bool,

    #[arg(long)]
    pub status: Option<TaskStatus>,

    #[arg(long)]
    pub priority: Option<TaskPriority>,

    /// Due date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", conflicts_with = "clear_due")]
    pub due: Option<NaiveDate>,

    #[arg(long)]
    pub clear_due: bool,

    /// Fail instead of overwriting if the task changed since this instant (RFC 3339)
    #[arg(long, value_name = "UPDATED_AT")]
    pub if_unchanged_since: Option<String>,
}
