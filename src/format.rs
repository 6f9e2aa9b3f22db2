//! Output formatting utilities for markdown and JSON.

use crate::types::{Category, Project, Task};
use crate::views::{CalendarEntry, DashboardSummary};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown format '{}': expected json or markdown", other)),
        }
    }
}

/// Pretty-printed JSON for any serializable value.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

fn format_date(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.title));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **status**: {}\n", task.status));
    md.push_str(&format!("- **priority**: {}\n", task.priority));

    if let Some(ref project_id) = task.project_id {
        md.push_str(&format!("- **project**: `{}`\n", project_id));
    }

    if let Some(ref due) = task.due_date {
        md.push_str(&format!("- **due**: {}\n", format_date(due)));
    }

    if let Some(ref categories) = task.category_ids
        && !categories.is_empty()
    {
        let ids: Vec<String> = categories.iter().map(|id| format!("`{}`", id)).collect();
        md.push_str(&format!("- **categories**: {}\n", ids.join(", ")));
    }

    md.push_str(&format!("- **created**: {}\n", task.created_at.to_rfc3339()));
    md.push_str(&format!("- **updated**: {}\n", task.updated_at.to_rfc3339()));

    if let Some(ref desc) = task.description {
        md.push_str("\n### Description\n");
        md.push_str(desc);
        md.push('\n');
    }

    md
}

/// Format a list of tasks as a markdown table.
pub fn format_tasks_markdown(tasks: &[&Task]) -> String {
    if tasks.is_empty() {
        return "No tasks found.\n".to_string();
    }

    let mut md = String::from("| id | title | status | priority | due |\n|---|---|---|---|---|\n");
    for task in tasks {
        md.push_str(&format!(
            "| `{}` | {} | {} | {} | {} |\n",
            task.id,
            task.title,
            task.status,
            task.priority,
            task.due_date.as_ref().map(format_date).unwrap_or_else(|| "-".to_string()),
        ));
    }
    md
}

pub fn format_project_markdown(project: &Project) -> String {
    let mut md = format!("## Project: {}\n- **id**: `{}`\n", project.name, project.id);
    md.push_str(&format!("- **created**: {}\n", project.created_at.to_rfc3339()));
    if let Some(ref desc) = project.description
        && !desc.is_empty()
    {
        md.push_str("\n### Description\n");
        md.push_str(desc);
        md.push('\n');
    }
    md
}

pub fn format_projects_markdown(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No projects yet.\n".to_string();
    }
    let mut md = String::new();
    for project in projects {
        md.push_str(&format!("- **{}** (`{}`)", project.name, project.id));
        if let Some(ref desc) = project.description
            && !desc.is_empty()
        {
            md.push_str(&format!(": {}", desc));
        }
        md.push('\n');
    }
    md
}

pub fn format_categories_markdown(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories yet.\n".to_string();
    }
    categories
        .iter()
        .map(|c| format!("- {} (`{}`)\n", c.name, c.id))
        .collect()
}

pub fn format_summary_markdown(summary: &DashboardSummary) -> String {
    format!(
        "## Dashboard\n- **tasks**: {}\n- **projects**: {}\n\
         - **completed**: {}\n- **pending**: {}\n",
        summary.total_tasks, summary.total_projects, summary.completed, summary.pending
    )
}

pub fn format_agenda_markdown(days: &BTreeMap<NaiveDate, Vec<CalendarEntry>>) -> String {
    if days.is_empty() {
        return "Nothing scheduled.\n".to_string();
    }
    let mut md = String::new();
    for (day, entries) in days {
        md.push_str(&format!("### {}\n", day));
        for entry in entries {
            md.push_str(&format!(
                "- {} `{}` [{}] ({})\n",
                entry.start.format("%H:%M"),
                entry.task_id,
                entry.status,
                entry.title
            ));
        }
    }
    md
}
