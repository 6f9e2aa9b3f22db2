//! Derived views over a store's task list: filtering, sorting, dashboard
//! counts and the calendar agenda.

use crate::types::{Project, Task, TaskPriority, TaskStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Narrow a task list. Unset criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Case-insensitive substring of the title or description.
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status
            && task.status != status
        {
            return false;
        }
        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                task.title.to_lowercase().contains(&needle)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
        }
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    Status,
    Title,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" | "created" => Ok(SortField::CreatedAt),
            "due_date" | "due" => Ok(SortField::DueDate),
            "priority" => Ok(SortField::Priority),
            "status" => Ok(SortField::Status),
            "title" => Ok(SortField::Title),
            other => Err(format!(
                "invalid sort field '{}': expected created_at, due_date, priority, status or title",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Sort order for task lists. Defaults to newest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskSort {
    pub field: SortField,
    pub direction: SortDirection,
}

fn millis(dt: Option<DateTime<Utc>>) -> i64 {
    dt.map_or(0, |dt| dt.timestamp_millis())
}

impl TaskSort {
    /// Dates compare chronologically with a missing date as the epoch;
    /// everything else compares by its text form.
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ord = match self.field {
            SortField::CreatedAt => millis(Some(a.created_at)).cmp(&millis(Some(b.created_at))),
            SortField::DueDate => millis(a.due_date).cmp(&millis(b.due_date)),
            SortField::Priority => a.priority.as_str().cmp(b.priority.as_str()),
            SortField::Status => a.status.as_str().cmp(b.status.as_str()),
            SortField::Title => a.title.cmp(&b.title),
        };
        match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }

    pub fn sort(&self, tasks: &mut [&Task]) {
        tasks.sort_by(|a, b| self.compare(a, b));
    }
}

/// Filter then sort.
pub fn task_view<'a>(tasks: &'a [Task], filter: &TaskFilter, sort: &TaskSort) -> Vec<&'a Task> {
    let mut view = filter.apply(tasks);
    sort.sort(&mut view);
    view
}

/// Headline counts for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_tasks: usize,
    pub total_projects: usize,
    pub completed: usize,
    pub pending: usize,
}

impl DashboardSummary {
    pub fn compute(tasks: &[Task], projects: &[Project]) -> Self {
        let completed = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        Self {
            total_tasks: tasks.len(),
            total_projects: projects.len(),
            completed,
            pending: tasks.len() - completed,
        }
    }
}

/// A task placed on the calendar at its due instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEntry {
    pub task_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
}

/// One entry per task that has a due date, in list order.
pub fn calendar_entries(tasks: &[Task]) -> Vec<CalendarEntry> {
    tasks
        .iter()
        .filter_map(|task| {
            task.due_date.map(|due| CalendarEntry {
                task_id: task.id.clone(),
                title: task.title.clone(),
                start: due,
                end: due,
                status: task.status,
                priority: task.priority,
            })
        })
        .collect()
}

/// Calendar entries grouped by UTC day, earliest day first.
pub fn agenda(tasks: &[Task]) -> BTreeMap<NaiveDate, Vec<CalendarEntry>> {
    let mut days: BTreeMap<NaiveDate, Vec<CalendarEntry>> = BTreeMap::new();
    for entry in calendar_entries(tasks) {
        days.entry(entry.start.date_naive()).or_default().push(entry);
    }
    for entries in days.values_mut() {
        entries.sort_by_key(|e| e.start);
    }
    days
}
