//! Task document mapping.

use super::{
    DocumentModel, FIELD_CREATED_AT, FIELD_UPDATED_AT, FIELD_USER_ID, due_date_value, opt_instant,
    opt_str, opt_str_list, patch, put_opt, req_instant, req_str,
};
use crate::document::{Document, DocumentError, DocumentResult};
use crate::types::{EntityKind, NewTask, Task, TaskPriority, TaskStatus, TaskUpdate};
use serde_json::Value;

pub const TASKS_COLLECTION: &str = "tasks";

const FIELD_TITLE: &str = "title";
const FIELD_DESCRIPTION: &str = "description";
const FIELD_PROJECT_ID: &str = "projectId";
const FIELD_STATUS: &str = "status";
const FIELD_PRIORITY: &str = "priority";
const FIELD_DUE_DATE: &str = "dueDate";
const FIELD_CATEGORY_IDS: &str = "categoryIds";

fn parse_status(doc: &Document) -> DocumentResult<TaskStatus> {
    req_str(doc, FIELD_STATUS)?
        .parse()
        .map_err(DocumentError::Malformed)
}

fn parse_priority(doc: &Document) -> DocumentResult<TaskPriority> {
    req_str(doc, FIELD_PRIORITY)?
        .parse()
        .map_err(DocumentError::Malformed)
}

impl DocumentModel for Task {
    type Create = NewTask;
    type Update = TaskUpdate;

    const KIND: EntityKind = EntityKind::Task;
    const COLLECTION: &'static str = TASKS_COLLECTION;

    fn create_document(data: NewTask) -> Document {
        let mut doc = Document::new();
        doc.insert(FIELD_USER_ID.to_string(), Value::from(data.user_id));
        doc.insert(FIELD_TITLE.to_string(), Value::from(data.title));
        put_opt(&mut doc, FIELD_DESCRIPTION, data.description.map(Value::from));
        put_opt(&mut doc, FIELD_PROJECT_ID, data.project_id.map(Value::from));
        doc.insert(FIELD_STATUS.to_string(), Value::from(data.status.as_str()));
        doc.insert(FIELD_PRIORITY.to_string(), Value::from(data.priority.as_str()));
        put_opt(&mut doc, FIELD_DUE_DATE, data.due_date.map(due_date_value));
        put_opt(&mut doc, FIELD_CATEGORY_IDS, data.category_ids.map(Value::from));
        doc
    }

    fn update_document(updates: TaskUpdate) -> Document {
        let mut doc = Document::new();
        put_opt(&mut doc, FIELD_TITLE, updates.title.map(Value::from));
        patch(&mut doc, FIELD_DESCRIPTION, updates.description.map(|v| v.map(Value::from)));
        patch(&mut doc, FIELD_PROJECT_ID, updates.project_id.map(|v| v.map(Value::from)));
        put_opt(&mut doc, FIELD_STATUS, updates.status.map(|s| Value::from(s.as_str())));
        put_opt(&mut doc, FIELD_PRIORITY, updates.priority.map(|p| Value::from(p.as_str())));
        patch(&mut doc, FIELD_DUE_DATE, updates.due_date.map(|v| v.map(due_date_value)));
        patch(&mut doc, FIELD_CATEGORY_IDS, updates.category_ids.map(|v| v.map(Value::from)));
        doc
    }

    fn from_document(id: &str, doc: &Document) -> DocumentResult<Task> {
        Ok(Task {
            id: id.to_string(),
            user_id: req_str(doc, FIELD_USER_ID)?,
            title: req_str(doc, FIELD_TITLE)?,
            description: opt_str(doc, FIELD_DESCRIPTION)?,
            project_id: opt_str(doc, FIELD_PROJECT_ID)?,
            status: parse_status(doc)?,
            priority: parse_priority(doc)?,
            due_date: opt_instant(doc, FIELD_DUE_DATE)?,
            category_ids: opt_str_list(doc, FIELD_CATEGORY_IDS)?,
            created_at: req_instant(doc, FIELD_CREATED_AT)?,
            updated_at: req_instant(doc, FIELD_UPDATED_AT)?,
        })
    }
}
