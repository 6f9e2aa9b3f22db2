//! Project document mapping.

use super::{
    DocumentModel, FIELD_CREATED_AT, FIELD_UPDATED_AT, FIELD_USER_ID, opt_str, patch, put_opt,
    req_instant, req_str,
};
use crate::document::{Document, DocumentResult};
use crate::types::{EntityKind, NewProject, Project, ProjectUpdate};
use serde_json::Value;

pub const PROJECTS_COLLECTION: &str = "projects";

const FIELD_NAME: &str = "name";
const FIELD_DESCRIPTION: &str = "description";

impl DocumentModel for Project {
    type Create = NewProject;
    type Update = ProjectUpdate;

    const KIND: EntityKind = EntityKind::Project;
    const COLLECTION: &'static str = PROJECTS_COLLECTION;

    fn create_document(data: NewProject) -> Document {
        let mut doc = Document::new();
        doc.insert(FIELD_NAME.to_string(), Value::from(data.name));
        put_opt(&mut doc, FIELD_DESCRIPTION, data.description.map(Value::from));
        doc.insert(FIELD_USER_ID.to_string(), Value::from(data.user_id));
        doc
    }

    fn update_document(updates: ProjectUpdate) -> Document {
        let mut doc = Document::new();
        put_opt(&mut doc, FIELD_NAME, updates.name.map(Value::from));
        patch(&mut doc, FIELD_DESCRIPTION, updates.description.map(|v| v.map(Value::from)));
        doc
    }

    fn from_document(id: &str, doc: &Document) -> DocumentResult<Project> {
        Ok(Project {
            id: id.to_string(),
            name: req_str(doc, FIELD_NAME)?,
            description: opt_str(doc, FIELD_DESCRIPTION)?,
            user_id: req_str(doc, FIELD_USER_ID)?,
            created_at: req_instant(doc, FIELD_CREATED_AT)?,
            updated_at: req_instant(doc, FIELD_UPDATED_AT)?,
        })
    }
}
