//! Category document mapping.

use super::{
    DocumentModel, FIELD_CREATED_AT, FIELD_UPDATED_AT, FIELD_USER_ID, put_opt, req_instant, req_str,
};
use crate::document::{Document, DocumentResult};
use crate::types::{Category, CategoryUpdate, EntityKind, NewCategory};
use serde_json::Value;

pub const CATEGORIES_COLLECTION: &str = "categories";

const FIELD_NAME: &str = "name";

impl DocumentModel for Category {
    type Create = NewCategory;
    type Update = CategoryUpdate;

    const KIND: EntityKind = EntityKind::Category;
    const COLLECTION: &'static str = CATEGORIES_COLLECTION;

    fn create_document(data: NewCategory) -> Document {
        let mut doc = Document::new();
        doc.insert(FIELD_NAME.to_string(), Value::from(data.name));
        doc.insert(FIELD_USER_ID.to_string(), Value::from(data.user_id));
        doc
    }

    fn update_document(updates: CategoryUpdate) -> Document {
        let mut doc = Document::new();
        put_opt(&mut doc, FIELD_NAME, updates.name.map(Value::from));
        doc
    }

    fn from_document(id: &str, doc: &Document) -> DocumentResult<Category> {
        Ok(Category {
            id: id.to_string(),
            name: req_str(doc, FIELD_NAME)?,
            user_id: req_str(doc, FIELD_USER_ID)?,
            created_at: req_instant(doc, FIELD_CREATED_AT)?,
            updated_at: req_instant(doc, FIELD_UPDATED_AT)?,
        })
    }
}
