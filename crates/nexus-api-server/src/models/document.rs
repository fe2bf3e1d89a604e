use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::database::Document;

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: i64,
    pub title: String,
    pub file_type: Option<String>,
    pub file_size: Option<i32>,
    pub is_indexed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            title: document.title,
            file_type: document.file_type,
            file_size: document.file_size,
            is_indexed: document.is_indexed,
            created_at: document.created_at,
        }
    }
}
