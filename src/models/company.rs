use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

/// Passthrough entity; mirrored and served by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Document,
}
