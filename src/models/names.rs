use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

/// A catalog-curated synonym for a game title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeName {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Referenced `Game.id`; `0` or a stale reference counts as dangling.
    #[serde(default)]
    pub game: i64,
    #[serde(flatten)]
    pub extra: Document,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameLocalization {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub game: i64,
    #[serde(flatten)]
    pub extra: Document,
}
