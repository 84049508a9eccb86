use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::doc;

use crate::db::{Scored, Store};
use crate::mirror::{MirrorEntity, Mirrors};
use crate::models::{AlternativeName, DEFAULT_SEARCH_CATEGORIES, ExternalGame, Game};

/// Read surface the matcher and the query facade consume.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Text search over primary game names, filtered to the default search
    /// categories, sorted by descending score.
    async fn search_games(&self, term: &str, limit: i64) -> Result<Vec<Scored<Game>>>;

    /// Text search over alternative names, sorted by descending score.
    async fn search_alternative_names(
        &self,
        term: &str,
        limit: i64,
    ) -> Result<Vec<Scored<AlternativeName>>>;

    /// Point lookup by game id; `0` and unmirrored ids yield `None`.
    async fn get_game(&self, id: i64) -> Result<Option<Game>>;

    /// Storefront mapping lookup by `(uid, category)`.
    async fn find_external(&self, uid: &str, category: i32) -> Result<Option<ExternalGame>>;
}

/// Production catalog backed by the mirrored collections.
pub struct MirrorCatalog {
    store: Store,
    mirrors: Mirrors,
}

impl MirrorCatalog {
    #[must_use]
    pub fn new(store: Store, mirrors: Mirrors) -> Self {
        Self { store, mirrors }
    }
}

#[async_trait]
impl Catalog for MirrorCatalog {
    async fn search_games(&self, term: &str, limit: i64) -> Result<Vec<Scored<Game>>> {
        let filter = doc! { "category": { "$in": DEFAULT_SEARCH_CATEGORIES.to_vec() } };
        self.store
            .text_search(Game::ENDPOINT, term, Some(filter), limit)
            .await
    }

    async fn search_alternative_names(
        &self,
        term: &str,
        limit: i64,
    ) -> Result<Vec<Scored<AlternativeName>>> {
        self.store
            .text_search(AlternativeName::ENDPOINT, term, None, limit)
            .await
    }

    async fn get_game(&self, id: i64) -> Result<Option<Game>> {
        self.mirrors.games.get_item(id).await
    }

    async fn find_external(&self, uid: &str, category: i32) -> Result<Option<ExternalGame>> {
        self.store
            .find_one_by(
                ExternalGame::ENDPOINT,
                doc! { "uid": uid, "category": category },
            )
            .await
    }
}
