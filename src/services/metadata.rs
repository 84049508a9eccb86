use anyhow::Result;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::Game;
use crate::models::external::store_category_for_library;
use crate::services::catalog::Catalog;
use crate::services::matcher::MatchService;

/// A free-form metadata request: a noisy name plus optional hints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataRequest {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,

    #[serde(rename = "ReleaseYear", default)]
    pub release_year: Option<i32>,

    /// Client library id; matched against the fixed storefront table.
    #[serde(rename = "LibraryId", default)]
    pub library_id: Option<String>,

    /// Store-local game id within that library.
    #[serde(rename = "GameId", default)]
    pub game_id: Option<String>,
}

/// Read facade over the catalog and the matcher.
#[derive(Clone)]
pub struct MetadataService {
    catalog: Arc<dyn Catalog>,
    matcher: MatchService,
}

impl MetadataService {
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>, matcher: MatchService) -> Self {
        Self { catalog, matcher }
    }

    pub async fn get_game(&self, id: i64) -> Result<Option<Game>> {
        self.catalog.get_game(id).await
    }

    /// Deduped ranked search; scores are dropped from the response.
    pub async fn search(&self, term: &str) -> Result<Vec<Game>> {
        let hits = self.matcher.search(term, true).await?;
        Ok(hits.into_iter().map(|hit| hit.game).collect())
    }

    /// Best-effort single match. The external-store shortcut runs first;
    /// when it resolves, no name matching happens at all.
    pub async fn get_metadata(&self, request: &MetadataRequest) -> Result<Option<Game>> {
        if let Some(game) = self.lookup_external(request).await? {
            return Ok(Some(game));
        }

        let Some(name) = request.name.as_deref().filter(|name| !name.trim().is_empty()) else {
            return Ok(None);
        };

        self.matcher.match_request(name, request.release_year).await
    }

    async fn lookup_external(&self, request: &MetadataRequest) -> Result<Option<Game>> {
        let Some(library_id) = request
            .library_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok())
        else {
            return Ok(None);
        };
        let Some(game_id) = request.game_id.as_deref().filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let Some(category) = store_category_for_library(library_id) else {
            debug!(%library_id, "Library id not in the storefront table");
            return Ok(None);
        };

        let external = self.catalog.find_external(game_id, category as i32).await?;

        match external {
            Some(mapping) => self.catalog.get_game(mapping.game).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Scored;
    use crate::models::{AlternativeName, ExternalGame, ExternalStoreCategory};
    use mongodb::bson::Document;

    fn game(id: i64, name: &str) -> Game {
        Game {
            id,
            name: name.to_string(),
            category: 0,
            first_release_date: 0,
            extra: Document::new(),
        }
    }

    /// Serves the Steam mapping `uid "220" -> game 42`; any text search is a
    /// test failure, since a resolved external id must bypass name matching.
    struct ShortcutCatalog;

    #[async_trait::async_trait]
    impl Catalog for ShortcutCatalog {
        async fn search_games(&self, _term: &str, _limit: i64) -> Result<Vec<Scored<Game>>> {
            panic!("name matching must not run when the external id resolves")
        }

        async fn search_alternative_names(
            &self,
            _term: &str,
            _limit: i64,
        ) -> Result<Vec<Scored<AlternativeName>>> {
            panic!("name matching must not run when the external id resolves")
        }

        async fn get_game(&self, id: i64) -> Result<Option<Game>> {
            Ok((id == 42).then(|| game(42, "Half-Life")))
        }

        async fn find_external(&self, uid: &str, category: i32) -> Result<Option<ExternalGame>> {
            let is_match = uid == "220" && category == ExternalStoreCategory::Steam as i32;
            Ok(is_match.then(|| ExternalGame {
                id: 1,
                uid: uid.to_string(),
                category,
                game: 42,
                extra: Document::new(),
            }))
        }
    }

    /// No external mapping; the name search serves one exact hit.
    struct FallthroughCatalog;

    #[async_trait::async_trait]
    impl Catalog for FallthroughCatalog {
        async fn search_games(&self, _term: &str, _limit: i64) -> Result<Vec<Scored<Game>>> {
            Ok(vec![Scored {
                score: 1.0,
                item: game(5, "Whatever"),
            }])
        }

        async fn search_alternative_names(
            &self,
            _term: &str,
            _limit: i64,
        ) -> Result<Vec<Scored<AlternativeName>>> {
            Ok(vec![])
        }

        async fn get_game(&self, id: i64) -> Result<Option<Game>> {
            Ok((id == 5).then(|| game(5, "Whatever")))
        }

        async fn find_external(&self, _uid: &str, _category: i32) -> Result<Option<ExternalGame>> {
            Ok(None)
        }
    }

    fn service(catalog: Arc<dyn Catalog>) -> MetadataService {
        let matcher = MatchService::new(Arc::clone(&catalog));
        MetadataService::new(catalog, matcher)
    }

    #[tokio::test]
    async fn test_external_shortcut_bypasses_name_matching() {
        let service = service(Arc::new(ShortcutCatalog));
        let request = MetadataRequest {
            name: Some("whatever".to_string()),
            library_id: Some("CB91DFC9-B977-43BF-8E70-55F46E410FAB".to_string()),
            game_id: Some("220".to_string()),
            ..Default::default()
        };

        let matched = service.get_metadata(&request).await.unwrap().unwrap();
        assert_eq!(matched.id, 42);
    }

    #[tokio::test]
    async fn test_external_miss_falls_through_to_matcher() {
        let service = service(Arc::new(FallthroughCatalog));
        let request = MetadataRequest {
            name: Some("Whatever".to_string()),
            library_id: Some("CB91DFC9-B977-43BF-8E70-55F46E410FAB".to_string()),
            game_id: Some("999".to_string()),
            ..Default::default()
        };

        let matched = service.get_metadata(&request).await.unwrap().unwrap();
        assert_eq!(matched.id, 5);
    }

    #[tokio::test]
    async fn test_unknown_library_id_falls_through_to_matcher() {
        let service = service(Arc::new(FallthroughCatalog));
        let request = MetadataRequest {
            name: Some("Whatever".to_string()),
            library_id: Some("11111111-2222-3333-4444-555555555555".to_string()),
            game_id: Some("220".to_string()),
            ..Default::default()
        };

        let matched = service.get_metadata(&request).await.unwrap().unwrap();
        assert_eq!(matched.id, 5);
    }
}
