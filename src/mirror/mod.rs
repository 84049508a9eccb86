use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clients::IgdbClient;
use crate::config::WebhookConfig;
use crate::db::{IndexSpec, Store};
use crate::models::{AlternativeName, Company, ExternalGame, Game, GameLocalization};

/// Upstream page size; also the offset step while cloning.
pub const CLONE_PAGE_SIZE: usize = 500;

const PROGRESS_INTERVAL: u64 = 5_000;

pub const WEBHOOK_METHODS: [&str; 3] = ["create", "update", "delete"];

/// Static descriptor tying an entity class to its upstream endpoint and
/// local index layout.
pub trait MirrorEntity: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    const ENDPOINT: &'static str;
    const INDEXES: IndexSpec;

    fn id(&self) -> i64;
}

impl MirrorEntity for Game {
    const ENDPOINT: &'static str = "games";
    const INDEXES: IndexSpec = IndexSpec {
        text: &["name"],
        ascending: &["category"],
        composite: &[],
    };

    fn id(&self) -> i64 {
        self.id
    }
}

impl MirrorEntity for AlternativeName {
    const ENDPOINT: &'static str = "alternative_names";
    const INDEXES: IndexSpec = IndexSpec {
        text: &["name"],
        ascending: &["game"],
        composite: &[],
    };

    fn id(&self) -> i64 {
        self.id
    }
}

impl MirrorEntity for ExternalGame {
    const ENDPOINT: &'static str = "external_games";
    const INDEXES: IndexSpec = IndexSpec {
        text: &[],
        ascending: &[],
        composite: &[&["uid", "category"]],
    };

    fn id(&self) -> i64 {
        self.id
    }
}

impl MirrorEntity for GameLocalization {
    const ENDPOINT: &'static str = "game_localizations";
    const INDEXES: IndexSpec = IndexSpec {
        text: &["name"],
        ascending: &["game"],
        composite: &[],
    };

    fn id(&self) -> i64 {
        self.id
    }
}

impl MirrorEntity for Company {
    const ENDPOINT: &'static str = "companies";
    const INDEXES: IndexSpec = IndexSpec::NONE;

    fn id(&self) -> i64 {
        self.id
    }
}

/// A webhook the upstream reports as registered.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RegisteredWebhook {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub active: bool,
}

/// Fetches the upstream's current webhook registrations.
pub async fn list_registered_webhooks(igdb: &IgdbClient) -> Result<Vec<RegisteredWebhook>> {
    let bytes = igdb.send_get_request("webhooks").await?;
    serde_json::from_slice(&bytes).context("Failed to parse upstream webhook listing")
}

/// Local mirror of one upstream entity class: indexed reads from the store,
/// bulk clone from the upstream, webhook-driven upserts.
#[derive(Clone)]
pub struct Mirror<T: MirrorEntity> {
    store: Store,
    igdb: Arc<IgdbClient>,
    clone_guard: Arc<Mutex<()>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: MirrorEntity> Mirror<T> {
    #[must_use]
    pub fn new(store: Store, igdb: Arc<IgdbClient>) -> Self {
        Self {
            store,
            igdb,
            clone_guard: Arc::new(Mutex::new(())),
            _entity: PhantomData,
        }
    }

    /// Point lookup from the local store. `id == 0` means unset and yields
    /// `None` without touching the store; an id missing from the mirror also
    /// yields `None`, even if it exists upstream.
    pub async fn get_item(&self, id: i64) -> Result<Option<T>> {
        if id == 0 {
            return Ok(None);
        }
        self.store.find_by_id(T::ENDPOINT, id).await
    }

    /// Bulk lookup with a single id-set query. Empty input yields `None`.
    pub async fn get_items(&self, ids: &[i64]) -> Result<Option<Vec<T>>> {
        if ids.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.store.find_by_ids(T::ENDPOINT, ids).await?))
    }

    pub async fn add(&self, items: &[T]) -> Result<()> {
        self.store.upsert_many(T::ENDPOINT, items, T::id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.store.delete_by_id(T::ENDPOINT, id).await?;
        Ok(())
    }

    /// Re-replicates the collection: drop (indexes recreated before the
    /// first write), then page the upstream in fixed blocks until a short or
    /// empty page. A failed page aborts and leaves the partial state for the
    /// next clone to replace.
    pub async fn clone_collection(&self) -> Result<u64> {
        let _guard = self.clone_guard.lock().await;

        let upstream_total = self.upstream_count().await?;
        info!(
            endpoint = T::ENDPOINT,
            upstream_total, "Cloning collection from upstream"
        );

        self.store.reset_collection(T::ENDPOINT, &T::INDEXES).await?;

        let mut total: u64 = 0;
        let mut offset: usize = 0;
        let mut next_progress = PROGRESS_INTERVAL;
        loop {
            let body = format!("fields *; limit {CLONE_PAGE_SIZE}; offset {offset};");
            let bytes = self.igdb.send_string_request(T::ENDPOINT, &body).await?;
            let page: Vec<T> = serde_json::from_slice(&bytes).with_context(|| {
                format!("Failed to parse {} page at offset {offset}", T::ENDPOINT)
            })?;

            if page.is_empty() {
                break;
            }

            self.add(&page).await?;
            total += page.len() as u64;

            if total >= next_progress {
                info!(endpoint = T::ENDPOINT, total, "Clone progress");
                next_progress += PROGRESS_INTERVAL;
            }

            if page.len() < CLONE_PAGE_SIZE {
                break;
            }
            offset += CLONE_PAGE_SIZE;
        }

        info!(
            endpoint = T::ENDPOINT,
            total, upstream_total, "Clone finished"
        );
        Ok(total)
    }

    async fn upstream_count(&self) -> Result<u64> {
        #[derive(serde::Deserialize)]
        struct CountResponse {
            count: u64,
        }

        let bytes = self
            .igdb
            .send_form_request(&format!("{}/count", T::ENDPOINT), &[])
            .await?;
        let parsed: CountResponse = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {}/count response", T::ENDPOINT))?;
        Ok(parsed.count)
    }

    /// Registers {create, update, delete} callbacks with the upstream unless
    /// its reported listing already carries them. Missing webhook
    /// configuration is fatal here, and only here.
    pub async fn configure_webhooks(
        &self,
        webhooks: &WebhookConfig,
        current: &[RegisteredWebhook],
    ) -> Result<()> {
        if webhooks.root_address.trim().is_empty() {
            bail!("Webhook root address is not configured");
        }
        if webhooks.secret.trim().is_empty() {
            bail!("Webhook secret is not configured");
        }

        let root = webhooks.root_address.trim_end_matches('/');
        for method in WEBHOOK_METHODS {
            let url = format!("{root}/{}/{method}", T::ENDPOINT);
            if current.iter().any(|hook| hook.url == url) {
                debug!(endpoint = T::ENDPOINT, method, "Webhook already registered");
                continue;
            }

            let bytes = self
                .igdb
                .send_form_request(
                    &format!("{}/webhooks", T::ENDPOINT),
                    &[
                        ("method", method),
                        ("secret", webhooks.secret.as_str()),
                        ("url", url.as_str()),
                    ],
                )
                .await?;
            let registered: Vec<RegisteredWebhook> =
                serde_json::from_slice(&bytes).with_context(|| {
                    format!(
                        "Failed to parse {} webhook registration response",
                        T::ENDPOINT
                    )
                })?;

            if !registered.iter().any(|hook| hook.active) {
                bail!(
                    "Upstream did not activate the {method} webhook for {}",
                    T::ENDPOINT
                );
            }
            info!(endpoint = T::ENDPOINT, method, url, "Webhook registered");
        }
        Ok(())
    }
}

/// The full mirror set, one per entity class.
#[derive(Clone)]
pub struct Mirrors {
    pub games: Mirror<Game>,
    pub alternative_names: Mirror<AlternativeName>,
    pub external_games: Mirror<ExternalGame>,
    pub game_localizations: Mirror<GameLocalization>,
    pub companies: Mirror<Company>,
}

pub const MIRRORED_ENDPOINTS: [&str; 5] = [
    Game::ENDPOINT,
    AlternativeName::ENDPOINT,
    ExternalGame::ENDPOINT,
    GameLocalization::ENDPOINT,
    Company::ENDPOINT,
];

impl Mirrors {
    #[must_use]
    pub fn new(store: &Store, igdb: &Arc<IgdbClient>) -> Self {
        Self {
            games: Mirror::new(store.clone(), igdb.clone()),
            alternative_names: Mirror::new(store.clone(), igdb.clone()),
            external_games: Mirror::new(store.clone(), igdb.clone()),
            game_localizations: Mirror::new(store.clone(), igdb.clone()),
            companies: Mirror::new(store.clone(), igdb.clone()),
        }
    }

    /// Clones every collection, one at a time. Clones of the same collection
    /// never run concurrently; running them sequentially also keeps the
    /// upstream load bounded.
    pub async fn clone_all(&self) -> Result<()> {
        self.games.clone_collection().await?;
        self.alternative_names.clone_collection().await?;
        self.external_games.clone_collection().await?;
        self.game_localizations.clone_collection().await?;
        self.companies.clone_collection().await?;
        Ok(())
    }

    pub async fn clone_endpoint(&self, endpoint: &str) -> Result<u64> {
        match endpoint {
            Game::ENDPOINT => self.games.clone_collection().await,
            AlternativeName::ENDPOINT => self.alternative_names.clone_collection().await,
            ExternalGame::ENDPOINT => self.external_games.clone_collection().await,
            GameLocalization::ENDPOINT => self.game_localizations.clone_collection().await,
            Company::ENDPOINT => self.companies.clone_collection().await,
            _ => bail!("Unknown collection: {endpoint}"),
        }
    }

    pub async fn configure_all_webhooks(
        &self,
        webhooks: &WebhookConfig,
        current: &[RegisteredWebhook],
    ) -> Result<()> {
        self.games.configure_webhooks(webhooks, current).await?;
        self.alternative_names
            .configure_webhooks(webhooks, current)
            .await?;
        self.external_games
            .configure_webhooks(webhooks, current)
            .await?;
        self.game_localizations
            .configure_webhooks(webhooks, current)
            .await?;
        self.companies.configure_webhooks(webhooks, current).await?;
        Ok(())
    }

    /// Applies one upstream change event to the owning mirror.
    pub async fn apply_webhook(
        &self,
        entity: &str,
        method: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        match entity {
            Game::ENDPOINT => apply_event(&self.games, method, payload).await,
            AlternativeName::ENDPOINT => apply_event(&self.alternative_names, method, payload).await,
            ExternalGame::ENDPOINT => apply_event(&self.external_games, method, payload).await,
            GameLocalization::ENDPOINT => {
                apply_event(&self.game_localizations, method, payload).await
            }
            Company::ENDPOINT => apply_event(&self.companies, method, payload).await,
            _ => bail!("Unknown webhook entity: {entity}"),
        }
    }
}

async fn apply_event<T: MirrorEntity>(
    mirror: &Mirror<T>,
    method: &str,
    payload: serde_json::Value,
) -> Result<()> {
    let item: T = serde_json::from_value(payload)
        .with_context(|| format!("Failed to parse {} webhook payload", T::ENDPOINT))?;

    match method {
        "create" | "update" => mirror.add(std::slice::from_ref(&item)).await,
        "delete" => mirror.delete(item.id()).await,
        _ => bail!("Unknown webhook method: {method}"),
    }
}
