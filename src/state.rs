use std::sync::Arc;
use tokio::sync::RwLock;

use crate::clients::IgdbClient;
use crate::config::Config;
use crate::db::Store;
use crate::mirror::Mirrors;
use crate::services::{Catalog, MatchService, MetadataService, MirrorCatalog};

/// Process-wide wiring: one store pool, one upstream client, one mirror set,
/// shared by every request task.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub igdb: Arc<IgdbClient>,

    pub mirrors: Mirrors,

    pub matcher: MatchService,

    pub metadata: MetadataService,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::connect(&config.mongo).await?;
        let igdb = Arc::new(IgdbClient::new(&config.igdb));

        let mirrors = Mirrors::new(&store, &igdb);
        let catalog: Arc<dyn Catalog> =
            Arc::new(MirrorCatalog::new(store.clone(), mirrors.clone()));
        let matcher = MatchService::new(Arc::clone(&catalog));
        let metadata = MetadataService::new(catalog, matcher.clone());

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            igdb,
            mirrors,
            matcher,
            metadata,
        })
    }
}
