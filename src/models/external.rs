use mongodb::bson::Document;
use serde::{Deserialize, Serialize};
use uuid::{Uuid, uuid};

/// Mapping from a storefront-local id (e.g. a Steam appid) to a catalog game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalGame {
    pub id: i64,
    /// Store-local id in the external storefront.
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub category: i32,
    #[serde(default)]
    pub game: i64,
    #[serde(flatten)]
    pub extra: Document,
}

/// Upstream storefront discriminants, limited to the stores the metadata
/// request shortcut understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExternalStoreCategory {
    Steam = 1,
    Gog = 5,
    EpicGamesStore = 26,
    ItchIo = 30,
}

const STEAM_LIBRARY_ID: Uuid = uuid!("cb91dfc9-b977-43bf-8e70-55f46e410fab");
const GOG_LIBRARY_ID: Uuid = uuid!("aebe8b7c-6dc3-4a66-af31-e7375c6b5e9e");
const EPIC_LIBRARY_ID: Uuid = uuid!("00000002-dbd1-46c6-b5d0-b1ba559d10e4");
const ITCH_LIBRARY_ID: Uuid = uuid!("00000001-ebb2-4eec-abcb-7c89937a42bb");

/// Resolves a client library id to the storefront category used by the
/// `(uid, category)` lookup. Unknown libraries yield `None`.
#[must_use]
pub fn store_category_for_library(library_id: Uuid) -> Option<ExternalStoreCategory> {
    if library_id == STEAM_LIBRARY_ID {
        Some(ExternalStoreCategory::Steam)
    } else if library_id == GOG_LIBRARY_ID {
        Some(ExternalStoreCategory::Gog)
    } else if library_id == EPIC_LIBRARY_ID {
        Some(ExternalStoreCategory::EpicGamesStore)
    } else if library_id == ITCH_LIBRARY_ID {
        Some(ExternalStoreCategory::ItchIo)
    } else {
        None
    }
}
