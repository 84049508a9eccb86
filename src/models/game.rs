use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

/// A catalog game record. Only the fields the matcher inspects are typed;
/// everything else the upstream sends is carried verbatim in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: i32,
    /// Seconds since the Unix epoch; `0` means unknown.
    #[serde(default)]
    pub first_release_date: i64,
    #[serde(flatten)]
    pub extra: Document,
}

/// Upstream game category discriminants. Kept as opaque tags; only the
/// search filter below branches on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum GameCategory {
    MainGame = 0,
    DlcAddon = 1,
    Expansion = 2,
    Bundle = 3,
    StandaloneExpansion = 4,
    Mod = 5,
    Episode = 6,
    Season = 7,
    Remake = 8,
    Remaster = 9,
    ExpandedGame = 10,
    Port = 11,
    Fork = 12,
}

/// Categories eligible for the primary-name search.
pub const DEFAULT_SEARCH_CATEGORIES: [i32; 4] = [
    GameCategory::MainGame as i32,
    GameCategory::Remake as i32,
    GameCategory::Remaster as i32,
    GameCategory::StandaloneExpansion as i32,
];

impl Game {
    #[must_use]
    pub fn release_year(&self) -> Option<i32> {
        use chrono::Datelike;

        if self.first_release_date == 0 {
            return None;
        }
        chrono::DateTime::from_timestamp(self.first_release_date, 0).map(|date| date.year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_year() {
        let game = Game {
            id: 1,
            name: "Prey".to_string(),
            category: GameCategory::MainGame as i32,
            first_release_date: 1_493_942_400, // 2017-05-05
            extra: Document::new(),
        };
        assert_eq!(game.release_year(), Some(2017));
    }

    #[test]
    fn test_release_year_unknown() {
        let game = Game {
            id: 1,
            name: "Unknown".to_string(),
            category: 0,
            first_release_date: 0,
            extra: Document::new(),
        };
        assert_eq!(game.release_year(), None);
    }

    #[test]
    fn test_passthrough_fields_round_trip() {
        let json = serde_json::json!({
            "id": 7346,
            "name": "The Legend of Zelda: Breath of the Wild",
            "category": 0,
            "first_release_date": 1488499200i64,
            "slug": "the-legend-of-zelda-breath-of-the-wild",
            "total_rating": 92.5,
        });

        let game: Game = serde_json::from_value(json).unwrap();
        assert_eq!(game.id, 7346);
        assert_eq!(
            game.extra.get_str("slug").unwrap(),
            "the-legend-of-zelda-breath-of-the-wild"
        );

        let back = serde_json::to_value(&game).unwrap();
        assert_eq!(back["total_rating"], 92.5);
    }
}
