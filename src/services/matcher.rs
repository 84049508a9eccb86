use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::models::Game;
use crate::parser::title::{replace_digits_with_roman, sanitize_title};
use crate::services::catalog::Catalog;

/// Per-source result cap for the two text searches.
const SEARCH_RESULT_LIMIT: i64 = 30;

/// One ranked search result: the store's text score, the name it was found
/// under (primary or alternative), and the resolved game.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub score: f64,
    pub name: String,
    pub game: Game,
}

/// Fuzzy title matcher over the mirrored catalog.
#[derive(Clone)]
pub struct MatchService {
    catalog: Arc<dyn Catalog>,
}

impl MatchService {
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Union of the primary-name and alternative-name searches, sorted by
    /// descending text score. With `remove_duplicates`, only the first
    /// (highest-scored) occurrence of each game survives.
    pub async fn search(&self, term: &str, remove_duplicates: bool) -> Result<Vec<SearchHit>> {
        let primary = self.search_by_name(term).await?;
        let alternates = self.search_by_alternative_names(term).await?;
        Ok(merge_hits(primary, alternates, remove_duplicates))
    }

    async fn search_by_name(&self, term: &str) -> Result<Vec<SearchHit>> {
        let scored = self.catalog.search_games(term, SEARCH_RESULT_LIMIT).await?;

        Ok(scored
            .into_iter()
            .map(|hit| SearchHit {
                score: hit.score,
                name: hit.item.name.clone(),
                game: hit.item,
            })
            .collect())
    }

    async fn search_by_alternative_names(&self, term: &str) -> Result<Vec<SearchHit>> {
        let scored = self
            .catalog
            .search_alternative_names(term, SEARCH_RESULT_LIMIT)
            .await?;

        let mut hits = Vec::with_capacity(scored.len());
        for alt in scored {
            match self.catalog.get_game(alt.item.game).await? {
                Some(game) => hits.push(SearchHit {
                    score: alt.score,
                    name: alt.item.name,
                    game,
                }),
                None => debug!(
                    alt_name = %alt.item.name,
                    game_id = alt.item.game,
                    "Dropping alternative name with dangling game reference"
                ),
            }
        }
        Ok(hits)
    }

    /// Single best match for a noisy title plus an optional release-year
    /// hint, or `None` when every disambiguation pass fails.
    pub async fn match_request(
        &self,
        name: &str,
        release_year: Option<i32>,
    ) -> Result<Option<Game>> {
        let request_name = sanitize_title(name);
        if request_name.is_empty() {
            return Ok(None);
        }

        let hits = self.search(&request_name, false).await?;
        let candidates: Vec<Candidate> = hits
            .into_iter()
            .map(|hit| Candidate {
                name: sanitize_title(&hit.name),
                game: hit.game,
            })
            .collect();

        Ok(resolve(&request_name, release_year, &candidates))
    }
}

/// Concatenates primary hits ahead of alternative hits, stable-sorts by
/// descending score (primary wins ties), and optionally keeps only the first
/// occurrence per game id.
fn merge_hits(
    primary: Vec<SearchHit>,
    alternates: Vec<SearchHit>,
    remove_duplicates: bool,
) -> Vec<SearchHit> {
    let mut hits = primary;
    hits.extend(alternates);

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if remove_duplicates {
        let mut seen = HashSet::new();
        hits.retain(|hit| seen.insert(hit.game.id));
    }

    hits
}

#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    game: Game,
}

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

/// Runs the disambiguation passes in order against an already-sanitized
/// request name and candidate list; the first pass producing a match wins.
fn resolve(request_name: &str, release_year: Option<i32>, candidates: &[Candidate]) -> Option<Game> {
    static AND_RE: OnceLock<Regex> = OnceLock::new();
    static SEPARATOR_RE: OnceLock<Regex> = OnceLock::new();
    let and_re = get_regex(&AND_RE, r"(?i)\s+and\s+");
    let separator_re = get_regex(&SEPARATOR_RE, r"\s*[:-]\s*");

    // Direct comparison.
    if let Some(game) = match_pass(request_name, candidates, release_year, None) {
        return Some(game);
    }

    // "final fantasy 7" -> "final fantasy VII".
    let roman_name = replace_digits_with_roman(request_name);
    if let Some(game) = match_pass(&roman_name, candidates, release_year, None) {
        return Some(game);
    }

    // Leading article dropped by the requester.
    let prefixed_name = format!("The {request_name}");
    if let Some(game) = match_pass(&prefixed_name, candidates, release_year, None) {
        return Some(game);
    }

    // "and" spelled out vs ampersand.
    let amp_name = and_re.replace_all(request_name, " & ");
    if let Some(game) = match_pass(&amp_name, candidates, release_year, None) {
        return Some(game);
    }

    // Apostrophes present in the catalog but not the request.
    if let Some(game) = match_pass(
        request_name,
        candidates,
        release_year,
        Some(&|name: &str| name.replace('\'', "")),
    ) {
        return Some(game);
    }

    // Colon/dash subtitle separators collapsed on both sides.
    let plain_name = separator_re.replace_all(request_name, " ");
    if let Some(game) = match_pass(
        &plain_name,
        candidates,
        release_year,
        Some(&|name: &str| separator_re.replace_all(name, " ").into_owned()),
    ) {
        return Some(game);
    }

    // Subtitle trim: the request names the base game of a subtitled entry.
    candidates
        .iter()
        .find(|candidate| {
            candidate
                .name
                .split_once(':')
                .is_some_and(|(prefix, _)| titles_equal(prefix.trim(), request_name))
        })
        .map(|candidate| candidate.game.clone())
}

type NameTransform<'a> = &'a dyn Fn(&str) -> String;

fn match_pass(
    target: &str,
    candidates: &[Candidate],
    release_year: Option<i32>,
    transform: Option<NameTransform<'_>>,
) -> Option<Game> {
    let matches: Vec<&Candidate> = candidates
        .iter()
        .filter(|candidate| match transform {
            Some(transform) => titles_equal(&transform(&candidate.name), target),
            None => titles_equal(&candidate.name, target),
        })
        .collect();

    match matches.len() {
        0 => None,
        1 => Some(matches[0].game.clone()),
        _ => break_tie(&matches, release_year),
    }
}

fn break_tie(matches: &[&Candidate], release_year: Option<i32>) -> Option<Game> {
    if let Some(year) = release_year.filter(|year| *year > 0) {
        // A year miss falls through to the next pass.
        return matches
            .iter()
            .find(|candidate| candidate.game.release_year() == Some(year))
            .map(|candidate| candidate.game.clone());
    }

    if matches
        .iter()
        .all(|candidate| candidate.game.first_release_date == 0)
    {
        return Some(matches[0].game.clone());
    }

    matches
        .iter()
        .filter(|candidate| candidate.game.first_release_date > 0)
        .min_by_key(|candidate| candidate.game.first_release_date)
        .or_else(|| matches.first())
        .map(|candidate| candidate.game.clone())
}

fn titles_equal(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Scored;
    use crate::models::AlternativeName;
    use anyhow::Result;
    use mongodb::bson::Document;
    use std::collections::HashMap;

    fn game(id: i64, name: &str, first_release_date: i64) -> Game {
        Game {
            id,
            name: name.to_string(),
            category: 0,
            first_release_date,
            extra: Document::new(),
        }
    }

    fn candidates(games: &[Game]) -> Vec<Candidate> {
        games
            .iter()
            .map(|g| Candidate {
                name: sanitize_title(&g.name),
                game: g.clone(),
            })
            .collect()
    }

    fn hit(score: f64, id: i64, name: &str) -> SearchHit {
        SearchHit {
            score,
            name: name.to_string(),
            game: game(id, name, 0),
        }
    }

    #[test]
    fn test_merge_orders_by_descending_score() {
        let primary = vec![hit(1.0, 1, "a"), hit(0.5, 2, "b")];
        let alternates = vec![hit(2.0, 3, "c"), hit(0.7, 4, "d")];

        let merged = merge_hits(primary, alternates, false);

        assert_eq!(merged.len(), 4);
        assert_eq!(merged[0].game.id, 3);
        for pair in merged.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_merge_ties_keep_primary_first() {
        let primary = vec![hit(1.0, 1, "primary")];
        let alternates = vec![hit(1.0, 2, "alternate")];

        let merged = merge_hits(primary, alternates, false);

        assert_eq!(merged[0].name, "primary");
        assert_eq!(merged[1].name, "alternate");
    }

    #[test]
    fn test_merge_dedup_keeps_first_occurrence_per_game() {
        let primary = vec![hit(1.5, 1, "Skyrim")];
        let alternates = vec![hit(2.0, 1, "TESV"), hit(0.9, 2, "Oblivion")];

        let merged = merge_hits(primary, alternates, true);

        assert_eq!(merged.len(), 2);
        // The higher-scored alternative hit wins the dedup for game 1.
        assert_eq!(merged[0].name, "TESV");
        let occurrences = merged.iter().filter(|h| h.game.id == 1).count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn test_merge_without_dedup_keeps_duplicates() {
        let primary = vec![hit(1.5, 1, "Skyrim")];
        let alternates = vec![hit(0.5, 1, "TESV")];

        let merged = merge_hits(primary, alternates, false);
        assert_eq!(merged.len(), 2);
    }

    struct StubCatalog {
        games: Vec<Scored<Game>>,
        alt_names: Vec<Scored<AlternativeName>>,
        games_by_id: HashMap<i64, Game>,
    }

    #[async_trait::async_trait]
    impl Catalog for StubCatalog {
        async fn search_games(&self, _term: &str, _limit: i64) -> Result<Vec<Scored<Game>>> {
            Ok(self.games.clone())
        }

        async fn search_alternative_names(
            &self,
            _term: &str,
            _limit: i64,
        ) -> Result<Vec<Scored<AlternativeName>>> {
            Ok(self.alt_names.clone())
        }

        async fn get_game(&self, id: i64) -> Result<Option<Game>> {
            Ok(self.games_by_id.get(&id).cloned())
        }

        async fn find_external(
            &self,
            _uid: &str,
            _category: i32,
        ) -> Result<Option<crate::models::ExternalGame>> {
            Ok(None)
        }
    }

    fn alt_name(score: f64, id: i64, name: &str, game: i64) -> Scored<AlternativeName> {
        Scored {
            score,
            item: AlternativeName {
                id,
                name: name.to_string(),
                game,
                extra: Document::new(),
            },
        }
    }

    #[tokio::test]
    async fn test_alternative_name_search_expands_to_game() {
        let skyrim = game(7, "The Elder Scrolls V: Skyrim", 0);
        let catalog = StubCatalog {
            games: vec![],
            alt_names: vec![alt_name(1.2, 1, "TESV", 7)],
            games_by_id: HashMap::from([(7, skyrim)]),
        };

        let matcher = MatchService::new(Arc::new(catalog));
        let hits = matcher.search("TESV", true).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].game.id, 7);
        assert_eq!(hits[0].name, "TESV");
        assert_eq!(hits[0].game.name, "The Elder Scrolls V: Skyrim");
    }

    #[tokio::test]
    async fn test_dangling_alternative_name_is_dropped() {
        let catalog = StubCatalog {
            games: vec![],
            alt_names: vec![alt_name(1.2, 1, "TESV", 7), alt_name(0.8, 2, "Ghost", 99)],
            games_by_id: HashMap::from([(7, game(7, "The Elder Scrolls V: Skyrim", 0))]),
        };

        let matcher = MatchService::new(Arc::new(catalog));
        let hits = matcher.search("TESV", false).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].game.id, 7);
    }

    #[test]
    fn test_direct_match() {
        let pool = candidates(&[game(1, "Doom", 0), game(2, "Quake", 0)]);
        let matched = resolve("doom", None, &pool).unwrap();
        assert_eq!(matched.id, 1);
    }

    #[test]
    fn test_roman_numeral_pass() {
        let pool = candidates(&[game(10, "Final Fantasy VII", 0)]);
        let matched = resolve("final fantasy 7", None, &pool).unwrap();
        assert_eq!(matched.id, 10);
    }

    #[test]
    fn test_the_prefix_pass() {
        let pool = candidates(&[game(3, "The Witcher 3", 0)]);
        let matched = resolve("Witcher 3", None, &pool).unwrap();
        assert_eq!(matched.id, 3);
    }

    #[test]
    fn test_ampersand_pass() {
        let pool = candidates(&[game(4, "Mario & Luigi", 0)]);
        let matched = resolve("Mario and Luigi", None, &pool).unwrap();
        assert_eq!(matched.id, 4);
    }

    #[test]
    fn test_apostrophe_pass() {
        let pool = candidates(&[game(5, "Assassin's Creed", 0)]);
        let matched = resolve("Assassins Creed", None, &pool).unwrap();
        assert_eq!(matched.id, 5);
    }

    #[test]
    fn test_separator_pass() {
        let pool = candidates(&[game(6, "Deus Ex: Human Revolution", 0)]);
        let matched = resolve("Deus Ex Human Revolution", None, &pool).unwrap();
        assert_eq!(matched.id, 6);
    }

    #[test]
    fn test_subtitle_trim_pass() {
        // The separator pass fails first: "Half Life 2" != "Half Life 2
        // Episode One". Only the subtitle trim resolves this request.
        let pool = candidates(&[game(7, "Half-Life 2: Episode One", 0)]);
        let matched = resolve("Half-Life 2", None, &pool).unwrap();
        assert_eq!(matched.id, 7);
    }

    #[test]
    fn test_year_tie_break() {
        // 2006-07-11 and 2017-05-05.
        let pool = candidates(&[
            game(1, "Prey", 1_152_576_000),
            game(2, "Prey", 1_493_942_400),
        ]);
        let matched = resolve("Prey", Some(2017), &pool).unwrap();
        assert_eq!(matched.id, 2);
    }

    #[test]
    fn test_year_miss_falls_through() {
        let pool = candidates(&[
            game(1, "Prey", 1_152_576_000),
            game(2, "Prey", 1_493_942_400),
        ]);
        assert!(resolve("Prey", Some(1999), &pool).is_none());
    }

    #[test]
    fn test_oldest_wins_without_year_hint() {
        // 1993-12-10 and 2016-05-13.
        let pool = candidates(&[
            game(2, "Doom", 1_463_097_600),
            game(1, "Doom", 755_481_600),
        ]);
        let matched = resolve("Doom", None, &pool).unwrap();
        assert_eq!(matched.id, 1);
    }

    #[test]
    fn test_all_unknown_dates_take_first() {
        let pool = candidates(&[game(1, "Tetris", 0), game(2, "Tetris", 0)]);
        let matched = resolve("Tetris", None, &pool).unwrap();
        assert_eq!(matched.id, 1);
    }

    #[test]
    fn test_unknown_dates_lose_to_dated_candidates() {
        let pool = candidates(&[game(1, "Tetris", 0), game(2, "Tetris", 468_115_200)]);
        let matched = resolve("Tetris", None, &pool).unwrap();
        assert_eq!(matched.id, 2);
    }

    #[test]
    fn test_no_match() {
        let pool = candidates(&[game(1, "Doom", 0)]);
        assert!(resolve("Quake", None, &pool).is_none());
    }

    #[test]
    fn test_sanitized_request_matches_bracketed_candidate() {
        let pool = candidates(&[game(1, "Doom (2016)", 1_463_097_600)]);
        let matched = resolve(&sanitize_title("Doom"), None, &pool).unwrap();
        assert_eq!(matched.id, 1);
    }
}
