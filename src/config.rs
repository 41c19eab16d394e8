use std::collections::HashSet;
use std::env;

pub const DEFAULT_SNAPSHOT_URL: &str =
    "https://raw.githubusercontent.com/Kometa-Team/Anime-IDs/master/anime_ids.json";

/// Process-wide configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (`BIND_ADDR`).
    pub bind_addr: String,
    /// Anime id snapshot location (`ANIME_IDS_URL`).
    pub snapshot_url: String,
    /// MAL ids permanently excluded from results (`ALWAYS_SKIP_MAL_IDS`).
    pub skip_mal_ids: HashSet<i64>,
    /// AniList ids permanently excluded from results (`ALWAYS_SKIP_ANILIST_IDS`).
    pub skip_anilist_ids: HashSet<i64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3333".to_string(),
            snapshot_url: DEFAULT_SNAPSHOT_URL.to_string(),
            skip_mal_ids: HashSet::new(),
            skip_anilist_ids: HashSet::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = env::var("BIND_ADDR") {
            if !v.is_empty() {
                cfg.bind_addr = v;
            }
        }
        if let Ok(v) = env::var("ANIME_IDS_URL") {
            if !v.is_empty() {
                cfg.snapshot_url = v;
            }
        }
        cfg.skip_mal_ids = parse_id_list(&env::var("ALWAYS_SKIP_MAL_IDS").unwrap_or_default());
        cfg.skip_anilist_ids =
            parse_id_list(&env::var("ALWAYS_SKIP_ANILIST_IDS").unwrap_or_default());
        cfg
    }
}

/// Parse a comma-separated id list. Non-numeric tokens could never match a
/// numeric catalog id, so they are dropped.
pub fn parse_id_list(raw: &str) -> HashSet<i64> {
    raw.split(',')
        .filter_map(|token| token.trim().parse::<i64>().ok())
        .collect()
}
