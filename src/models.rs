use serde::Serialize;

/// One normalized search result from an upstream catalog.
///
/// `source_id` is the catalog-native id the dedup and always-skip policies
/// key on (the MAL id on the Jikan path, the AniList id on the AniList
/// path). The TVDB lookup always goes through `mal_id`, since the snapshot
/// maps MAL ids to TVDB ids.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub title: String,
    pub title_english: Option<String>,
    pub mal_id: Option<i64>,
    pub anilist_id: Option<i64>,
    pub source_id: i64,
}

/// One page of upstream results plus the upstream's pagination signal.
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    pub has_next_page: bool,
}

/// Wire-level result item. `tvdb_id` is always non-zero; items without a
/// known TVDB association are filtered out before assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseItem {
    pub title: String,
    #[serde(rename = "titleEnglish", skip_serializing_if = "Option::is_none")]
    pub title_english: Option<String>,
    #[serde(rename = "malId", skip_serializing_if = "Option::is_none")]
    pub mal_id: Option<i64>,
    #[serde(rename = "anilistId", skip_serializing_if = "Option::is_none")]
    pub anilist_id: Option<i64>,
    #[serde(rename = "tvdbId")]
    pub tvdb_id: i64,
}
