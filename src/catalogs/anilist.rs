//! AniList search via its GraphQL API.

use crate::error::UpstreamError;
use crate::helpers::parse_bool_value;
use crate::models::{CatalogItem, CatalogPage};
use crate::pipeline::CatalogAdapter;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

const ANILIST_API_URL: &str = "https://graphql.anilist.co";

/// Page size is fixed server-side at 20; the caller's quota is enforced
/// locally by the pipeline.
const ANILIST_QUERY: &str = r#"
query (
  $page: Int
  $type: MediaType
  $isAdult: Boolean
  $search: String
  $format: [MediaFormat]
  $status: MediaStatus
  $countryOfOrigin: CountryCode
  $season: MediaSeason
  $seasonYear: Int
  $year: String
  $onList: Boolean
  $yearLesser: FuzzyDateInt
  $yearGreater: FuzzyDateInt
  $averageScoreGreater: Int
  $averageScoreLesser: Int
  $genres: [String]
  $excludedGenres: [String]
  $tags: [String]
  $excludedTags: [String]
  $minimumTagRank: Int
  $sort: [MediaSort]
) {
  Page(page: $page, perPage: 20) {
    pageInfo {
      hasNextPage
    }
    media(
      type: $type
      season: $season
      format_in: $format
      status: $status
      countryOfOrigin: $countryOfOrigin
      search: $search
      onList: $onList
      seasonYear: $seasonYear
      startDate_like: $year
      startDate_lesser: $yearLesser
      startDate_greater: $yearGreater
      averageScore_greater: $averageScoreGreater
      averageScore_lesser: $averageScoreLesser
      genre_in: $genres
      genre_not_in: $excludedGenres
      tag_in: $tags
      tag_not_in: $excludedTags
      minimumTagRank: $minimumTagRank
      sort: $sort
      isAdult: $isAdult
    ) {
      id
      idMal
      title {
        romaji
        english
      }
    }
  }
}
"#;

const INT_KEYS: &[&str] = &[
    "seasonYear",
    "yearLesser",
    "yearGreater",
    "averageScoreGreater",
    "averageScoreLesser",
    "minimumTagRank",
];
const BOOL_KEYS: &[&str] = &["onList", "isAdult"];
const STRING_KEYS: &[&str] = &["search", "status", "countryOfOrigin", "season", "year"];
const LIST_KEYS: &[&str] = &[
    "format",
    "genres",
    "excludedGenres",
    "tags",
    "excludedTags",
    "sort",
];

/// Convert the generic query parameters into GraphQL variables. Comma
/// separated values expand to lists; unparseable ints and bools are dropped
/// rather than forwarded. `type` is always ANIME.
fn build_graphql_variables(query: &HashMap<String, String>, page: u32) -> Value {
    let mut vars = serde_json::Map::new();
    vars.insert("page".to_string(), json!(page));
    vars.insert("type".to_string(), json!("ANIME"));
    for &key in INT_KEYS {
        if let Some(v) = query.get(key).and_then(|s| s.parse::<i64>().ok()) {
            vars.insert(key.to_string(), json!(v));
        }
    }
    for &key in BOOL_KEYS {
        if let Some(v) = query.get(key).and_then(|s| parse_bool_value(s)) {
            vars.insert(key.to_string(), json!(v));
        }
    }
    for &key in STRING_KEYS {
        if let Some(v) = query.get(key).filter(|s| !s.is_empty()) {
            vars.insert(key.to_string(), json!(v));
        }
    }
    for &key in LIST_KEYS {
        if let Some(v) = query.get(key).filter(|s| !s.is_empty()) {
            vars.insert(key.to_string(), json!(v.split(',').collect::<Vec<_>>()));
        }
    }
    Value::Object(vars)
}

#[derive(Debug, Deserialize)]
struct AniListResponse {
    data: AniListData,
}

#[derive(Debug, Deserialize)]
struct AniListData {
    #[serde(rename = "Page")]
    page: AniListPage,
}

#[derive(Debug, Deserialize)]
struct AniListPage {
    #[serde(rename = "pageInfo", default)]
    page_info: AniListPageInfo,
    #[serde(default)]
    media: Vec<AniListMedia>,
}

#[derive(Debug, Deserialize, Default)]
struct AniListPageInfo {
    #[serde(rename = "hasNextPage", default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct AniListMedia {
    id: i64,
    #[serde(rename = "idMal")]
    id_mal: Option<i64>,
    #[serde(default)]
    title: AniListTitle,
}

#[derive(Debug, Deserialize, Default)]
struct AniListTitle {
    romaji: Option<String>,
    english: Option<String>,
}

pub struct AniListCatalog {
    client: Client,
}

impl AniListCatalog {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CatalogAdapter for AniListCatalog {
    fn name(&self) -> &'static str {
        "AniList"
    }

    async fn fetch_page(
        &self,
        query: &HashMap<String, String>,
        page: u32,
    ) -> Result<CatalogPage, UpstreamError> {
        let body = json!({
            "query": ANILIST_QUERY,
            "variables": build_graphql_variables(query, page),
        });
        let text = self
            .client
            .post(ANILIST_API_URL)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let decoded: AniListResponse = serde_json::from_str(&text)?;
        Ok(CatalogPage {
            items: decoded
                .data
                .page
                .media
                .into_iter()
                .map(|media| CatalogItem {
                    title: media.title.romaji.unwrap_or_default(),
                    title_english: media.title.english.filter(|t| !t.is_empty()),
                    mal_id: media.id_mal,
                    anilist_id: Some(media.id),
                    source_id: media.id,
                })
                .collect(),
            has_next_page: decoded.data.page.page_info.has_next_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn variables_force_anime_type_and_page() {
        let vars = build_graphql_variables(&query(&[]), 4);
        assert_eq!(vars["page"], json!(4));
        assert_eq!(vars["type"], json!("ANIME"));
    }

    #[test]
    fn variables_typed_by_key_class() {
        let vars = build_graphql_variables(
            &query(&[
                ("search", "frieren"),
                ("seasonYear", "2023"),
                ("onList", "true"),
                ("genres", "Fantasy,Drama"),
                ("sort", "POPULARITY_DESC"),
            ]),
            1,
        );
        assert_eq!(vars["search"], json!("frieren"));
        assert_eq!(vars["seasonYear"], json!(2023));
        assert_eq!(vars["onList"], json!(true));
        assert_eq!(vars["genres"], json!(["Fantasy", "Drama"]));
        assert_eq!(vars["sort"], json!(["POPULARITY_DESC"]));
    }

    #[test]
    fn unparseable_values_are_dropped() {
        let vars = build_graphql_variables(
            &query(&[("seasonYear", "soon"), ("isAdult", "perhaps"), ("search", "")]),
            1,
        );
        assert!(vars.get("seasonYear").is_none());
        assert!(vars.get("isAdult").is_none());
        assert!(vars.get("search").is_none());
    }

    #[test]
    fn decodes_an_anilist_page_with_null_mal_id() {
        let body = r#"{
            "data": {
                "Page": {
                    "pageInfo": {"hasNextPage": false},
                    "media": [
                        {"id": 101, "idMal": 21, "title": {"romaji": "One Piece", "english": "ONE PIECE"}},
                        {"id": 202, "idMal": null, "title": {"romaji": "Web Only", "english": null}}
                    ]
                }
            }
        }"#;
        let decoded: AniListResponse = serde_json::from_str(body).unwrap();
        assert!(!decoded.data.page.page_info.has_next_page);
        assert_eq!(decoded.data.page.media[0].id_mal, Some(21));
        assert!(decoded.data.page.media[1].id_mal.is_none());
    }
}
