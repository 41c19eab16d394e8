//! MyAnimeList search via the Jikan REST API.

use crate::error::UpstreamError;
use crate::models::{CatalogItem, CatalogPage};
use crate::pipeline::CatalogAdapter;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

const JIKAN_SEARCH_URL: &str = "https://api.jikan.moe/v4/anime";

pub struct MalCatalog {
    client: Client,
}

impl MalCatalog {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct JikanSearchResponse {
    #[serde(default)]
    data: Vec<JikanAnime>,
    #[serde(default)]
    pagination: JikanPagination,
}

#[derive(Debug, Deserialize, Default)]
struct JikanPagination {
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct JikanAnime {
    mal_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    title_english: Option<String>,
}

/// Caller params forwarded to Jikan verbatim, minus the ones this service
/// handles itself. Jikan rejects `limit` values over 25, so the quota is
/// enforced locally and never sent upstream.
fn forwarded_params(query: &HashMap<String, String>, page: u32) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = query
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "limit" | "allow_duplicates" | "page"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    params.sort();
    params.push(("page".to_string(), page.to_string()));
    params
}

#[async_trait]
impl CatalogAdapter for MalCatalog {
    fn name(&self) -> &'static str {
        "MyAnimeList"
    }

    async fn fetch_page(
        &self,
        query: &HashMap<String, String>,
        page: u32,
    ) -> Result<CatalogPage, UpstreamError> {
        let body = self
            .client
            .get(JIKAN_SEARCH_URL)
            .query(&forwarded_params(query, page))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let decoded: JikanSearchResponse = serde_json::from_str(&body)?;
        Ok(CatalogPage {
            items: decoded
                .data
                .into_iter()
                .map(|anime| CatalogItem {
                    title: anime.title,
                    title_english: anime.title_english.filter(|t| !t.is_empty()),
                    mal_id: Some(anime.mal_id),
                    anilist_id: None,
                    source_id: anime.mal_id,
                })
                .collect(),
            has_next_page: decoded.pagination.has_next_page,
        })
    }
}
