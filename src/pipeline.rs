//! Cross-catalog result assembly.
//!
//! Drives page fetches through a [`CatalogAdapter`] until the caller's
//! quota is satisfied or the upstream runs out of pages, applying the
//! unknown-id / duplicate / always-skip filters in upstream order. The
//! pipeline does not know which catalog it is driving; both upstreams share
//! it entirely.

use crate::error::{ApiError, UpstreamError};
use crate::helpers::full_anime_title;
use crate::id_map::IdMap;
use crate::models::{CatalogPage, ResponseItem};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Courtesy throttle between page fetches, to stay clear of upstream rate
/// limits. Not a correctness requirement.
pub const PAGE_DELAY: Duration = Duration::from_millis(500);

/// One upstream catalog: translates the generic query into its own request
/// shape, fetches a single page, and normalizes it.
#[async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// Catalog name used in logs and error context.
    fn name(&self) -> &'static str;

    async fn fetch_page(
        &self,
        query: &HashMap<String, String>,
        page: u32,
    ) -> Result<CatalogPage, UpstreamError>;
}

/// How a route treats a missing or unparseable `limit` parameter.
#[derive(Debug, Clone, Copy)]
pub enum LimitPolicy {
    Required,
    Default(i64),
}

pub fn parse_limit(
    query: &HashMap<String, String>,
    policy: LimitPolicy,
) -> Result<i64, ApiError> {
    match query.get("limit").and_then(|s| s.parse::<i64>().ok()) {
        Some(limit) => Ok(limit),
        None => match policy {
            LimitPolicy::Required => Err(ApiError::MissingLimit),
            LimitPolicy::Default(d) => Ok(d),
        },
    }
}

/// Per-request assembly policy. `skip_ids` is the process-wide always-skip
/// set for the catalog being queried; `page_delay` is injectable so tests
/// run without the throttle.
pub struct AssemblyOptions {
    pub limit: i64,
    pub allow_duplicates: bool,
    pub skip_ids: HashSet<i64>,
    pub page_delay: Duration,
}

/// Fetch pages until the limit is met or the upstream is exhausted.
///
/// Items are considered in upstream order. Filtered items (no TVDB
/// association, duplicate, always-skip) never count against the limit; the
/// item that would push the count past the limit is discarded, so the
/// result length is always ≤ `limit`. Seen ids are recorded for every
/// emitted item even when duplicates are allowed.
pub async fn assemble(
    adapter: &dyn CatalogAdapter,
    id_map: &IdMap,
    query: &HashMap<String, String>,
    opts: &AssemblyOptions,
) -> Result<Vec<ResponseItem>, ApiError> {
    let mut has_next_page = true;
    let mut page: u32 = 0;
    let mut result: Vec<ResponseItem> = Vec::new();
    let mut count: i64 = 0;
    let mut seen_ids: HashSet<i64> = HashSet::new();

    while has_next_page {
        page += 1;
        let fetched = match adapter.fetch_page(query, page).await {
            Ok(fetched) => fetched,
            Err(source) => {
                log::error!(
                    "Error querying {} (page {}): {}",
                    adapter.name(),
                    page,
                    source
                );
                return Err(ApiError::Upstream {
                    catalog: adapter.name(),
                    page,
                    source,
                });
            }
        };

        for item in fetched.items {
            let tvdb_id = id_map.lookup(item.mal_id.unwrap_or(0));
            let label = full_anime_title(&item.title, item.title_english.as_deref());
            if tvdb_id == 0 {
                log::info!(
                    "{} ID {} ({}) has no associated TVDB ID, skipping...",
                    adapter.name(),
                    item.source_id,
                    label
                );
                continue;
            }
            if seen_ids.contains(&item.source_id) && !opts.allow_duplicates {
                log::info!(
                    "{} ID {} ({}) is a duplicate, skipping...",
                    adapter.name(),
                    item.source_id,
                    label
                );
                continue;
            }
            if opts.skip_ids.contains(&item.source_id) {
                log::info!(
                    "{} ID {} ({}) is set to always skip, skipping...",
                    adapter.name(),
                    item.source_id,
                    label
                );
                continue;
            }
            count += 1;
            if count > opts.limit {
                break;
            }
            seen_ids.insert(item.source_id);
            result.push(ResponseItem {
                title: item.title,
                title_english: item.title_english,
                mal_id: item.mal_id,
                anilist_id: item.anilist_id,
                tvdb_id,
            });
        }

        has_next_page = fetched.has_next_page;
        if count > opts.limit {
            break;
        }
        if has_next_page {
            tokio::time::sleep(opts.page_delay).await;
        }
    }

    Ok(result)
}
