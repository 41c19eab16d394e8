//! Assembly pipeline behavior against a scripted upstream.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use sonarr_anime_bridge::error::{ApiError, UpstreamError};
use sonarr_anime_bridge::id_map::IdMap;
use sonarr_anime_bridge::models::{CatalogItem, CatalogPage};
use sonarr_anime_bridge::pipeline::{assemble, AssemblyOptions, CatalogAdapter};

/// Upstream stand-in that serves a fixed page sequence and counts fetches.
struct ScriptedCatalog {
    pages: Vec<CatalogPage>,
    fetches: AtomicU32,
    fail_on_page: Option<u32>,
}

impl ScriptedCatalog {
    fn new(pages: Vec<CatalogPage>) -> Self {
        Self {
            pages,
            fetches: AtomicU32::new(0),
            fail_on_page: None,
        }
    }

    fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogAdapter for ScriptedCatalog {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    async fn fetch_page(
        &self,
        _query: &HashMap<String, String>,
        page: u32,
    ) -> Result<CatalogPage, UpstreamError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_page == Some(page) {
            return Err(UpstreamError::Decode(
                serde_json::from_str::<i64>("boom").unwrap_err(),
            ));
        }
        Ok(self.pages[(page - 1) as usize].clone())
    }
}

fn item(source_id: i64) -> CatalogItem {
    CatalogItem {
        title: format!("Anime {}", source_id),
        title_english: None,
        mal_id: Some(source_id),
        anilist_id: None,
        source_id,
    }
}

fn page(ids: &[i64], has_next_page: bool) -> CatalogPage {
    CatalogPage {
        items: ids.iter().copied().map(item).collect(),
        has_next_page,
    }
}

fn id_map(entries: &[(i64, i64)]) -> IdMap {
    let map = IdMap::new(String::new());
    map.install(entries.iter().copied().collect());
    map
}

fn opts(limit: i64) -> AssemblyOptions {
    AssemblyOptions {
        limit,
        allow_duplicates: false,
        skip_ids: HashSet::new(),
        page_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn unknown_and_duplicate_ids_are_filtered() {
    // cache maps 100 only; page holds [100, 200, 100]
    let catalog = ScriptedCatalog::new(vec![page(&[100, 200, 100], false)]);
    let map = id_map(&[(100, 5000)]);

    let out = assemble(&catalog, &map, &HashMap::new(), &opts(10))
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].mal_id, Some(100));
    assert_eq!(out[0].tvdb_id, 5000);
}

#[tokio::test]
async fn limit_stops_mid_page_even_with_duplicates_allowed() {
    let catalog = ScriptedCatalog::new(vec![page(&[100, 100], false)]);
    let map = id_map(&[(100, 5000)]);
    let options = AssemblyOptions {
        allow_duplicates: true,
        ..opts(1)
    };

    let out = assemble(&catalog, &map, &HashMap::new(), &options)
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
}

#[tokio::test]
async fn overflow_item_is_discarded_not_truncated() {
    let catalog = ScriptedCatalog::new(vec![page(&[1, 2, 3, 4], false)]);
    let map = id_map(&[(1, 10), (2, 20), (3, 30), (4, 40)]);

    let out = assemble(&catalog, &map, &HashMap::new(), &opts(3))
        .await
        .unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out.last().unwrap().mal_id, Some(3));
}

#[tokio::test]
async fn filtered_items_do_not_count_against_the_limit() {
    // ids 2 and 3 are unknown; the limit of 2 must still be filled
    let catalog = ScriptedCatalog::new(vec![page(&[1, 2, 3, 4, 5], false)]);
    let map = id_map(&[(1, 10), (4, 40), (5, 50)]);

    let out = assemble(&catalog, &map, &HashMap::new(), &opts(2))
        .await
        .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].mal_id, Some(1));
    assert_eq!(out[1].mal_id, Some(4));
}

#[tokio::test]
async fn empty_first_page_does_not_end_pagination() {
    // page 1: all unknown, page 2: one eligible item
    let catalog = ScriptedCatalog::new(vec![page(&[900, 901], true), page(&[100], false)]);
    let map = id_map(&[(100, 5000)]);

    let out = assemble(&catalog, &map, &HashMap::new(), &opts(10))
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(catalog.fetch_count(), 2);
}

#[tokio::test]
async fn no_extra_page_is_fetched_once_limit_is_reached() {
    let catalog = ScriptedCatalog::new(vec![page(&[1, 2], true), page(&[3], false)]);
    let map = id_map(&[(1, 10), (2, 20), (3, 30)]);

    let out = assemble(&catalog, &map, &HashMap::new(), &opts(1))
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(catalog.fetch_count(), 1);
}

#[tokio::test]
async fn upstream_order_is_preserved_across_pages() {
    let catalog = ScriptedCatalog::new(vec![page(&[3, 1], true), page(&[2], false)]);
    let map = id_map(&[(1, 10), (2, 20), (3, 30)]);

    let out = assemble(&catalog, &map, &HashMap::new(), &opts(10))
        .await
        .unwrap();
    let ids: Vec<i64> = out.iter().filter_map(|i| i.mal_id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[tokio::test]
async fn duplicates_across_pages_are_kept_when_allowed() {
    let catalog = ScriptedCatalog::new(vec![page(&[100], true), page(&[100], false)]);
    let map = id_map(&[(100, 5000)]);
    let options = AssemblyOptions {
        allow_duplicates: true,
        ..opts(10)
    };

    let out = assemble(&catalog, &map, &HashMap::new(), &options)
        .await
        .unwrap();
    assert_eq!(out.len(), 2);
}

#[tokio::test]
async fn always_skip_ids_never_appear() {
    let catalog = ScriptedCatalog::new(vec![page(&[100, 200], false)]);
    let map = id_map(&[(100, 5000), (200, 6000)]);
    let options = AssemblyOptions {
        skip_ids: HashSet::from([100]),
        allow_duplicates: true,
        ..opts(10)
    };

    let out = assemble(&catalog, &map, &HashMap::new(), &options)
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].mal_id, Some(200));
}

#[tokio::test]
async fn rerunning_the_pipeline_is_deterministic() {
    let pages = vec![page(&[5, 6, 7], true), page(&[8], false)];
    let map = id_map(&[(5, 50), (6, 60), (8, 80)]);

    let first = assemble(
        &ScriptedCatalog::new(pages.clone()),
        &map,
        &HashMap::new(),
        &opts(10),
    )
    .await
    .unwrap();
    let second = assemble(
        &ScriptedCatalog::new(pages),
        &map,
        &HashMap::new(),
        &opts(10),
    )
    .await
    .unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string_pretty(&first).unwrap(),
        serde_json::to_string_pretty(&second).unwrap()
    );
}

#[tokio::test]
async fn upstream_failure_aborts_with_no_partial_result() {
    let catalog = ScriptedCatalog {
        pages: vec![page(&[100], true), CatalogPage::default()],
        fetches: AtomicU32::new(0),
        fail_on_page: Some(2),
    };
    let map = id_map(&[(100, 5000)]);

    let err = assemble(&catalog, &map, &HashMap::new(), &opts(10))
        .await
        .unwrap_err();
    match err {
        ApiError::Upstream { catalog, page, .. } => {
            assert_eq!(catalog, "Scripted");
            assert_eq!(page, 2);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn anilist_item_without_mal_id_is_an_unknown_id_discard() {
    let catalog = ScriptedCatalog::new(vec![CatalogPage {
        items: vec![CatalogItem {
            title: "Web Only".to_string(),
            title_english: None,
            mal_id: None,
            anilist_id: Some(202),
            source_id: 202,
        }],
        has_next_page: false,
    }]);
    let map = id_map(&[(100, 5000)]);

    let out = assemble(&catalog, &map, &HashMap::new(), &opts(10))
        .await
        .unwrap();
    assert!(out.is_empty());
}
