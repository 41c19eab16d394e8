//! MyAnimeList → TVDB id association table.
//!
//! Built from the Kometa-Team `anime_ids.json` snapshot. Each generation is
//! built off to the side and swapped in atomically, so readers never see a
//! half-built table and the network fetch holds no lock that `lookup` needs.
//! Rebuilds are mutually exclusive; the build timestamp lives with the table
//! itself and drives the 24-hour staleness check.

use crate::error::SnapshotError;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;

/// Table generations older than this are rebuilt before the next search.
const MAX_TABLE_AGE_HOURS: i64 = 24;

/// One entry of the remote snapshot. The upstream file stores `mal_id`
/// either as a single number or as a comma-separated string of numbers, so
/// it is decoded as an explicit sum type rather than inspected at runtime.
#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    #[serde(default)]
    tvdb_id: i64,
    #[serde(default)]
    mal_id: Option<MalIdField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MalIdField {
    Single(i64),
    List(String),
}

impl MalIdField {
    fn expand(&self, tvdb_id: i64) -> Result<Vec<i64>, SnapshotError> {
        match self {
            MalIdField::Single(id) => Ok(vec![*id]),
            MalIdField::List(s) => s
                .split(',')
                .map(|token| {
                    token.trim().parse::<i64>().map_err(|_| SnapshotError::BadToken {
                        token: token.to_string(),
                        tvdb_id,
                    })
                })
                .collect(),
        }
    }
}

struct Generation {
    map: HashMap<i64, i64>,
    built_at: Option<DateTime<Utc>>,
}

/// The process-wide id association table. Many concurrent readers, one
/// rebuild at a time.
pub struct IdMap {
    inner: RwLock<Generation>,
    rebuild_lock: tokio::sync::Mutex<()>,
    snapshot_url: String,
}

impl IdMap {
    pub fn new(snapshot_url: String) -> Self {
        Self {
            inner: RwLock::new(Generation {
                map: HashMap::new(),
                built_at: None,
            }),
            rebuild_lock: tokio::sync::Mutex::new(()),
            snapshot_url,
        }
    }

    /// TVDB id for a MAL id, or 0 when there is no known association.
    pub fn lookup(&self, mal_id: i64) -> i64 {
        self.inner.read().unwrap().map.get(&mal_id).copied().unwrap_or(0)
    }

    /// Age of the current generation; `None` before the first build.
    pub fn age(&self) -> Option<Duration> {
        self.inner
            .read()
            .unwrap()
            .built_at
            .map(|built| Utc::now() - built)
    }

    pub fn is_stale(&self) -> bool {
        match self.age() {
            Some(age) => age > Duration::hours(MAX_TABLE_AGE_HOURS),
            None => true,
        }
    }

    /// Fetch the snapshot and swap in a new generation. Mutually exclusive
    /// with other rebuilds; `lookup` keeps serving the previous generation
    /// until the swap.
    pub async fn rebuild(&self, client: &Client) -> Result<(), SnapshotError> {
        let _guard = self.rebuild_lock.lock().await;
        self.rebuild_locked(client).await
    }

    /// Rebuild the table if the current generation is older than 24 hours.
    /// Double-checked under the rebuild lock so a burst of stale requests
    /// produces exactly one rebuild. A failed refresh keeps serving the
    /// previous generation; only the initial build (in `main`) is fatal.
    pub async fn ensure_fresh(&self, client: &Client) {
        if !self.is_stale() {
            return;
        }
        let _guard = self.rebuild_lock.lock().await;
        if !self.is_stale() {
            return;
        }
        log::info!("Anime id association table expired, building new table...");
        if let Err(e) = self.rebuild_locked(client).await {
            log::warn!("Snapshot refresh failed, serving previous table: {}", e);
        }
    }

    async fn rebuild_locked(&self, client: &Client) -> Result<(), SnapshotError> {
        let body = client
            .get(&self.snapshot_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| SnapshotError::Fetch {
                url: self.snapshot_url.clone(),
                source,
            })?
            .text()
            .await
            .map_err(|source| SnapshotError::Fetch {
                url: self.snapshot_url.clone(),
                source,
            })?;
        let map = parse_snapshot(&body)?;
        log::info!("Built anime id association table: {} entries", map.len());
        self.install(map);
        Ok(())
    }

    /// Swap in a fully-built generation and stamp the build time.
    pub fn install(&self, map: HashMap<i64, i64>) {
        let mut inner = self.inner.write().unwrap();
        inner.map = map;
        inner.built_at = Some(Utc::now());
    }
}

/// Decode the snapshot document and expand comma-list entries into one
/// row per MAL id. Entries without a `mal_id` are skipped.
fn parse_snapshot(body: &str) -> Result<HashMap<i64, i64>, SnapshotError> {
    let entries: HashMap<String, SnapshotEntry> = serde_json::from_str(body)?;
    let mut map = HashMap::new();
    for entry in entries.values() {
        let Some(field) = &entry.mal_id else { continue };
        for mal_id in field.expand(entry.tvdb_id)? {
            map.insert(mal_id, entry.tvdb_id);
        }
    }
    Ok(map)
}
