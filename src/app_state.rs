//! Shared state for the Actix-web server.
//!
//! Wrapped in `web::Data` and shared across all HTTP request handlers. The
//! id association table carries its own locking; everything else is
//! read-only after startup.

use crate::config::Config;
use crate::id_map::IdMap;
use reqwest::Client;

pub struct AppState {
    /// Shared reqwest HTTP client (snapshot fetches and upstream calls).
    pub client: Client,
    /// Environment-derived configuration.
    pub config: Config,
    /// MAL → TVDB association table.
    pub id_map: IdMap,
}
