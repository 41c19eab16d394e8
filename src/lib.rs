// Library interface for the anime search bridge.
// This allows integration tests to drive the pipeline directly.

pub mod app_state;
pub mod catalogs;
pub mod config;
pub mod error;
pub mod helpers;
pub mod id_map;
pub mod models;
pub mod pipeline;
