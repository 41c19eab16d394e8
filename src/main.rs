use actix_web::{get, middleware, web, App, HttpResponse, HttpServer};
use log::info;
use std::collections::HashMap;

use sonarr_anime_bridge::app_state::AppState;
use sonarr_anime_bridge::catalogs::anilist::AniListCatalog;
use sonarr_anime_bridge::catalogs::mal::MalCatalog;
use sonarr_anime_bridge::config::Config;
use sonarr_anime_bridge::error::ApiError;
use sonarr_anime_bridge::helpers::parse_bool_param;
use sonarr_anime_bridge::id_map::IdMap;
use sonarr_anime_bridge::models::ResponseItem;
use sonarr_anime_bridge::pipeline::{
    assemble, parse_limit, AssemblyOptions, LimitPolicy, PAGE_DELAY,
};

/// Sonarr expects a pretty-printed JSON array.
fn json_response(items: &[ResponseItem]) -> Result<HttpResponse, ApiError> {
    let body = serde_json::to_string_pretty(items)?;
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

async fn mal_search(
    data: &AppState,
    query: &HashMap<String, String>,
    limit_policy: LimitPolicy,
) -> Result<HttpResponse, ApiError> {
    data.id_map.ensure_fresh(&data.client).await;
    let opts = AssemblyOptions {
        limit: parse_limit(query, limit_policy)?,
        allow_duplicates: parse_bool_param(query, "allow_duplicates"),
        skip_ids: data.config.skip_mal_ids.clone(),
        page_delay: PAGE_DELAY,
    };
    let adapter = MalCatalog::new(data.client.clone());
    let items = assemble(&adapter, &data.id_map, query, &opts).await?;
    json_response(&items)
}

#[get("/v1/mal/anime")]
async fn mal_anime_search(
    data: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, ApiError> {
    mal_search(&data, &query, LimitPolicy::Required).await
}

/// Legacy route kept for existing Sonarr list configurations: same as
/// /v1/mal/anime but a missing limit falls back to an effectively
/// unbounded quota.
#[get("/anime")]
async fn legacy_anime_search(
    data: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, ApiError> {
    mal_search(&data, &query, LimitPolicy::Default(9999)).await
}

#[get("/v1/anilist/anime")]
async fn anilist_anime_search(
    data: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, ApiError> {
    data.id_map.ensure_fresh(&data.client).await;
    let opts = AssemblyOptions {
        limit: parse_limit(&query, LimitPolicy::Required)?,
        allow_duplicates: parse_bool_param(&query, "allowDuplicates"),
        skip_ids: data.config.skip_anilist_ids.clone(),
        page_delay: PAGE_DELAY,
    };
    let adapter = AniListCatalog::new(data.client.clone());
    let items = assemble(&adapter, &data.id_map, &query, &opts).await?;
    json_response(&items)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    log4rs::init_file("log4rs.yml", Default::default()).unwrap();
    info!("sonarr-anime-bridge v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    if !config.skip_mal_ids.is_empty() {
        info!("Always skipping MyAnimeList ids: {:?}", config.skip_mal_ids);
    }
    if !config.skip_anilist_ids.is_empty() {
        info!("Always skipping AniList ids: {:?}", config.skip_anilist_ids);
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("sonarr-anime-bridge/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .unwrap();

    // The process is useless without an initial mapping; refuse to start.
    let id_map = IdMap::new(config.snapshot_url.clone());
    info!("Building anime id associations...");
    if let Err(e) = id_map.rebuild(&client).await {
        log::error!("Error building anime id associations: {}", e);
        std::process::exit(1);
    }

    let bind_addr = config.bind_addr.clone();
    let data = web::Data::new(AppState {
        client,
        config,
        id_map,
    });

    info!("Listening on {}", bind_addr);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::new("%r"))
            .service(mal_anime_search)
            .service(anilist_anime_search)
            .service(legacy_anime_search)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
