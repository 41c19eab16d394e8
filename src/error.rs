use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Failures while fetching or decoding one upstream catalog page.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures while fetching or decoding the anime id snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("error fetching {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("error decoding anime id snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid mal_id token {token:?} in snapshot entry for tvdb id {tvdb_id}")]
    BadToken { token: String, tvdb_id: i64 },
}

/// Request-scoped errors. All of these surface to the caller as a plain
/// HTTP 500 with the message as the body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("required parameter \"limit\" not specified")]
    MissingLimit,

    #[error("error querying {catalog} (page {page}): {source}")]
    Upstream {
        catalog: &'static str,
        page: u32,
        #[source]
        source: UpstreamError,
    },

    #[error("error encoding response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}
