use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::cache::ResultCache;
use crate::config::{parse_flag, EnricherConfig};
use crate::error::{ApiError, PipelineError};
use crate::feed::encode_feed;
use crate::partition::AlertFeedKind;
use crate::pipeline;
use crate::upstream::{AlertSource, HttpAlertSource};

pub const CACHE_HEADER: HeaderName = HeaderName::from_static("x-alerts-cache");
pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ResultCache>,
    pub source: Arc<dyn AlertSource>,
    pub serve_stale_on_error: bool,
}

impl AppState {
    pub fn new(
        source: Arc<dyn AlertSource>,
        cache: ResultCache,
        serve_stale_on_error: bool,
    ) -> Self {
        Self {
            cache: Arc::new(cache),
            source,
            serve_stale_on_error,
        }
    }

    /// HTTP-backed state from service configuration.
    pub fn from_config(cfg: &EnricherConfig) -> Result<Self, PipelineError> {
        let source = HttpAlertSource::new(
            cfg.alerts_url.clone(),
            cfg.metadata_url.clone(),
            cfg.api_key.clone(),
            cfg.retry_policy(),
            cfg.request_timeout(),
        )?;
        Ok(Self::new(
            Arc::new(source),
            ResultCache::new(cfg.cache_ttl()),
            cfg.serve_stale_on_error,
        ))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/gtfs/alerts/{kind}", get(alerts))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, serde::Deserialize)]
struct AlertsQuery {
    #[serde(default)]
    debug: Option<String>,
}

impl AlertsQuery {
    /// `?debug` alone, or any truthy value, selects JSON.
    fn wants_json(&self) -> bool {
        match self.debug.as_deref() {
            None => false,
            Some("") => true,
            Some(v) => parse_flag(v).unwrap_or(false),
        }
    }
}

async fn alerts(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(q): Query<AlertsQuery>,
) -> Result<Response, ApiError> {
    let kind: AlertFeedKind = kind.parse().map_err(|_| ApiError::UnknownAlertType)?;

    let source = Arc::clone(&state.source);
    let (result, status) = state
        .cache
        .get_or_refresh(move || async move { pipeline::refresh(source.as_ref()).await })
        .await;

    let (feeds, cache_label) = match result {
        Ok(feeds) => (feeds, status.as_str()),
        Err(err) => match state.cache.stale().filter(|_| state.serve_stale_on_error) {
            Some(stale) => {
                tracing::warn!(target: "api", error = %err, "refresh failed, serving stale feed");
                (stale, "STALE")
            }
            None => return Err(err.into()),
        },
    };

    let feed = feeds.get(kind);
    let resp = if q.wants_json() {
        ([(CACHE_HEADER, cache_label)], Json(feed.as_ref())).into_response()
    } else {
        (
            [
                (header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE),
                (CACHE_HEADER, cache_label),
            ],
            encode_feed(feed),
        )
            .into_response()
    };
    Ok(resp)
}
