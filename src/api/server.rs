//! HTTP API server
//!
//! Hand-rolled hyper service: one accept loop, a routing table keyed on
//! method and path, JSON in and JSON out. Request counts and latency are
//! recorded per route pattern to keep metric cardinality bounded.

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use super::{cache, context};
use crate::builder::ContextBuilder;
use crate::error::{Error, Result};
use crate::health::HealthWatcher;
use crate::metrics;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub builder: Arc<ContextBuilder>,
    pub health: Arc<HealthWatcher>,
}

// =============================================================================
// Server loop
// =============================================================================

/// Bind the API listener and serve until the task is aborted
pub async fn run_api_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { dispatch(state, req).await }
            });
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(%peer, error = %err, "connection error");
            }
        });
    }
}

// =============================================================================
// Routing
// =============================================================================

async fn dispatch(
    state: AppState,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let (route, outcome) = route(state, req).await;
    metrics::record_request(route, method.as_str());
    metrics::observe_request_latency(route, started.elapsed().as_secs_f64());

    if route == "unmatched" {
        return Ok(json_response(
            StatusCode::NOT_FOUND,
            &json!({ "detail": format!("no route for {path}") }),
        ));
    }

    let response = match outcome {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(err) => {
            let status = if err.is_bad_request() {
                StatusCode::BAD_REQUEST
            } else {
                error!(%method, path, error = %err, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            };
            if status == StatusCode::BAD_REQUEST {
                warn!(%method, path, error = %err, "bad request");
            }
            json_response(status, &json!({ "detail": err.to_string() }))
        }
    };
    Ok(response)
}

/// Match the request to a handler. Returns the route pattern used as the
/// metrics label alongside the handler outcome.
async fn route(
    state: AppState,
    req: Request<Incoming>,
) -> (&'static str, Result<serde_json::Value>) {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let params = parse_query(req.uri().query().unwrap_or(""));

    match (method, path.as_str()) {
        (Method::GET, "/") => ("/", service_info(&state)),

        (Method::GET, "/api/v1/health") => (
            "/api/v1/health",
            serde_json::to_value(state.health.snapshot()).map_err(Error::from),
        ),

        (Method::POST, "/api/v1/context/retrieve") => (
            "/api/v1/context/retrieve",
            match read_json(req).await {
                Ok(body) => context::retrieve(&state, body).await,
                Err(err) => Err(err),
            },
        ),
        (Method::GET, "/api/v1/context/retrieve") => (
            "/api/v1/context/retrieve",
            context::retrieve_get(&state, &params).await,
        ),
        (Method::POST, "/api/v1/context/dimension/retrieve") => (
            "/api/v1/context/dimension/retrieve",
            match read_json(req).await {
                Ok(body) => context::retrieve_dimension(&state, body).await,
                Err(err) => Err(err),
            },
        ),
        (Method::GET, "/api/v1/context/dimension/quality") => (
            "/api/v1/context/dimension/quality",
            context::dimension_quality(&state, &params).await,
        ),
        (Method::POST, "/api/v1/context/refresh") => (
            "/api/v1/context/refresh",
            context::refresh(&state, &params).await,
        ),
        (Method::POST, "/api/v1/context/batch/retrieve") => (
            "/api/v1/context/batch/retrieve",
            match read_json(req).await {
                Ok(body) => context::batch_retrieve(&state, body).await,
                Err(err) => Err(err),
            },
        ),

        (Method::GET, "/api/v1/cache/stats") => {
            ("/api/v1/cache/stats", cache::stats(&state).await)
        }
        (Method::POST, "/api/v1/cache/stats/reset") => (
            "/api/v1/cache/stats/reset",
            cache::reset_stats(&state).await,
        ),
        (Method::DELETE, "/api/v1/cache/invalidate") => (
            "/api/v1/cache/invalidate",
            cache::invalidate(&state, &params).await,
        ),
        (Method::POST, "/api/v1/cache/invalidate/case") => (
            "/api/v1/cache/invalidate/case",
            cache::invalidate_case(&state, &params).await,
        ),
        (Method::POST, "/api/v1/cache/warmup") => (
            "/api/v1/cache/warmup",
            match read_json(req).await {
                Ok(body) => cache::warmup(&state, body).await,
                Err(err) => Err(err),
            },
        ),
        (Method::GET, "/api/v1/cache/config") => {
            ("/api/v1/cache/config", cache::config(&state).await)
        }
        (Method::GET, "/api/v1/cache/health") => {
            ("/api/v1/cache/health", cache::health(&state).await)
        }

        _ => (
            "unmatched",
            Err(Error::BadRequest(format!("no route for {path}"))),
        ),
    }
}

fn service_info(state: &AppState) -> Result<serde_json::Value> {
    Ok(json!({
        "service": "context-engine",
        "version": env!("CARGO_PKG_VERSION"),
        "status": if state.health.is_healthy() { "healthy" } else { "degraded" },
        "description": "Case context retrieval across WHO, WHAT, WHERE, WHEN and WHY dimensions",
    }))
}

// =============================================================================
// Request plumbing
// =============================================================================

/// Collect and deserialize a JSON request body
async fn read_json<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T> {
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|err| Error::BadRequest(format!("failed to read request body: {err}")))?
        .to_bytes();
    serde_json::from_slice(&bytes)
        .map_err(|err| Error::BadRequest(format!("invalid request body: {err}")))
}

/// Parse a query string into a map, percent-decoding keys and values
fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

/// Form-style decoding: `+` means space, then percent escapes
fn decode_component(raw: &str) -> String {
    let unplussed = raw.replace('+', " ");
    match urlencoding::decode(&unplussed) {
        Ok(decoded) => decoded.into_owned(),
        // Decoded bytes that are not UTF-8; serve the raw value
        Err(_) => unplussed,
    }
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Full<Bytes>> {
    let payload = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::new(Full::new(Bytes::from(payload)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

// =============================================================================
// Tests
// =============================================================================
