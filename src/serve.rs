//! Purpose: HTTP host wiring body-derived placeholders into each request.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based loopback server; the vars middleware is the reference host integration.
//! Invariants: Downstream handlers observe the original body bytes untouched.
//! Invariants: Replacer state is request-scoped and discarded with the response.
//! Invariants: Loopback-only unless explicitly allowed.

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use bodyvars::core::error::{Error, ErrorKind};
use bodyvars::core::replacer::{Replacer, VarSource};
use bodyvars::core::vars::BodyVars;

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub strict: bool,
    pub template: Option<String>,
    pub max_body_bytes: u64,
    pub allow_non_loopback: bool,
}

#[derive(Clone)]
struct AppState {
    strict: bool,
    template: Option<String>,
    max_body_bytes: usize,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;

    let state = Arc::new(AppState {
        strict: config.strict,
        template: config.template,
        max_body_bytes,
    });

    let vars_routes = Router::new()
        .route("/v0/lookup", post(lookup_value))
        .route("/v0/expand", post(expand_template))
        .route("/v0/echo", post(echo_body))
        .layer(middleware::from_fn_with_state(state.clone(), attach_vars));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .merge(vars_routes)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 1048576."));
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

/// Buffer the body, build the request-scoped replacer, and replay the
/// original bytes for whatever runs downstream.
async fn attach_vars(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return error_response(
                Error::new(ErrorKind::Usage)
                    .with_message("failed to read request body")
                    .with_hint("The body may exceed --max-body-bytes.")
                    .with_source(err),
            );
        }
    };

    let mut replacer = Replacer::new();
    match BodyVars::from_slice(&bytes) {
        Ok(vars) => replacer.push(Arc::new(vars)),
        Err(err) if state.strict => return error_response(err),
        Err(err) => {
            tracing::debug!(error = %err, "body not decodable; json.* vars skipped");
        }
    }
    replacer.push(Arc::new(RequestVars::from_parts(&parts)));

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(Arc::new(replacer));
    next.run(request).await
}

/// Host-side variables under the `http.` namespace, consulted after the
/// JSON body source in the chain.
struct RequestVars {
    method: String,
    uri_path: String,
    uri_query: Option<String>,
    host: Option<String>,
    headers: axum::http::HeaderMap,
}

impl RequestVars {
    fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.as_str().to_string(),
            uri_path: parts.uri.path().to_string(),
            uri_query: parts.uri.query().map(str::to_string),
            host: parts
                .headers
                .get(header::HOST)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            headers: parts.headers.clone(),
        }
    }
}

impl VarSource for RequestVars {
    fn lookup(&self, key: &str) -> Option<Value> {
        let rest = key.strip_prefix("http.request.")?;
        if let Some(name) = rest.strip_prefix("header.") {
            let value = self
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            return Some(Value::String(value.to_string()));
        }
        match rest {
            "method" => Some(Value::String(self.method.clone())),
            "uri.path" => Some(Value::String(self.uri_path.clone())),
            "uri.query" => Some(Value::String(
                self.uri_query.clone().unwrap_or_default(),
            )),
            "host" => Some(Value::String(self.host.clone().unwrap_or_default())),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupQuery {
    key: String,
}

#[derive(Debug, Deserialize)]
struct ExpandQuery {
    template: Option<String>,
}

async fn healthz() -> Response {
    json_response(json!({ "ok": true }))
}

async fn lookup_value(
    Query(query): Query<LookupQuery>,
    Extension(replacer): Extension<Arc<Replacer>>,
) -> Response {
    match replacer.lookup(&query.key) {
        Some(value) => json_response(json!({ "key": query.key, "found": true, "value": value })),
        None => json_response(json!({ "key": query.key, "found": false })),
    }
}

async fn expand_template(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExpandQuery>,
    Extension(replacer): Extension<Arc<Replacer>>,
) -> Response {
    let Some(template) = query.template.or_else(|| state.template.clone()) else {
        return error_response(
            Error::new(ErrorKind::Usage)
                .with_message("no template given")
                .with_hint("Pass ?template=... or start the server with --template."),
        );
    };
    replacer.expand(&template).into_response()
}

// Downstream witness for the read-but-don't-consume contract: echoes the
// body bytes the middleware already decoded.
async fn echo_body(body: Bytes) -> Response {
    body.into_response()
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Usage | ErrorKind::Decode => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Io | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
        },
    };
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert("bodyvars-version", HeaderValue::from_static("0"));
    response
}

fn json_response(payload: serde_json::Value) -> Response {
    let mut response = Json(payload).into_response();
    response
        .headers_mut()
        .insert("bodyvars-version", HeaderValue::from_static("0"));
    response
}
