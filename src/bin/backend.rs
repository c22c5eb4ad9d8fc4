#![forbid(unsafe_code)]

//! Axum backend answering "what did this channel upload next?".
//!
//! `POST /nextvideos` runs the lookup on the blocking pool because the YouTube
//! client is synchronous. Everything else is static files from the web root.

use std::{
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use axum::{
    Json, Router,
    body::Body,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
};
use mime_guess::MimeGuess;
use next_vlog_finder::config::{RuntimeOverrides, resolve_runtime_settings};
use next_vlog_finder::error::{ErrorCategory, NextVideosError};
use next_vlog_finder::next::{DEFAULT_COUNT, NextVideosOutcome, get_next_videos};
use next_vlog_finder::youtube::{VideoPlatform, YouTubeClient};
use serde::Deserialize;
use tokio::{fs::File, signal};
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone)]
struct BackendArgs {
    www_root: Option<PathBuf>,
    port: Option<u16>,
    host: Option<IpAddr>,
    env_file: Option<PathBuf>,
}

impl BackendArgs {
    fn parse() -> Result<Self> {
        Self::from_iter(std::env::args().skip(1))
    }

    fn from_iter<I>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self {
            www_root: None,
            port: None,
            host: None,
            env_file: None,
        };
        let mut args = iter.into_iter();
        while let Some(arg) = args.next() {
            if let Some(value) = arg.strip_prefix("--www-root=") {
                parsed.www_root = Some(PathBuf::from(value));
                continue;
            }
            if let Some(value) = arg.strip_prefix("--port=") {
                parsed.port = Some(parse_port_arg(value)?);
                continue;
            }
            if let Some(value) = arg.strip_prefix("--host=") {
                parsed.host = Some(parse_host_arg(value)?);
                continue;
            }
            if let Some(value) = arg.strip_prefix("--env-file=") {
                parsed.env_file = Some(PathBuf::from(value));
                continue;
            }

            match arg.as_str() {
                "--www-root" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--www-root requires a value"))?;
                    parsed.www_root = Some(PathBuf::from(value));
                }
                "--port" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--port requires a value"))?;
                    parsed.port = Some(parse_port_arg(&value)?);
                }
                "--host" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--host requires a value"))?;
                    parsed.host = Some(parse_host_arg(&value)?);
                }
                "--env-file" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--env-file requires a value"))?;
                    parsed.env_file = Some(PathBuf::from(value));
                }
                _ => return Err(anyhow!("unknown argument: {arg}")),
            }
        }
        Ok(parsed)
    }

    fn into_overrides(self) -> RuntimeOverrides {
        RuntimeOverrides {
            www_root: self.www_root,
            nextvlog_port: self.port,
            nextvlog_host: self.host.map(|host| host.to_string()),
            env_path: self.env_file,
        }
    }
}

fn parse_port_arg(value: &str) -> Result<u16> {
    value
        .parse::<u16>()
        .context("expected a numeric port between 0 and 65535")
}

fn parse_host_arg(value: &str) -> Result<IpAddr> {
    value
        .parse::<IpAddr>()
        .context("expected a valid IPv4 or IPv6 address for --host/NEXTVLOG_HOST")
}

#[derive(Clone)]
struct AppState {
    platform: Arc<dyn VideoPlatform>,
    www_root: Arc<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct NextVideosRequest {
    url: String,
    #[serde(default = "default_count")]
    count: i64,
}

fn default_count() -> i64 {
    DEFAULT_COUNT
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<NextVideosError> for ApiError {
    fn from(err: NextVideosError) -> Self {
        match err.category() {
            ErrorCategory::BadInput => Self::bad_request(err.to_string()),
            ErrorCategory::NotFound => Self::not_found(err.to_string()),
            ErrorCategory::Upstream => {
                error!(error = %err, "YouTube lookup failed");
                Self::internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let settings = resolve_runtime_settings(BackendArgs::parse()?.into_overrides())?;
    let host = parse_host_arg(&settings.nextvlog_host)?;

    let index_path = settings.www_root.join(INDEX_FILE);
    if !index_path.exists() {
        warn!(
            path = %index_path.display(),
            "index page not found; the API still runs"
        );
    }

    let state = AppState {
        platform: Arc::new(YouTubeClient::with_base(
            settings.api_key,
            settings.api_base,
        )),
        www_root: Arc::new(settings.www_root),
    };

    let addr = SocketAddr::new(host, settings.nextvlog_port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/nextvideos", post(next_videos))
        .fallback(static_fallback)
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", err);
    }
}

/// Allows any origin. Preflight requests are answered here and never reach a
/// route.
async fn cors(req: Request, next: Next) -> Response {
    let origin = req.headers().get(header::ORIGIN).cloned();
    let requested_headers = req
        .headers()
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned();

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    // Credentials are allowed, so the wildcard is only used without an Origin.
    match origin {
        Some(origin) => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        }
        None => {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            );
        }
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        requested_headers.unwrap_or_else(|| HeaderValue::from_static("*")),
    );
    response
}

async fn next_videos(
    State(state): State<AppState>,
    payload: Result<Json<NextVideosRequest>, JsonRejection>,
) -> ApiResult<Json<NextVideosOutcome>> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    info!(url = %request.url, count = request.count, "next videos requested");

    let platform = state.platform.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        get_next_videos(platform.as_ref(), &request.url, request.count)
    })
    .await
    .map_err(|err| ApiError::internal(format!("lookup task failed: {err}")))??;

    match &outcome {
        NextVideosOutcome::Found(result) => info!(
            channel = %result.channel_title,
            videos = result.videos.len(),
            "next videos resolved"
        ),
        NextVideosOutcome::NotInUploads { .. } => {
            info!("start video missing from its channel uploads")
        }
    }
    Ok(Json(outcome))
}

async fn static_fallback(State(state): State<AppState>, req: Request<Body>) -> Response {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return ApiError::not_found("endpoint not found").into_response();
    }

    match serve_www_path(&state.www_root, req.uri().path()).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn serve_www_path(root: &Path, request_path: &str) -> ApiResult<Response> {
    let target = resolve_www_path(root, request_path)?;
    match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_dir() => stream_file(target.join(INDEX_FILE)).await,
        Ok(_) => stream_file(target).await,
        Err(_) => Err(ApiError::not_found("file not found")),
    }
}

fn resolve_www_path(root: &Path, request_path: &str) -> ApiResult<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Ok(root.join(INDEX_FILE));
    }
    let candidate = Path::new(trimmed);
    if candidate
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(ApiError::not_found("file not found"));
    }
    Ok(root.join(candidate))
}

async fn stream_file(path: PathBuf) -> ApiResult<Response> {
    let file = File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("file not found"))?;

    let mut headers = HeaderMap::new();
    if let Some(mime) = MimeGuess::from_path(&path).first()
        && let Ok(value) = mime.to_string().parse()
    {
        headers.insert(header::CONTENT_TYPE, value);
    }

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((headers, body).into_response())
}
