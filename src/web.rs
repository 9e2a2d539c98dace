//! HTTP surface: page shell, playlist API and media bytes.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::select;
use tokio::signal;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::compression::predicate::{DefaultPredicate, NotForContentType, Predicate};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::Configuration;
use crate::error::Error;
use crate::library::{API_FILES, Library, Scope};
use crate::scan::Playlist;
use crate::sequencer::Pacing;

const INDEX_TEMPLATE: &str = include_str!("../assets/index.html");
const PAGE_CSS: &str = include_str!("../assets/page.css");
const WEB_MANIFEST: &str = include_str!("../assets/site.webmanifest");
const BROWSER_CONFIG: &str = include_str!("../assets/browserconfig.xml");

#[derive(Clone)]
struct AppState {
    library: Arc<Library>,
    page: Bytes,
}

/// Fill the pacing constants into the page shell.
#[must_use]
pub fn render_page(pacing: Pacing) -> String {
    INDEX_TEMPLATE
        .replace("__SLIDE_MS__", &pacing.slide_duration.as_millis().to_string())
        .replace("__RETRY_SECS__", &pacing.empty_retry.as_secs().max(1).to_string())
}

/// Build the application router for `config`.
pub fn router(config: &Configuration) -> Router {
    let state = AppState {
        library: Arc::new(config.library()),
        page: Bytes::from(render_page(config.pacing())),
    };

    let mut app = Router::new()
        .route("/", get(page_shell))
        .route("/precise/{folder}", get(page_shell))
        .route(API_FILES, get(root_playlist))
        .route("/api/files/", get(root_playlist))
        .route("/api/files/{dir}", get(scoped_playlist))
        .route("/assets/page.css", get(page_css))
        .route("/assets/site.webmanifest", get(web_manifest))
        .route("/assets/browserconfig.xml", get(browser_config))
        .nest_service(
            &config.media_url_prefix,
            ServeDir::new(&config.media_root),
        );
    if let Some(dir) = &config.static_dir {
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    // Images are skipped by the default predicate; video is already compressed too.
    let compress_when = DefaultPredicate::new().and(NotForContentType::const_new("video/"));

    app.layer(CompressionLayer::new().compress_when(compress_when))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `cancel` fires, then give in-flight requests the grace period.
pub async fn serve(config: Configuration, cancel: CancellationToken) -> Result<()> {
    let app = router(&config);
    let addr = SocketAddr::new(config.bind_address, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind listener on {addr}"))?;
    info!(
        %addr,
        media_root = %config.media_root.display(),
        url_prefix = %config.media_url_prefix,
        "signage server listening"
    );

    let shutdown = cancel.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    });

    select! {
        res = &mut server => {
            return res.context("server task failed")?.context("server exited");
        }
        _ = cancel.cancelled() => {}
    }

    info!(
        grace = %humantime::format_duration(config.shutdown_grace),
        "shutting down; draining in-flight requests"
    );
    match timeout(config.shutdown_grace, &mut server).await {
        Ok(res) => res.context("server task failed")?.context("server exited")?,
        Err(_) => {
            warn!("grace period elapsed; aborting remaining connections");
            server.abort();
        }
    }
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut term) = signal(SignalKind::terminate()) {
            term.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn page_shell(State(state): State<AppState>) -> Html<Bytes> {
    Html(state.page.clone())
}

async fn root_playlist(State(state): State<AppState>) -> Result<Json<Playlist>, Error> {
    playlist_for(&state, Scope::Root).await
}

async fn scoped_playlist(
    State(state): State<AppState>,
    Path(dir): Path<String>,
) -> Result<Json<Playlist>, Error> {
    playlist_for(&state, Scope::Folder(dir)).await
}

async fn playlist_for(state: &AppState, scope: Scope) -> Result<Json<Playlist>, Error> {
    let library = Arc::clone(&state.library);
    let playlist = tokio::task::spawn_blocking(move || library.playlist(&scope)).await??;
    Ok(Json(playlist))
}

async fn page_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], PAGE_CSS)
}

async fn web_manifest() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/manifest+json")], WEB_MANIFEST)
}

async fn browser_config() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/xml")], BROWSER_CONFIG)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound(what) => {
                debug!(%what, "playlist directory not found");
                (StatusCode::NOT_FOUND, "Not found.").into_response()
            }
            // A single unreadable file fails this request, never the process.
            err => {
                error!(error = %err, "playlist request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to read media directory.",
                )
                    .into_response()
            }
        }
    }
}
