use crate::{
    app::{App, AppError, Status},
    documents::{Document, DocumentError},
    semantic::{EngineError, ScoredDocument},
};
use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    app: Arc<App>,
}

pub fn router(app: Arc<App>) -> Router {
    let shared_state = Arc::new(SharedState { app });

    Router::new()
        .route("/api/search", post(search))
        .route("/api/status", get(status))
        .route("/api/documents", get(documents))
        .route("/api/reindex", post(reindex))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

async fn start_app(app: Arc<App>) -> anyhow::Result<()> {
    let addr = app.config().listen_addr.clone();
    let router = router(app);

    let listener = tokio::net::TcpListener::bind(addr.as_str())
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(app: App) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async { start_app(Arc::new(app)).await })
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self.0 {
            AppError::Documents(DocumentError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Documents(DocumentError::Malformed(_)) => StatusCode::BAD_REQUEST,
            AppError::Locked(_) => StatusCode::CONFLICT,
            AppError::Engine(EngineError::Embedding(_)) => {
                log::error!("{self:?}");
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,

    /// Number of results, default_top_k from config.yaml when omitted
    pub top_k: Option<usize>,
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<Vec<ScoredDocument>>, HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.search(&payload.query, payload.top_k)
            .map(Json)
            .map_err(Into::into)
    })
}

async fn status(State(state): State<Arc<SharedState>>) -> Json<Status> {
    Json(state.app.status())
}

async fn documents(State(state): State<Arc<SharedState>>) -> Json<Vec<Document>> {
    Json(state.app.engine().snapshot().documents().to_vec())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReindexRequest {
    /// Documents to index. The configured documents file is read when omitted.
    #[serde(default)]
    pub documents: Option<Vec<Document>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReindexResponse {
    pub documents: usize,
}

async fn reindex(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ReindexRequest>,
) -> Result<Json<ReindexResponse>, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || -> Result<Json<ReindexResponse>, HttpError> {
        let count = match payload.documents {
            Some(documents) => app.reindex(documents)?,
            None => app.reindex_from_file(None)?,
        };

        log::info!("reindexed {count} documents");
        Ok(Json(ReindexResponse { documents: count }))
    })
}
