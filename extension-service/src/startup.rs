//! Router construction and server lifecycle.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::Settings;
use crate::extensions::wikipedia::cleanup::CleanupPipeline;
use crate::extensions::{gemini, request_host, wikipedia, Extension};
use crate::handlers::{health::health_check, metrics::metrics};
use crate::services::metrics::record_extension_request;
use crate::services::page_source::WikipediaClient;
use crate::services::session_store::SessionMemoryStore;
use crate::services::providers::gemini::{GeminiConfig, GeminiChatProvider};
use crate::AppState;

/// Per-extension routers, selected by request host.
#[derive(Clone)]
struct Dispatcher {
    gemini: Router,
    wikipedia: Router,
    default_extension: Option<Extension>,
}

impl Dispatcher {
    fn router_for(&self, extension: Extension) -> Router {
        match extension {
            Extension::Gemini => self.gemini.clone(),
            Extension::Wikipedia => self.wikipedia.clone(),
        }
    }
}

async fn dispatch(State(dispatcher): State<Dispatcher>, req: Request) -> Response {
    let host = request_host(req.uri(), req.headers());
    let extension = host
        .as_deref()
        .and_then(Extension::for_host)
        .or(dispatcher.default_extension);

    let Some(extension) = extension else {
        tracing::debug!(host = ?host, "No extension serves this host");
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    record_extension_request(extension.name());

    match dispatcher.router_for(extension).oneshot(req).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

/// How often expired sessions are swept from the store.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

pub fn build_router(state: AppState) -> Router {
    build_router_with_store(state, SessionMemoryStore::default())
}

/// Build the router over an existing session store.
pub fn build_router_with_store(state: AppState, session_store: SessionMemoryStore) -> Router {
    // Chat history lives here, one conversation per browser session.
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(24)));

    let dispatcher = Dispatcher {
        gemini: gemini::router().with_state(state.clone()),
        wikipedia: wikipedia::router().with_state(state.clone()),
        default_extension: state.settings.server.default_extension,
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .fallback(dispatch)
        .with_state(dispatcher)
        .layer(session_layer)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");
                let host = request_host(request.uri(), request.headers());

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    host = host.as_deref().unwrap_or("-"),
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
}

/// Build the production state: Gemini and Wikipedia clients plus the cleanup rules.
pub fn build_state(settings: Settings) -> Result<AppState, AppError> {
    let gemini_provider = GeminiChatProvider::new(GeminiConfig {
        api_key: settings.gemini.api_key.clone(),
        api_base: settings.gemini.api_base.clone(),
        timeout: settings.gemini.request_timeout_secs.map(Duration::from_secs),
    })
    .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

    let wikipedia_client = WikipediaClient::new(
        &settings.wikipedia.base_url,
        &settings.wikipedia.user_agent,
        settings.wikipedia.request_timeout_secs.map(Duration::from_secs),
    )
    .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

    let cleanup =
        CleanupPipeline::standard().map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

    tracing::info!(
        default_model = %settings.gemini.default_model,
        wikipedia = %wikipedia_client.base_url(),
        extensions = ?Extension::ALL.map(Extension::domain),
        "Initialized extensions"
    );

    Ok(AppState::new(
        settings,
        Arc::new(gemini_provider),
        Arc::new(wikipedia_client),
        cleanup,
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(settings: Settings) -> Result<Self, AppError> {
        let address = format!("{}:{}", settings.server.host, settings.server.port);
        let state = build_state(settings)?;
        Self::with_state(&address, state).await
    }

    /// Bind `address` and serve `state` (port 0 = random port for testing).
    pub async fn with_state(address: &str, state: AppState) -> Result<Self, AppError> {
        let listener = TcpListener::bind(address).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let local_addr: SocketAddr = listener.local_addr()?;

        tracing::info!("Extension service listening on {}", local_addr);

        let session_store = SessionMemoryStore::default();
        tokio::spawn(
            session_store
                .clone()
                .purge_expired_every(SESSION_PURGE_INTERVAL),
        );

        Ok(Self {
            port: local_addr.port(),
            listener,
            router: build_router_with_store(state, session_store),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("Server error: {}", e);
                std::io::Error::other(format!("Server error: {}", e))
            })
    }
}
