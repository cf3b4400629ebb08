//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, CORS, limits, session resolution)
//! - Bind server to listener
//! - Run the session sweeper alongside the server
//! - Stop on the shutdown broadcast

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::handlers::{create_session, index, proxy};
use crate::http::page::render_index;
use crate::http::CREATE_SESSION_PATH;
use crate::mediation::{session_resolver_middleware, MediatorError, ProxyMediator};
use crate::session::{EvictionPolicy, SessionStore, SessionSweeper};

/// Startup and serve failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Mediator(#[from] MediatorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub mediator: Arc<ProxyMediator>,
    pub index_page: Arc<str>,
}

/// HTTP server for the search session proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    store: Arc<SessionStore>,
}

impl HttpServer {
    /// Create a new HTTP server with a fresh session store.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let store = Arc::new(SessionStore::new(EvictionPolicy::from(&config.sessions)));
        Self::with_store(config, store)
    }

    /// Create a new HTTP server around an existing session store.
    pub fn with_store(config: ProxyConfig, store: Arc<SessionStore>) -> Result<Self, ServerError> {
        let mediator = Arc::new(ProxyMediator::new(
            &config.upstream,
            &config.timeouts,
            &config.security,
        )?);

        let state = AppState {
            store: store.clone(),
            mediator,
            index_page: render_index(&config.upstream.mount_path).into(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config, store })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// `/create-session` sits outside the resolver; the page and proxy routes run behind it.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mount = config.upstream.mount_path.as_str();

        let resolved = Router::new()
            .route("/", get(index))
            .route(mount, any(proxy))
            .route(&format!("{mount}/"), any(proxy))
            .route(&format!("{mount}/{{*rest}}"), any(proxy))
            .layer(middleware::from_fn_with_state(
                state.store.clone(),
                session_resolver_middleware,
            ));

        // Outer guard; the mediator's own upstream deadline fires first.
        let request_timeout =
            Duration::from_secs(config.timeouts.connect_secs + config.timeouts.request_secs);

        Router::new()
            .route(CREATE_SESSION_PATH, post(create_session))
            .merge(resolved)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get("x-request-id")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id,
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    // Cors needs a `Default` response body, which the limit layer's body lacks.
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(CorsLayer::permissive())
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    /// Run the server, accepting connections on the given listener until shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.target,
            mount_path = %self.config.upstream.mount_path,
            "HTTP server starting"
        );

        let sweeper = SessionSweeper::new(
            self.store.clone(),
            Duration::from_secs(self.config.sessions.sweep_interval_secs.max(1)),
        );
        tokio::spawn(sweeper.run(shutdown.resubscribe()));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!(sessions = self.store.len(), "HTTP server stopped");
        Ok(())
    }

    /// The assembled router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the session store.
    pub fn store(&self) -> Arc<SessionStore> {
        self.store.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
