//! HTTP surface of the shop.
//!
//! The router is split the way the storefront uses it: public read and checkout routes at
//! the root, admin routes nested under `/api/admin`, uploaded images under the configured
//! image prefix and the static storefront as the fallback.

/// Admin handlers and the password-gate middleware
pub mod admin;
/// `Error` to HTTP response mapping
pub mod error;
/// Public storefront and checkout handlers
pub mod shop;


use crate::{
    auth::AdminAuth,
    config::AppConfig,
    errors::{Error, Result},
    notify::Mailer,
    payment::PaymentGateway,
    store::Store,
    uploads::UploadStore,
};
use axum::{
    Router,
    extract::{ConnectInfo, DefaultBodyLimit, FromRequestParts},
    http::{HeaderMap, request::Parts},
    middleware,
    routing::{delete, get, post, put},
};
use std::{
    convert::Infallible,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

/// Shared handler state. Cloning is cheap; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<Store>,
    pub uploads: Arc<UploadStore>,
    pub auth: Arc<AdminAuth>,
    pub mailer: Arc<dyn Mailer>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        store: Store,
        uploads: UploadStore,
        auth: AdminAuth,
        mailer: Arc<dyn Mailer>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            uploads: Arc::new(uploads),
            auth: Arc::new(auth),
            mailer,
            gateway,
        }
    }
}

/// Address the password-attempt limiter buckets a request under.
///
/// This is the TCP peer, unless the peer is one of `server.trusted_proxies`. In that case it is
/// the rightmost `X-Forwarded-For` hop that is not itself a trusted proxy; hops further left
/// were written by the client and are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl ClientKey {
    fn resolve(headers: &HeaderMap, peer: Option<IpAddr>, trusted: &[IpAddr]) -> Self {
        let Some(peer) = peer else {
            return Self("unknown".to_string());
        };
        if !trusted.contains(&peer) {
            return Self(peer.to_string());
        }

        let hops: Vec<&str> = headers
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
            .collect();
        let client = hops
            .into_iter()
            .rev()
            .find(|hop| hop.parse::<IpAddr>().map_or(true, |ip| !trusted.contains(&ip)));
        Self(client.map_or_else(|| peer.to_string(), str::to_string))
    }
}

impl FromRequestParts<AppState> for ClientKey {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(Self::resolve(
            &parts.headers,
            peer,
            &state.config.server.trusted_proxies,
        ))
    }
}

fn admin_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route(
            "/products/{id}",
            get(admin::get_product)
                .put(admin::update_product)
                .delete(admin::delete_product),
        )
        .route(
            "/categories",
            get(admin::list_categories).post(admin::create_category),
        )
        .route("/categories/{id}", delete(admin::delete_category))
        .route("/orders", get(admin::list_orders))
        .route("/orders/{id}", put(admin::update_order_status))
        .route("/session", delete(admin::logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin::require_admin,
        ))
        .route("/verify", post(admin::verify))
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes))
}

/// Builds the complete application router.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/ping", get(shop::ping))
        .route("/products", get(shop::list_products))
        .route("/categories", get(shop::list_categories))
        .route("/catalog", get(shop::catalog))
        .route("/api/contact", post(shop::contact))
        .route("/api/submit-order", post(shop::submit_order))
        .route("/create-preference", post(shop::create_preference))
        .nest("/api/admin", admin_router(&state));

    let prefix = state.uploads.url_prefix();
    if !prefix.is_empty() {
        router = router.nest_service(
            &format!("/{prefix}"),
            ServeDir::new(state.uploads.dir()),
        );
    }

    router
        .fallback_service(ServeDir::new(&state.config.storage.public_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the configured address and serves until ctrl-c or SIGTERM.
///
/// # Errors
/// Returns an error if the address is invalid, already in use, or the server fails.
pub async fn serve(state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .map_err(|e| Error::Config {
            message: format!("Invalid server address: {e}"),
        })?;

    let listener = TcpListener::bind(addr).await.inspect_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            error!("Port {} is already in use", addr.port());
        } else {
            error!("Failed to bind {}: {}", addr, e);
        }
    })?;
    info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
