mod accounts;
mod auth;
mod bootstrap;
mod catalog;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod publish;
mod router;
mod search;
mod store;
mod templates;
mod views;
mod watch;

use crate::auth::{admin_middleware, client_middleware, AuthState};
use crate::bootstrap::Bootstrap;
use crate::config::Config;
use crate::db::Database;
use crate::handlers::{admin, auth_handlers, backup, client, pages};
use crate::publish::GithubPublisher;
use crate::store::Store;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Shared application state
pub struct AppState {
    pub store: Store,
    pub config: Config,
    pub auth: AuthState,
    pub publisher: GithubPublisher,
    pub bootstrap: Bootstrap,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> anyhow::Result<Self> {
        let auth = AuthState::new(
            config.security.jwt_secret.clone(),
            config.security.session_timeout_hours,
            config.security.secure_cookies,
        );
        Ok(Self {
            publisher: GithubPublisher::new(&config.publish)?,
            bootstrap: Bootstrap::new(&config.bootstrap)?,
            store,
            config,
            auth,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meuflix=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    tracing::info!("Loading configuration...");
    let config = Config::load()?;

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::new(&config.database.url, config.database.max_connections).await?;
    let store = Store::new(db, &config.catalog);

    let app_state = Arc::new(AppState::new(config, store)?);

    // Seed from the published copy before serving
    let outcome = app_state.bootstrap.run(&app_state.store).await?;
    tracing::info!("Bootstrap: {:?}", outcome);

    let doc = app_state.store.get().await?;
    if accounts::verify_admin_password(
        &doc.users.admin.password,
        &app_state.config.catalog.default_admin_password,
    ) {
        tracing::warn!(
            "DEFAULT CREDENTIALS - Username: {}, Password: {}",
            doc.users.admin.username,
            app_state.config.catalog.default_admin_password
        );
        tracing::warn!("PLEASE CHANGE THE DEFAULT PASSWORD IMMEDIATELY!");
    }

    let addr = format!(
        "{}:{}",
        app_state.config.server.host, app_state.config.server.port
    );

    let app = build_router(app_state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Visit http://{} to access the catalog", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Admin form actions
    let admin_routes = Router::new()
        .route("/admin/clients/generate", post(admin::generate_client))
        .route("/admin/tests/generate", post(admin::generate_test))
        .route("/admin/tests/:username/activate", post(admin::activate_test))
        .route(
            "/admin/accounts/:segment/:username/:action",
            post(admin::account_action),
        )
        .route("/admin/content/:segment", post(admin::create_content))
        .route("/admin/content/:segment/:id", post(admin::update_content))
        .route("/admin/content/:segment/:id/delete", post(admin::delete_content))
        .route("/admin/settings/site", post(admin::update_site))
        .route("/admin/settings/password", post(admin::change_password))
        .route("/admin/backup/export", get(backup::export))
        .route("/admin/backup/import", post(backup::import))
        .route("/admin/backup/reset", post(backup::reset))
        .route("/admin/backup/publish", post(backup::publish))
        .route("/admin/backup/sync", post(backup::sync))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            admin_middleware,
        ));

    // Client form actions
    let client_routes = Router::new()
        .route("/catalog/favorites/:id", post(client::toggle_favorite))
        .route("/catalog/history/clear", post(client::clear_history))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            client_middleware,
        ));

    // Login/logout; every other page is rendered by the fallback
    let public_routes = Router::new()
        .route("/login", get(pages::page).post(auth_handlers::login))
        .route("/logout", post(auth_handlers::logout));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    let max_body_size = app_state.config.max_body_size_bytes();
    let static_dir = ServeDir::new(&app_state.config.server.static_dir);

    Router::new()
        .merge(admin_routes)
        .merge(client_routes)
        .merge(public_routes)
        .nest_service("/static", static_dir)
        .fallback(pages::page)
        .with_state(app_state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TraceLayer::new_for_http())
}
