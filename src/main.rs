mod auth;
mod clients;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod routes;
mod services;
mod ws;

use clients::{CodeExecutor, JdoodleClient};
use config::Config;
use db::{DocumentStore, MemoryDocumentStore, PgDocumentStore};
use routes::create_app;
use std::panic;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use ws::Hub;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<Hub>,
    pub store: Arc<dyn DocumentStore>,
    /// `None` when no execution provider credentials are configured
    pub executor: Option<Arc<dyn CodeExecutor>>,
}

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "colab_code=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    info!(
        "{} starting in {} mode (log level {})",
        config.service_name, config.environment, config.log_level
    );
    if config.auth_jwt_secret.is_none() {
        if config.is_production() {
            error!("AUTH_JWT_SECRET is not set - every authenticated route will fail");
        } else {
            warn!("AUTH_JWT_SECRET is not set - every authenticated route will fail");
        }
    }

    let store = init_store(&config).await;
    let executor = init_executor(&config);

    let state = AppState {
        hub: Arc::new(Hub::new(config.default_language.clone())),
        config: Arc::new(config),
        store,
        executor,
    };
    let address = state.config.server_address();
    let app = create_app(state);

    // Start the HTTP/API server
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}

/// Postgres when a database URL is configured and reachable, otherwise the
/// in-process store.
async fn init_store(config: &Config) -> Arc<dyn DocumentStore> {
    let Some(db_url) = &config.db_url else {
        warn!("No database URL configured - documents are kept in memory only");
        return Arc::new(MemoryDocumentStore::new());
    };

    let store = match PgDocumentStore::connect(db_url).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            warn!("Falling back to the in-memory document store");
            return Arc::new(MemoryDocumentStore::new());
        }
    };
    if let Err(e) = store.init_schema().await {
        error!("Failed to create database schema: {}", e);
        warn!("Falling back to the in-memory document store");
        return Arc::new(MemoryDocumentStore::new());
    }

    info!("Database initialized successfully");
    Arc::new(store)
}

fn init_executor(config: &Config) -> Option<Arc<dyn CodeExecutor>> {
    let Some((client_id, client_secret)) = config.execution_credentials() else {
        warn!("No execution provider credentials configured - run-code will answer 503");
        return None;
    };

    match JdoodleClient::new(
        config.execution_api_url.clone(),
        client_id,
        client_secret,
        Duration::from_secs(config.execution_timeout_secs),
    ) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            error!("Failed to build execution client: {}", e);
            None
        }
    }
}
