use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticket_system::{
    config::{Config, StoreBackend},
    controllers,
    store::{memory::InMemoryStore, postgres::PostgresStore, Store},
    AppState,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ticketing API");

    let store: Arc<dyn Store> = match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Arc::new(InMemoryStore::new())
        }
        StoreBackend::Postgres => {
            let database_url = config.store.database_url.as_deref().expect("DATABASE_URL must be set for the postgres backend");
            let store = PostgresStore::connect(database_url, config.store.database_pool_size).await.expect("failed to connect to postgres");
            store.run_migrations().await.expect("failed to run migrations");
            info!("Connected to postgres and ran migrations");
            Arc::new(store)
        }
    };

    let app_state = Arc::new(AppState { store, config: config.clone() });

    let app = Router::new()
        .route("/", get(|| async { "ticketing API" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.app.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service()).await.unwrap();
}
