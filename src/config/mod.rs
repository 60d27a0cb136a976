use serde::Deserialize;
use std::env;

/// Top-level configuration container: app/runtime settings and store backend
/// selection.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

/// `backend` selects which `Store` implementation `main.rs` constructs;
/// `database_*` fields only matter when `backend == "postgres"`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_pool_size: u32,
    pub table_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "ticket_system=debug,tower_http=debug".to_string()),
            },
            store: StoreConfig {
                backend: match env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".to_string()).as_str() {
                    "postgres" => StoreBackend::Postgres,
                    "memory" => StoreBackend::Memory,
                    other => panic!("STORE_BACKEND must be 'memory' or 'postgres', got '{other}'"),
                },
                database_url: env::var("DATABASE_URL").ok(),
                database_pool_size: env::var("DATABASE_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DATABASE_POOL_SIZE must be a valid number"),
                table_name: env::var("STORE_TABLE_NAME").unwrap_or_else(|_| "items".to_string()),
            },
        }
    }

    pub fn debug(&self) -> bool {
        self.app.environment != "production"
    }
}
