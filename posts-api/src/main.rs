use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
mod server;

use data::post_store::PostStore;
use data::repositories::memory::post_store::InMemoryPostStore;
use data::repositories::memory::user_store::InMemoryUserStore;
use data::repositories::postgres::post_store::PostgresPostStore;
use data::repositories::postgres::user_store::PostgresUserStore;
use data::user_store::UserStore;
use infrastructure::database::{create_pool, run_migrations};
use infrastructure::logging::init_logging;
use infrastructure::settings::{Settings, StorageBackend};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    init_logging(&settings.log_level)?;

    let (post_store, user_store): (Arc<dyn PostStore>, Arc<dyn UserStore>) =
        match settings.storage_backend {
            StorageBackend::Postgres => {
                let database_url = settings
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required for the postgres backend")?;
                let pool = create_pool(database_url, settings.database_max_connections).await?;
                run_migrations(&pool).await?;

                (
                    Arc::new(PostgresPostStore::new(pool.clone())),
                    Arc::new(PostgresUserStore::new(pool)),
                )
            }
            StorageBackend::Memory => {
                info!("using in-memory storage, data is lost on shutdown");
                (
                    Arc::new(InMemoryPostStore::new()),
                    Arc::new(InMemoryUserStore::new()),
                )
            }
        };

    let state = server::build_state(&settings, post_store, user_store)?;
    server::run_http(&settings, state).await
}
