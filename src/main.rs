use std::sync::Arc;

use anyhow::Result;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use shop_backend::{
    app_state::AppState,
    bootstrap::{self, bootstrap},
    config,
    db::{self, MemoryStore, PgStore},
    routes,
};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_env();
    bootstrap::init_tracing();

    let config = config::load()?;

    let state = match &config.database.url {
        Some(url) => {
            tracing::info!("Running migrations...");
            let migrations_count = db::run_migrations_blocking(MIGRATIONS, url).await?;
            tracing::info!("Run {} new migrations successfully", migrations_count);

            let pool = db::create_pool(url, config.database.max_connections).await?;
            AppState::new(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, data is kept in memory only");
            AppState::new(Arc::new(MemoryStore::new()))
        }
    };

    tracing::info!("Bootstrapping...");
    bootstrap("ShopBackend", routes::app(state), &config.server).await?;
    Ok(())
}
