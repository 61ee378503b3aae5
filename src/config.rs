use anyhow::{Context, Result};

pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

pub struct DatabaseConfig {
    /// `None` runs the service on the in-process store.
    pub url: Option<String>,
    pub max_connections: u32,
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or(default.to_string())
}

/// Reads configuration from the environment (after `.env` has been loaded).
pub fn load() -> Result<AppConfig> {
    let port = var_or("PORT", "8080")
        .parse()
        .context("PORT must be a valid port number")?;
    let max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10")
        .parse()
        .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

    Ok(AppConfig {
        server: ServerConfig {
            host: var_or("HOST", "0.0.0.0"),
            port,
        },
        database: DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            max_connections,
        },
    })
}
