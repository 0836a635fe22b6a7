use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use super::error::ApiError;

pub async fn connect(url: &str, max_connections: u32) -> Result<Pool<Sqlite>, ApiError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    log::info!("Connected to {url} ({max_connections} connections)");

    Ok(pool)
}

pub async fn migrate(pool: &Pool<Sqlite>) -> Result<(), ApiError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| ApiError::Database(e.into()))?;

    log::info!("Database schema is up to date");

    Ok(())
}
