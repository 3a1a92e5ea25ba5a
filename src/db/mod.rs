pub mod games;
pub mod history;
pub mod models;
pub mod rankings;

use sqlx::sqlite::SqlitePoolOptions;

use crate::error::Result;

/// Opens the SQLite database (creating the file if needed) and applies
/// pending migrations. `test_before_acquire` replays a liveness probe on
/// every checkout so a dead connection is replaced instead of surfacing.
pub async fn connect(db_path: &str, max_connections: u32) -> Result<sqlx::SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .test_before_acquire(true)
        .connect(&format!("sqlite:{db_path}?mode=rwc"))
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Renders a season set as a SQL IN-list. Values are typed i32s from config
/// or request parsing, never raw user strings.
pub(crate) fn season_list(seasons: &[i32]) -> String {
    seasons
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
pub(crate) async fn test_pool() -> sqlx::SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}
