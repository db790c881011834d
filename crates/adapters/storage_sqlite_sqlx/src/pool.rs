//! `SQLite` connection setup.
//!
//! Every query comes from the engine worker, one at a time; HTTP reads are
//! served from the registry. A single connection is enough, and WAL with
//! `synchronous=NORMAL` keeps each of those serialized writes short.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::error::StorageError;

const MAX_CONNECTIONS: u32 = 1;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the database at `database_url`, creating the file if needed, and
/// run pending migrations.
///
/// `database_url` is a sqlx `SQLite` URL such as `sqlite:lightsync.db` or
/// `sqlite::memory:`.
///
/// # Errors
///
/// Returns [`StorageError`] if the URL is invalid, the connection fails or a
/// migration fails.
pub async fn connect(database_url: &str) -> Result<SqlitePool, StorageError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
