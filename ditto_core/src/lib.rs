use log::debug;
use snafu::ResultExt;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::{str::FromStr, time::Instant};

pub mod accounts;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod normalize;
pub mod outcome;
pub mod scope;
pub mod tags;
pub mod upsert;

pub use error::{Error, FetchError};
pub use fetcher::{run_fetch, Fetcher};

pub type Result<T> = std::result::Result<T, Error>;

/// Open the database and bring its schema up to date.
pub async fn connect(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .context(error::Database {
            message: format!("invalid database url {url}"),
        })?
        .create_if_missing(true)
        .foreign_keys(true);
    let mut pool = SqlitePoolOptions::new();
    if url.contains(":memory:") {
        // Every connection to an in-memory database is a separate database.
        pool = pool.max_connections(1).idle_timeout(None).max_lifetime(None);
    }
    let db = pool.connect_with(options).await.context(error::Database {
        message: "cannot open database",
    })?;
    migrate(&db).await?;
    Ok(db)
}

pub async fn migrate(db: &SqlitePool) -> Result<()> {
    debug!("migration started");
    let t = Instant::now();
    sqlx::migrate!().run(db).await.context(error::Migrate)?;
    debug!("migration finished: {:?}", t.elapsed());
    Ok(())
}
