use chrono::{DateTime, Utc};
use ditto_core::{
    error,
    model::pinboard::Bookmark,
    tags::BOOKMARK_TAGS,
    upsert::{upsert_tagged, Record},
    FetchError,
};
use log::debug;
use snafu::ResultExt;
use sqlx::SqlitePool;

use crate::normalize::BookmarkData;

pub(crate) const TABLE: &str = "pinboard_bookmark";

fn record(account_id: i64, b: &BookmarkData) -> Record {
    Record::new(TABLE)
        .key("account_id", account_id)
        .key("url_hash", b.url_hash.as_str())
        .field("url", b.url.as_str())
        .field("title", b.title.as_str())
        .field("permalink", b.url.as_str())
        .field("summary", b.summary.clone())
        .field("raw", b.raw.as_str())
        .field("is_private", b.is_private)
        .field("is_to_read", b.is_to_read)
        .field("post_time", b.post_time)
        .touch("fetch_time")
}

/// Save one response's bookmarks in a single transaction.
pub async fn save_bookmarks(
    db: &SqlitePool,
    account_id: i64,
    bookmarks: &[BookmarkData],
    now: DateTime<Utc>,
) -> Result<(), FetchError> {
    let mut tx = db.begin().await.context(error::StoreFailed {
        message: "cannot start transaction",
    })?;
    let mut written = 0;
    for b in bookmarks {
        let upserted = upsert_tagged(&mut tx, &record(account_id, b), &BOOKMARK_TAGS, &b.tags, now)
            .await
            .context(error::StoreFailed {
                message: format!("cannot save bookmark {}", b.url),
            })?;
        if upserted.is_write() {
            written += 1;
        }
    }
    tx.commit().await.context(error::StoreFailed {
        message: "cannot commit bookmarks",
    })?;
    debug!("pinboard: {} of {} bookmarks written", written, bookmarks.len());
    Ok(())
}

pub async fn bookmarks_for_account(
    db: &SqlitePool,
    account_id: i64,
) -> Result<Vec<Bookmark>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, account_id, url_hash, url, title, permalink, summary, raw, is_private,
            is_to_read, post_time, fetch_time
        FROM pinboard_bookmark WHERE account_id = ? ORDER BY post_time DESC",
    )
    .bind(account_id)
    .fetch_all(db)
    .await
}
