use chrono::{DateTime, Utc};
use ditto_core::{
    error,
    model::flickr::Photo,
    tags::PHOTO_TAGS,
    upsert::{upsert_tagged, Record},
    FetchError,
};
use log::debug;
use snafu::ResultExt;
use sqlx::SqlitePool;

use crate::normalize::PhotoData;

pub(crate) const TABLE: &str = "flickr_photo";

fn record(account_id: i64, p: &PhotoData) -> Record {
    Record::new(TABLE)
        .key("account_id", account_id)
        .key("flickr_id", p.flickr_id.as_str())
        .field("title", p.title.clone())
        .field("permalink", p.permalink.as_str())
        .field("summary", p.summary.clone())
        .field("raw", p.raw.as_str())
        .field("is_private", p.is_private)
        .field("license", p.license.clone())
        .field("view_count", p.view_count)
        .field("media", p.media.clone())
        .field("taken_time", p.taken_time)
        .field("post_time", p.post_time)
        .touch("fetch_time")
}

/// Save one page of photos in a single transaction.
pub async fn save_photos(
    db: &SqlitePool,
    account_id: i64,
    photos: &[PhotoData],
    now: DateTime<Utc>,
) -> Result<(), FetchError> {
    let mut tx = db.begin().await.context(error::StoreFailed {
        message: "cannot start transaction",
    })?;
    let mut written = 0;
    for p in photos {
        let upserted = upsert_tagged(&mut tx, &record(account_id, p), &PHOTO_TAGS, &p.tags, now)
            .await
            .context(error::StoreFailed {
                message: format!("cannot save photo {}", p.flickr_id),
            })?;
        if upserted.is_write() {
            written += 1;
        }
    }
    tx.commit().await.context(error::StoreFailed {
        message: "cannot commit photos",
    })?;
    debug!("flickr: {} of {} photos written", written, photos.len());
    Ok(())
}

pub async fn photos_for_account(db: &SqlitePool, account_id: i64) -> Result<Vec<Photo>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, account_id, flickr_id, title, permalink, summary, raw, is_private,
            license, view_count, media, taken_time, post_time, fetch_time
        FROM flickr_photo WHERE account_id = ? ORDER BY post_time DESC",
    )
    .bind(account_id)
    .fetch_all(db)
    .await
}
