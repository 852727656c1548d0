use chrono::{DateTime, Utc};
use ditto_core::{
    error,
    model::lastfm::Scrobble,
    upsert::{upsert, Record, Upserted},
    FetchError,
};
use log::debug;
use snafu::ResultExt;
use sqlx::{SqliteConnection, SqlitePool};

use crate::normalize::{Entity, ScrobbleData};

pub(crate) const TABLE: &str = "lastfm_scrobble";

/// Related rows keep their mbid and permalink once known.
fn entity(table: &'static str, artist_id: Option<i64>, e: &Entity) -> Record {
    let mut record = Record::new(table);
    if let Some(artist_id) = artist_id {
        record = record.key("artist_id", artist_id);
    }
    record
        .key("name", e.name.as_str())
        .field_if_some("mbid", e.mbid.clone())
        .field_if_some("permalink", e.permalink.clone())
}

async fn save_scrobble(
    conn: &mut SqliteConnection,
    account_id: i64,
    s: &ScrobbleData,
    now: DateTime<Utc>,
) -> Result<Upserted, sqlx::Error> {
    let artist_id = upsert(conn, &entity("lastfm_artist", None, &s.artist), now)
        .await?
        .id();
    let track_id = upsert(conn, &entity("lastfm_track", Some(artist_id), &s.track), now)
        .await?
        .id();
    let album_id = match &s.album {
        Some(album) => Some(
            upsert(conn, &entity("lastfm_album", Some(artist_id), album), now)
                .await?
                .id(),
        ),
        None => None,
    };

    let record = Record::new(TABLE)
        .key("account_id", account_id)
        .key("track_id", track_id)
        .key("post_time", s.post_time)
        .field("artist_id", artist_id)
        .field("album_id", album_id)
        .field("title", s.track.name.as_str())
        .field("permalink", s.track.permalink.clone())
        .field("raw", s.raw.as_str())
        .field("is_private", false)
        .touch("fetch_time");
    upsert(conn, &record, now).await
}

/// Save one page of scrobbles in a single transaction.
pub async fn save_scrobbles(
    db: &SqlitePool,
    account_id: i64,
    scrobbles: &[ScrobbleData],
    now: DateTime<Utc>,
) -> Result<(), FetchError> {
    let mut tx = db.begin().await.context(error::StoreFailed {
        message: "cannot start transaction",
    })?;
    let mut written = 0;
    for s in scrobbles {
        let upserted = save_scrobble(&mut tx, account_id, s, now)
            .await
            .context(error::StoreFailed {
                message: format!("cannot save scrobble of {}", s.track.name),
            })?;
        if upserted.is_write() {
            written += 1;
        }
    }
    tx.commit().await.context(error::StoreFailed {
        message: "cannot commit scrobbles",
    })?;
    debug!("lastfm: {} of {} scrobbles written", written, scrobbles.len());
    Ok(())
}

pub async fn scrobbles_for_account(
    db: &SqlitePool,
    account_id: i64,
) -> Result<Vec<Scrobble>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, account_id, artist_id, track_id, album_id, title, permalink, summary,
            raw, is_private, post_time, fetch_time
        FROM lastfm_scrobble WHERE account_id = ? ORDER BY post_time DESC",
    )
    .bind(account_id)
    .fetch_all(db)
    .await
}
