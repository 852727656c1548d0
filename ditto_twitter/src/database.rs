use chrono::{DateTime, Utc};
use ditto_core::{
    error,
    model::twitter::Tweet,
    upsert::{upsert, Record},
    FetchError,
};
use log::debug;
use snafu::ResultExt;
use sqlx::SqlitePool;

use crate::normalize::TweetData;

fn record(account_id: i64, t: &TweetData) -> Record {
    Record::new("twitter_tweet")
        .key("account_id", account_id)
        .key("twitter_id", t.twitter_id)
        .field("title", t.title.as_str())
        .field("permalink", t.permalink.as_str())
        .field("text", t.text.as_str())
        .field("raw", t.raw.as_str())
        .field("is_private", t.is_private)
        .field("language", t.language.clone())
        .field("favorite_count", t.favorite_count)
        .field("retweet_count", t.retweet_count)
        .field("in_reply_to_user_id", t.in_reply_to_user_id.clone())
        .field("post_time", t.post_time)
        .touch("fetch_time")
}

/// Save one page of tweets in a single transaction.
pub async fn save_tweets(
    db: &SqlitePool,
    account_id: i64,
    tweets: &[TweetData],
    now: DateTime<Utc>,
) -> Result<(), FetchError> {
    let mut tx = db.begin().await.context(error::StoreFailed {
        message: "cannot start transaction",
    })?;
    let mut written = 0;
    for t in tweets {
        let upserted = upsert(&mut tx, &record(account_id, t), now)
            .await
            .context(error::StoreFailed {
                message: format!("cannot save tweet {}", t.twitter_id),
            })?;
        if upserted.is_write() {
            written += 1;
        }
    }
    tx.commit().await.context(error::StoreFailed {
        message: "cannot commit tweets",
    })?;
    debug!("twitter: {} of {} tweets written", written, tweets.len());
    Ok(())
}

/// Id of the account's most recently posted stored tweet.
pub async fn latest_tweet_id(db: &SqlitePool, account_id: i64) -> Result<Option<i64>, FetchError> {
    sqlx::query_scalar(
        "SELECT twitter_id FROM twitter_tweet WHERE account_id = ?
        ORDER BY post_time DESC, twitter_id DESC LIMIT 1",
    )
    .bind(account_id)
    .fetch_optional(db)
    .await
    .context(error::StoreFailed {
        message: "cannot read latest tweet",
    })
}

pub async fn tweets_for_account(db: &SqlitePool, account_id: i64) -> Result<Vec<Tweet>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, account_id, twitter_id, title, permalink, summary, text, raw, is_private,
            language, favorite_count, retweet_count, in_reply_to_user_id, post_time, fetch_time
        FROM twitter_tweet WHERE account_id = ? ORDER BY post_time DESC",
    )
    .bind(account_id)
    .fetch_all(db)
    .await
}
