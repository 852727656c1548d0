use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, FromRow)]
pub struct Bookmark {
    pub id: i64,
    pub account_id: i64,
    /// Pinboard's hash of the bookmarked URL; unique per account.
    pub url_hash: String,
    pub url: String,
    pub title: Option<String>,
    pub permalink: Option<String>,
    pub summary: Option<String>,
    pub raw: String,
    pub is_private: bool,
    pub is_to_read: bool,
    pub post_time: Option<DateTime<Utc>>,
    pub fetch_time: DateTime<Utc>,
}
