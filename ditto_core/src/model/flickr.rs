use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, FromRow)]
pub struct Photo {
    pub id: i64,
    pub account_id: i64,
    pub flickr_id: String,
    pub title: Option<String>,
    pub permalink: Option<String>,
    pub summary: Option<String>,
    pub raw: String,
    pub is_private: bool,
    pub license: Option<String>,
    pub view_count: Option<i64>,
    pub media: Option<String>,
    /// Flickr reports this without a zone; stored as if it were UTC.
    pub taken_time: Option<DateTime<Utc>>,
    pub post_time: Option<DateTime<Utc>>,
    pub fetch_time: DateTime<Utc>,
}
