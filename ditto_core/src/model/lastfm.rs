use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, FromRow)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub mbid: Option<String>,
    pub permalink: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, FromRow)]
pub struct Album {
    pub id: i64,
    pub artist_id: i64,
    pub name: String,
    pub mbid: Option<String>,
    pub permalink: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, FromRow)]
pub struct Track {
    pub id: i64,
    pub artist_id: i64,
    pub name: String,
    pub mbid: Option<String>,
    pub permalink: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, FromRow)]
pub struct Scrobble {
    pub id: i64,
    pub account_id: i64,
    pub artist_id: i64,
    pub track_id: i64,
    pub album_id: Option<i64>,
    pub title: Option<String>,
    pub permalink: Option<String>,
    pub summary: Option<String>,
    pub raw: String,
    pub is_private: bool,
    pub post_time: DateTime<Utc>,
    pub fetch_time: DateTime<Utc>,
}
