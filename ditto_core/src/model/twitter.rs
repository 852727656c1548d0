use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, FromRow)]
pub struct Tweet {
    pub id: i64,
    pub account_id: i64,
    pub twitter_id: i64,
    pub title: Option<String>,
    pub permalink: Option<String>,
    pub summary: Option<String>,
    pub text: String,
    pub raw: String,
    pub is_private: bool,
    pub language: Option<String>,
    pub favorite_count: i64,
    pub retweet_count: i64,
    pub in_reply_to_user_id: Option<String>,
    pub post_time: Option<DateTime<Utc>>,
    pub fetch_time: DateTime<Utc>,
}
