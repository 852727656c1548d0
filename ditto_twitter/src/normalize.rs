use chrono::{DateTime, Utc};
use ditto_core::{
    normalize::{parse_rfc3339, raw_json, typed},
    FetchError,
};
use ditto_utils::truncate_chars;
use serde::Deserialize;
use serde_json::Value;

use crate::api::User;

const TITLE_LENGTH: usize = 50;

#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    retweet_count: i64,
    #[serde(default)]
    like_count: i64,
}

#[derive(Debug, Deserialize)]
struct RawTweet {
    id: String,
    text: String,
    created_at: Option<String>,
    lang: Option<String>,
    author_id: Option<String>,
    in_reply_to_user_id: Option<String>,
    #[serde(default)]
    public_metrics: PublicMetrics,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TweetData {
    pub twitter_id: i64,
    pub title: String,
    pub permalink: String,
    pub text: String,
    pub raw: String,
    pub is_private: bool,
    pub language: Option<String>,
    pub favorite_count: i64,
    pub retweet_count: i64,
    pub in_reply_to_user_id: Option<String>,
    pub post_time: Option<DateTime<Utc>>,
}

/// Map one tweet. The author comes from the page's expanded users; when it is
/// missing, `fallback_username` is used and the tweet counts as public.
pub fn tweet(value: &Value, users: &[User], fallback_username: &str) -> Result<TweetData, FetchError> {
    let t: RawTweet = typed(value)?;
    let twitter_id: i64 = t
        .id
        .parse()
        .map_err(|_| FetchError::unknown_data(format!("invalid tweet id {:?}", t.id)))?;
    let author = t
        .author_id
        .as_deref()
        .and_then(|id| users.iter().find(|u| u.id == id));
    let username = author
        .map(|u| u.username.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback_username);
    let post_time = match &t.created_at {
        Some(s) => Some(parse_rfc3339(s)?),
        None => None,
    };
    Ok(TweetData {
        twitter_id,
        title: truncate_chars(&t.text, TITLE_LENGTH),
        permalink: format!("https://twitter.com/{username}/status/{twitter_id}"),
        raw: raw_json(value),
        is_private: author.map_or(false, |u| u.protected),
        language: t.lang,
        favorite_count: t.public_metrics.like_count,
        retweet_count: t.public_metrics.retweet_count,
        in_reply_to_user_id: t.in_reply_to_user_id,
        post_time,
        text: t.text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> Vec<User> {
        vec![User {
            id: "9".to_string(),
            username: "ann".to_string(),
            protected: true,
        }]
    }

    #[test]
    fn maps_tweet() {
        let value = json!({
            "id": "1460323737035677698",
            "text": "A fairly long tweet that certainly goes past the fifty character title limit",
            "created_at": "2021-11-15T19:08:05.000Z",
            "lang": "en",
            "author_id": "9",
            "public_metrics": {"retweet_count": 2, "reply_count": 0, "like_count": 7, "quote_count": 0}
        });
        let t = tweet(&value, &users(), "fallback").unwrap();
        assert_eq!(t.twitter_id, 1460323737035677698);
        assert_eq!(t.title.chars().count(), 50);
        assert!(t.title.ends_with('…'));
        assert_eq!(t.permalink, "https://twitter.com/ann/status/1460323737035677698");
        assert!(t.is_private);
        assert_eq!((t.favorite_count, t.retweet_count), (7, 2));
        assert_eq!(t.post_time.unwrap().to_rfc3339(), "2021-11-15T19:08:05+00:00");
    }

    #[test]
    fn unknown_author_and_bad_id() {
        let value = json!({"id": "5", "text": "hi"});
        let t = tweet(&value, &users(), "me").unwrap();
        assert_eq!(t.permalink, "https://twitter.com/me/status/5");
        assert!(!t.is_private);
        assert_eq!(t.title, "hi");

        assert!(tweet(&json!({"id": "x", "text": "hi"}), &[], "me").is_err());
    }
}
