use chrono::{DateTime, Utc};
use ditto_core::{
    normalize::{non_empty, parse_rfc3339, raw_json, split_tags, typed, yes_no},
    FetchError,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Post {
    href: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    extended: String,
    hash: String,
    time: String,
    #[serde(default = "yes")]
    shared: String,
    #[serde(default = "no")]
    toread: String,
    #[serde(default)]
    tags: String,
}

fn yes() -> String {
    "yes".to_string()
}

fn no() -> String {
    "no".to_string()
}

/// One bookmark, mapped to local fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookmarkData {
    pub url_hash: String,
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub raw: String,
    pub is_private: bool,
    pub is_to_read: bool,
    pub post_time: DateTime<Utc>,
    pub tags: Vec<String>,
}

pub fn bookmark(value: &Value) -> Result<BookmarkData, FetchError> {
    let post: Post = typed(value)?;
    if post.hash.is_empty() {
        return Err(FetchError::unknown_data(format!(
            "bookmark without hash: {}",
            post.href
        )));
    }
    Ok(BookmarkData {
        url_hash: post.hash,
        title: post.description,
        url: post.href,
        summary: non_empty(&post.extended),
        raw: raw_json(value),
        is_private: !yes_no(&post.shared)?,
        is_to_read: yes_no(&post.toread)?,
        post_time: parse_rfc3339(&post.time)?,
        tags: split_tags(&post.tags),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn maps_fields() {
        let value = json!({
            "href": "https://example.com/",
            "description": "Example",
            "extended": "",
            "meta": "abc",
            "hash": "h1",
            "time": "2024-03-01T10:00:00Z",
            "shared": "no",
            "toread": "yes",
            "tags": "web .later"
        });
        let b = bookmark(&value).unwrap();
        assert_eq!(b.url_hash, "h1");
        assert_eq!(b.title, "Example");
        assert_eq!(b.summary, None);
        assert!(b.is_private);
        assert!(b.is_to_read);
        assert_eq!(
            b.post_time,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(b.tags, vec!["web", ".later"]);
        assert_eq!(serde_json::from_str::<Value>(&b.raw).unwrap(), value);
    }

    #[test]
    fn rejects_bad_entries() {
        let no_hash = json!({"href": "https://a/", "hash": "", "time": "2024-03-01T10:00:00Z"});
        assert!(bookmark(&no_hash).is_err());
        let bad_flag = json!({
            "href": "https://a/", "hash": "h", "time": "2024-03-01T10:00:00Z", "shared": "maybe"
        });
        assert!(bookmark(&bad_flag).is_err());
    }
}
