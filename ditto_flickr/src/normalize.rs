use chrono::{DateTime, Utc};
use ditto_core::{
    normalize::{non_empty, parse_naive_utc, parse_unix, raw_json, split_tags, typed},
    FetchError,
};
use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default, rename = "_content")]
    content: String,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawPhoto {
    id: String,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    title: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    ispublic: u8,
    #[serde(default)]
    description: Content,
    #[serde(default)]
    license: String,
    #[serde(default)]
    dateupload: String,
    #[serde(default)]
    datetaken: String,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    views: Option<i64>,
    #[serde(default)]
    media: String,
    #[serde(default)]
    tags: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoData {
    pub flickr_id: String,
    pub title: Option<String>,
    pub permalink: String,
    pub summary: Option<String>,
    pub raw: String,
    pub is_private: bool,
    pub license: Option<String>,
    pub view_count: Option<i64>,
    pub media: Option<String>,
    pub taken_time: Option<DateTime<Utc>>,
    pub post_time: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// Map one `photo` entry. `user_id` stands in for a missing `owner`.
pub fn photo(value: &Value, user_id: &str) -> Result<PhotoData, FetchError> {
    let p: RawPhoto = typed(value)?;
    if p.id.is_empty() {
        return Err(FetchError::unknown_data(format!("photo without id: {value}")));
    }
    let owner = if p.owner.is_empty() { user_id } else { &p.owner };
    let post_time = match non_empty(&p.dateupload) {
        Some(s) => Some(parse_unix(&s)?),
        None => None,
    };
    let taken_time = match non_empty(&p.datetaken) {
        Some(s) => Some(parse_naive_utc(&s)?),
        None => None,
    };
    Ok(PhotoData {
        permalink: format!("https://www.flickr.com/photos/{owner}/{}/", p.id),
        flickr_id: p.id,
        title: non_empty(&p.title),
        summary: non_empty(&p.description.content),
        raw: raw_json(value),
        is_private: p.ispublic == 0,
        license: non_empty(&p.license),
        view_count: p.views,
        media: non_empty(&p.media),
        taken_time,
        post_time,
        tags: split_tags(&p.tags),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_photo() {
        let value = json!({
            "id": "5331", "owner": "35034348999@N01", "secret": "x", "server": "1",
            "farm": 1, "title": "Sunset", "ispublic": 1, "isfriend": 0, "isfamily": 0,
            "description": {"_content": "Over the sea"}, "license": "4",
            "dateupload": "1700000000", "datetaken": "2023-11-14 10:00:00",
            "datetakenunknown": "0", "views": "12", "media": "photo", "tags": "sea sky"
        });
        let p = photo(&value, "ignored").unwrap();
        assert_eq!(p.flickr_id, "5331");
        assert_eq!(p.permalink, "https://www.flickr.com/photos/35034348999@N01/5331/");
        assert_eq!(p.summary.as_deref(), Some("Over the sea"));
        assert!(!p.is_private);
        assert_eq!(p.view_count, Some(12));
        assert_eq!(p.post_time.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(p.taken_time.unwrap().to_rfc3339(), "2023-11-14T10:00:00+00:00");
        assert_eq!(p.tags, vec!["sea", "sky"]);
    }

    #[test]
    fn private_and_sparse() {
        let value = json!({"id": "9", "title": "", "ispublic": "0"});
        let p = photo(&value, "me@N01").unwrap();
        assert!(p.is_private);
        assert_eq!(p.title, None);
        assert_eq!(p.permalink, "https://www.flickr.com/photos/me@N01/9/");
        assert_eq!(p.post_time, None);
        assert!(p.tags.is_empty());
    }
}
