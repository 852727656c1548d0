use chrono::{DateTime, Utc};
use ditto_core::{normalize::parse_json, FetchError};
use ditto_utils::{http::ApiRequest, RequestError};
use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://ws.audioscrobbler.com/2.0";
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(500);
/// Largest page `user.getrecenttracks` serves.
pub const MAX_PAGE_SIZE: u32 = 200;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Window {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub fn recent_tracks(
    api_url: &str,
    api_key: &str,
    user: &str,
    limit: u32,
    page: u32,
    window: &Window,
) -> ApiRequest {
    let mut req = ApiRequest::new(format!("{api_url}/"))
        .param("method", "user.getrecenttracks")
        .param("api_key", api_key)
        .param("user", user)
        .param("format", "json")
        .param("limit", limit.min(MAX_PAGE_SIZE))
        .param("page", page);
    if let Some(from) = window.from {
        req = req.param("from", from.timestamp());
    }
    if let Some(to) = window.to {
        req = req.param("to", to.timestamp());
    }
    req
}

/// A field that holds a single object when there is one result, else an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Value>),
    One(Value),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl From<OneOrMany> for Vec<Value> {
    fn from(v: OneOrMany) -> Self {
        match v {
            OneOrMany::Many(v) => v,
            OneOrMany::One(v) => vec![v],
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct PageAttr {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    page: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(rename = "totalPages")]
    total_pages: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct RecentTracks {
    #[serde(default)]
    track: OneOrMany,
    #[serde(rename = "@attr")]
    attr: PageAttr,
}

#[derive(Debug, Deserialize)]
struct Body {
    recenttracks: RecentTracks,
}

/// One page of `user.getrecenttracks`.
#[derive(Debug)]
pub struct Page {
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
    pub tracks: Vec<Value>,
}

pub fn parse_page(body: &str) -> Result<Page, FetchError> {
    let value = parse_json(body)?;
    if let Some((code, message)) = api_error(&value) {
        return Err(FetchError::Api {
            status: None,
            code,
            message,
        });
    }
    let body: Body = serde_json::from_value(value)
        .map_err(|e| FetchError::unknown_data(format!("last.fm page: {e}")))?;
    let RecentTracks { track, attr } = body.recenttracks;
    Ok(Page {
        page: attr.page,
        total_pages: attr.total_pages,
        total: attr.total,
        tracks: track.into(),
    })
}

fn api_error(value: &Value) -> Option<(Option<String>, String)> {
    let code = value.get("error")?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let code = match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some((Some(code), message))
}

pub fn request_error(err: RequestError) -> FetchError {
    FetchError::from_request(err, |body| {
        parse_json(body).ok().and_then(|v| api_error(&v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn request_params() {
        let window = Window {
            from: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            to: None,
        };
        let req = recent_tracks(DEFAULT_API_URL, "KEY", "ann", 500, 3, &window);
        assert_eq!(req.url, "https://ws.audioscrobbler.com/2.0/");
        assert_eq!(req.query_value("method"), Some("user.getrecenttracks"));
        assert_eq!(req.query_value("limit"), Some("200"));
        assert_eq!(req.query_value("page"), Some("3"));
        assert_eq!(req.query_value("from"), Some("1704067200"));
        assert_eq!(req.query_value("to"), None);
    }

    #[test]
    fn page_attrs_as_strings_or_numbers() {
        let page = parse_page(
            r#"{"recenttracks": {"track": [{"name": "a"}, {"name": "b"}],
                "@attr": {"user": "ann", "page": "2", "totalPages": "7", "total": "1300"}}}"#,
        )
        .unwrap();
        assert_eq!((page.page, page.total_pages, page.total), (2, 7, 1300));
        assert_eq!(page.tracks.len(), 2);

        let page = parse_page(
            r#"{"recenttracks": {"track": {"name": "a"},
                "@attr": {"page": 1, "totalPages": 1, "total": 1}}}"#,
        )
        .unwrap();
        assert_eq!(page.tracks.len(), 1);
    }

    #[test]
    fn api_errors() {
        let err = parse_page(r#"{"error": 10, "message": "Invalid API key"}"#).unwrap_err();
        assert_eq!(err.to_string(), "error 10: Invalid API key");

        let err = request_error(RequestError::Status {
            status: 404,
            body: r#"{"error": 6, "message": "User not found"}"#.to_string(),
        });
        assert_eq!(err.to_string(), "HTTP status 404, error 6: User not found");
    }
}
