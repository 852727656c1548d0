use chrono::{DateTime, Utc};
use ditto_core::{normalize::parse_json, FetchError};
use ditto_utils::{http::ApiRequest, RequestError};
use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.flickr.com/services/rest";
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(500);
pub const MAX_PAGE_SIZE: u32 = 500;

/// Extra photo fields requested with every page.
const EXTRAS: &str = "description,license,date_upload,date_taken,views,media,tags";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadWindow {
    pub min: Option<DateTime<Utc>>,
    /// Inclusive.
    pub max: Option<DateTime<Utc>>,
}

pub fn get_photos(
    api_url: &str,
    api_key: &str,
    user_id: &str,
    per_page: u32,
    page: u32,
    window: &UploadWindow,
) -> ApiRequest {
    let mut req = ApiRequest::new(format!("{api_url}/"))
        .param("method", "flickr.people.getPhotos")
        .param("api_key", api_key)
        .param("user_id", user_id)
        .param("format", "json")
        .param("nojsoncallback", 1)
        .param("extras", EXTRAS)
        .param("per_page", per_page.min(MAX_PAGE_SIZE))
        .param("page", page);
    if let Some(min) = window.min {
        req = req.param("min_upload_date", min.timestamp());
    }
    if let Some(max) = window.max {
        req = req.param("max_upload_date", max.timestamp());
    }
    req
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct Photos {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    page: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pages: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    total: u64,
    #[serde(default)]
    photo: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Body {
    photos: Photos,
}

#[derive(Debug)]
pub struct Page {
    pub page: u32,
    pub pages: u32,
    pub total: u64,
    pub photos: Vec<Value>,
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
        .map_err(|e| FetchError::unknown_data(format!("flickr page: {e}")))?;
    let Photos {
        page,
        pages,
        total,
        photo,
    } = body.photos;
    Ok(Page {
        page,
        pages,
        total,
        photos: photo,
    })
}

/// `{"stat": "fail", "code": 1, "message": "User not found"}`
fn api_error(value: &Value) -> Option<(Option<String>, String)> {
    if value.get("stat")?.as_str()? != "fail" {
        return None;
    }
    let code = value.get("code").map(|c| match c {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Some((code, message))
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
        let window = UploadWindow {
            min: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            max: Some(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap()),
        };
        let req = get_photos(DEFAULT_API_URL, "KEY", "35034348999@N01", 1000, 2, &window);
        assert_eq!(req.url, "https://api.flickr.com/services/rest/");
        assert_eq!(req.query_value("method"), Some("flickr.people.getPhotos"));
        assert_eq!(req.query_value("user_id"), Some("35034348999@N01"));
        assert_eq!(req.query_value("nojsoncallback"), Some("1"));
        assert_eq!(req.query_value("per_page"), Some("500"));
        assert_eq!(req.query_value("page"), Some("2"));
        assert_eq!(req.query_value("min_upload_date"), Some("1704067200"));
        assert_eq!(req.query_value("max_upload_date"), Some("1706745599"));
    }

    #[test]
    fn pages() {
        let page = parse_page(
            r#"{"photos": {"page": 1, "pages": "3", "perpage": 100, "total": "250",
                "photo": [{"id": "1"}]}, "stat": "ok"}"#,
        )
        .unwrap();
        assert_eq!((page.page, page.pages, page.total), (1, 3, 250));
        assert_eq!(page.photos.len(), 1);
    }

    #[test]
    fn failures() {
        let err = parse_page(r#"{"stat": "fail", "code": 100, "message": "Invalid API Key"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "error 100: Invalid API Key");
        assert!(parse_page(r#"{"stat": "ok"}"#).is_err());
    }
}
