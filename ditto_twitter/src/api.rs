use chrono::{DateTime, Utc};
use ditto_core::{normalize::parse_json, FetchError};
use ditto_utils::{http::ApiRequest, RequestError};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.twitter.com/2";
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_secs(1);
pub const MIN_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 100;

const TWEET_FIELDS: &str = "created_at,lang,public_metrics,in_reply_to_user_id,author_id";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    pub since_id: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

pub fn user_tweets(
    api_url: &str,
    bearer_token: &str,
    user_id: &str,
    max_results: u32,
    query: &Query,
    pagination_token: Option<&str>,
) -> ApiRequest {
    let mut req = ApiRequest::new(format!("{api_url}/users/{user_id}/tweets"))
        .bearer(bearer_token)
        .param("max_results", max_results.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE))
        .param("tweet.fields", TWEET_FIELDS)
        .param("expansions", "author_id")
        .param("user.fields", "protected,username");
    if let Some(since_id) = query.since_id {
        req = req.param("since_id", since_id);
    }
    if let Some(start) = query.start_time {
        req = req.param("start_time", start.format(TIME_FORMAT));
    }
    if let Some(end) = query.end_time {
        req = req.param("end_time", end.format(TIME_FORMAT));
    }
    if let Some(token) = pagination_token {
        req = req.param("pagination_token", token);
    }
    req
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub protected: bool,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    includes: Includes,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug)]
pub struct Page {
    pub tweets: Vec<Value>,
    pub users: Vec<User>,
    pub next_token: Option<String>,
}

pub fn parse_page(body: &str) -> Result<Page, FetchError> {
    let value = parse_json(body)?;
    let has_data = value.get("data").is_some();
    if !has_data {
        if let Some((code, message)) = api_error(&value) {
            return Err(FetchError::Api {
                status: None,
                code,
                message,
            });
        }
    }
    let body: Body = serde_json::from_value(value)
        .map_err(|e| FetchError::unknown_data(format!("twitter page: {e}")))?;
    Ok(Page {
        tweets: body.data,
        users: body.includes.users,
        next_token: body.meta.next_token,
    })
}

/// Either a problem document (`title`, `detail`) or an `errors` list.
fn api_error(value: &Value) -> Option<(Option<String>, String)> {
    let str_of = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(str::to_string);
    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        let messages: Vec<String> = errors
            .iter()
            .filter_map(|e| str_of(e, "detail").or_else(|| str_of(e, "message")))
            .collect();
        if !messages.is_empty() {
            let code = errors.first().and_then(|e| str_of(e, "title"));
            return Some((code, messages.join("; ")));
        }
    }
    let title = str_of(value, "title")?;
    let message = str_of(value, "detail").unwrap_or_else(|| title.clone());
    Some((Some(title), message))
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
        let query = Query {
            since_id: Some(42),
            start_time: Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
            end_time: None,
        };
        let req = user_tweets(DEFAULT_API_URL, "BEARER", "12", 2, &query, Some("tok"));
        assert_eq!(req.url, "https://api.twitter.com/2/users/12/tweets");
        assert_eq!(req.bearer_token.as_deref(), Some("BEARER"));
        assert_eq!(req.query_value("max_results"), Some("5"));
        assert_eq!(req.query_value("since_id"), Some("42"));
        assert_eq!(req.query_value("start_time"), Some("2024-01-02T00:00:00Z"));
        assert_eq!(req.query_value("end_time"), None);
        assert_eq!(req.query_value("pagination_token"), Some("tok"));

        let req = user_tweets(DEFAULT_API_URL, "B", "12", 500, &Query::default(), None);
        assert_eq!(req.query_value("max_results"), Some("100"));
        assert_eq!(req.query_value("pagination_token"), None);
    }

    #[test]
    fn empty_and_paged() {
        let page = parse_page(r#"{"meta": {"result_count": 0}}"#).unwrap();
        assert!(page.tweets.is_empty());
        assert_eq!(page.next_token, None);

        let page = parse_page(
            r#"{"data": [{"id": "1", "text": "hi"}],
                "includes": {"users": [{"id": "9", "username": "ann", "protected": true}]},
                "meta": {"result_count": 1, "next_token": "n1"}}"#,
        )
        .unwrap();
        assert_eq!(page.tweets.len(), 1);
        assert!(page.users[0].protected);
        assert_eq!(page.next_token.as_deref(), Some("n1"));
    }

    #[test]
    fn error_documents() {
        let err = request_error(RequestError::Status {
            status: 401,
            body: r#"{"title": "Unauthorized", "type": "about:blank", "status": 401, "detail": "Unauthorized"}"#
                .to_string(),
        });
        assert_eq!(err.to_string(), "HTTP status 401, error Unauthorized: Unauthorized");

        let err = parse_page(
            r#"{"errors": [{"title": "Not Found Error", "detail": "Could not find user with id: [1]."}]}"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "error Not Found Error: Could not find user with id: [1]."
        );
    }
}
