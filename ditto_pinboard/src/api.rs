use chrono::{DateTime, NaiveDate, Utc};
use ditto_core::{normalize::parse_json, FetchError};
use ditto_utils::{http::ApiRequest, RequestError};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.pinboard.in/v1";
/// Pinboard asks for at least three seconds between calls.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_secs(3);
/// `posts/recent` returns at most this many bookmarks.
pub const MAX_RECENT: u32 = 100;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Recent(u32),
    All {
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    },
    Date(NaiveDate),
}

pub fn request(api_url: &str, auth_token: &str, endpoint: &Endpoint) -> ApiRequest {
    let path = match endpoint {
        Endpoint::Recent(_) => "posts/recent",
        Endpoint::All { .. } => "posts/all",
        Endpoint::Date(_) => "posts/get",
    };
    let mut req = ApiRequest::new(format!("{api_url}/{path}"))
        .param("auth_token", auth_token)
        .param("format", "json");
    match endpoint {
        Endpoint::Recent(count) => req = req.param("count", count),
        Endpoint::All { from, to } => {
            if let Some(from) = from {
                req = req.param("fromdt", from.format(TIME_FORMAT));
            }
            if let Some(to) = to {
                req = req.param("todt", to.format(TIME_FORMAT));
            }
        }
        Endpoint::Date(day) => req = req.param("dt", day.format("%Y-%m-%d")),
    }
    req
}

/// The raw post entries of a response.
///
/// `posts/all` answers with a bare array, the other endpoints wrap it in an object.
pub fn parse_posts(body: &str) -> Result<Vec<Value>, FetchError> {
    match parse_json(body)? {
        Value::Array(posts) => Ok(posts),
        Value::Object(mut obj) => match obj.remove("posts") {
            Some(Value::Array(posts)) => Ok(posts),
            _ => match api_error(&Value::Object(obj)) {
                Some((code, message)) => Err(FetchError::Api {
                    status: None,
                    code,
                    message,
                }),
                None => Err(FetchError::unknown_data("no posts in pinboard response")),
            },
        },
        _ => Err(FetchError::unknown_data("unexpected pinboard response")),
    }
}

fn api_error(value: &Value) -> Option<(Option<String>, String)> {
    let code = value.get("result_code")?.as_str()?;
    if code == "done" {
        return None;
    }
    Some((None, code.to_string()))
}

pub fn request_error(err: RequestError) -> FetchError {
    FetchError::from_request(err, |body| {
        parse_json(body).ok().and_then(|v| api_error(&v))
    })
}
