use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use crate::{error, error::RequestError};

pub type Result<T> = std::result::Result<T, RequestError>;

/// One GET request against a remote API.
///
/// The URL never carries credentials; keys and tokens travel in `query` or
/// `bearer_token` so that error messages built from the URL are safe to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer_token: Option<String>,
}

impl ApiRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            bearer_token: None,
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Sends a request and hands back the body of a 2xx response.
///
/// Exactly one attempt is made per call.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &ApiRequest) -> Result<String>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &ApiRequest) -> Result<String> {
        debug!("GET {} {:?}", request.url, query_keys(request));
        let mut builder = self.client.get(&request.url).query(&request.query);
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| RequestError::classify(e, &request.url))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RequestError::classify(e, &request.url))?;
        if !status.is_success() {
            return error::Status {
                status: status.as_u16(),
                body,
            }
            .fail();
        }
        Ok(body)
    }
}

// Keys only: values may hold tokens.
fn query_keys(request: &ApiRequest) -> Vec<&str> {
    request.query.iter().map(|(k, _)| k.as_str()).collect()
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use super::*;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    type Handler = Box<dyn Fn(&ApiRequest) -> Result<String> + Send + Sync>;

    /// Answers requests from a closure and remembers every request it saw.
    pub struct MockTransport {
        handler: Handler,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl MockTransport {
        pub fn new(handler: impl Fn(&ApiRequest) -> Result<String> + Send + Sync + 'static) -> Self {
            Self {
                handler: Box::new(handler),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> MutexGuard<'_, Vec<ApiRequest>> {
            self.requests.lock().unwrap_or_else(PoisonError::into_inner)
        }

        pub fn requests(&self) -> Vec<ApiRequest> {
            self.seen().clone()
        }

        pub fn request_count(&self) -> usize {
            self.seen().len()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn get(&self, request: &ApiRequest) -> Result<String> {
            self.seen().push(request.clone());
            (self.handler)(request)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_query() {
        let req = ApiRequest::new("https://example.com/api")
            .param("page", 2)
            .param("format", "json")
            .bearer("secret");
        assert_eq!(req.query_value("page"), Some("2"));
        assert_eq!(req.query_value("format"), Some("json"));
        assert_eq!(req.query_value("missing"), None);
        assert_eq!(req.bearer_token.as_deref(), Some("secret"));
        assert_eq!(query_keys(&req), vec!["page", "format"]);
    }

    #[tokio::test]
    async fn mock_records_requests() {
        let mock = MockTransport::new(|req| match req.query_value("page") {
            Some("1") => Ok("first".to_string()),
            _ => Err(RequestError::Status {
                status: 500,
                body: String::new(),
            }),
        });
        let first = ApiRequest::new("https://example.com").param("page", 1);
        let second = ApiRequest::new("https://example.com").param("page", 2);

        assert_eq!(mock.get(&first).await.unwrap(), "first");
        let err = mock.get(&second).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP status 500");
        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.requests()[1], second);
    }

    #[test]
    fn error_messages() {
        let url = "https://api.example.com/v1".to_string();
        assert_eq!(
            RequestError::Connection { url: url.clone() }.to_string(),
            "could not connect to https://api.example.com/v1"
        );
        assert_eq!(
            RequestError::Timeout { url: url.clone() }.to_string(),
            "request to https://api.example.com/v1 timed out"
        );
        assert_eq!(
            RequestError::TooManyRedirects { url }.to_string(),
            "too many redirects from https://api.example.com/v1"
        );
    }
}
