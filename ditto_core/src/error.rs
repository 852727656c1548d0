use ditto_utils::RequestError;
use snafu::Snafu;

use crate::model::Service;

/// Failures that stop a whole invocation before any request is sent.
#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))]
pub enum Error {
    #[snafu(display("{message}"))]
    Usage { message: String },

    #[snafu(display("there is no {service} account named '{name}'"))]
    AccountNotFound { service: Service, name: String },

    #[snafu(display("the {service} account '{name}' is not active"))]
    AccountInactive { service: Service, name: String },

    #[snafu(display("there are no active {service} accounts"))]
    NoActiveAccounts { service: Service },

    #[snafu(display("{message}: {source}"))]
    Database {
        source: sqlx::Error,
        message: String,
    },

    #[snafu(display("database migration: {source}"))]
    Migrate { source: sqlx::migrate::MigrateError },

    #[snafu(display("config: {source}"))]
    Config { source: crate::config::Error },
}

impl Error {
    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage {
            message: message.into(),
        }
    }

    /// Errors caused by how the command was invoked rather than by the environment.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage { .. } | Error::AccountNotFound { .. })
    }
}

/// Why fetching one account failed. Never aborts the other accounts.
#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
#[snafu(context(suffix(false)))]
pub enum FetchError {
    #[snafu(display("{source}"))]
    Request { source: RequestError },

    #[snafu(display("{}", describe_api(*status, code.as_deref(), message)))]
    Api {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    #[snafu(display("unexpected data: {message}"))]
    UnknownData { message: String },

    #[snafu(display("account has no {what}"))]
    MissingCredentials { what: &'static str },

    #[snafu(display("{message}: {source}"))]
    StoreFailed {
        source: sqlx::Error,
        message: String,
    },
}

impl FetchError {
    pub fn unknown_data(message: impl Into<String>) -> Self {
        FetchError::UnknownData {
            message: message.into(),
        }
    }

    /// A non-2xx reply whose body holds the API's own error becomes `Api`,
    /// keeping the status; anything else stays a request error.
    pub fn from_request(
        err: RequestError,
        api_error: impl FnOnce(&str) -> Option<(Option<String>, String)>,
    ) -> Self {
        if let RequestError::Status { status, body } = &err {
            if let Some((code, message)) = api_error(body) {
                return FetchError::Api {
                    status: Some(*status),
                    code,
                    message,
                };
            }
        }
        FetchError::Request { source: err }
    }

    pub fn messages(&self) -> Vec<String> {
        vec![self.to_string()]
    }
}

fn describe_api(status: Option<u16>, code: Option<&str>, message: &str) -> String {
    match (status, code) {
        (Some(status), Some(code)) => format!("HTTP status {status}, error {code}: {message}"),
        (Some(status), None) => format!("HTTP status {status}: {message}"),
        (None, Some(code)) => format!("error {code}: {message}"),
        (None, None) => format!("error: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_messages_carry_codes() {
        let err = FetchError::Api {
            status: Some(403),
            code: Some("10".to_string()),
            message: "Invalid API key".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP status 403, error 10: Invalid API key");

        let err = FetchError::Api {
            status: None,
            code: Some("100".to_string()),
            message: "Invalid API Key".to_string(),
        };
        assert_eq!(err.messages(), vec!["error 100: Invalid API Key"]);
    }

    #[test]
    fn request_errors_pass_through() {
        let err = FetchError::Request {
            source: RequestError::Status {
                status: 500,
                body: "oops".to_string(),
            },
        };
        assert_eq!(err.to_string(), "HTTP status 500");
    }

    #[test]
    fn status_bodies_with_api_errors() {
        let parse = |body: &str| {
            body.strip_prefix("ERR ")
                .map(|m| (Some("7".to_string()), m.to_string()))
        };
        let err = FetchError::from_request(
            RequestError::Status {
                status: 403,
                body: "ERR no access".to_string(),
            },
            parse,
        );
        assert_eq!(err.to_string(), "HTTP status 403, error 7: no access");

        let err = FetchError::from_request(
            RequestError::Status {
                status: 502,
                body: "<html>".to_string(),
            },
            parse,
        );
        assert_eq!(err.to_string(), "HTTP status 502");

        let err = FetchError::from_request(
            RequestError::Timeout {
                url: "https://example.com".to_string(),
            },
            parse,
        );
        assert!(matches!(err, FetchError::Request { .. }));
    }

    #[test]
    fn usage_classification() {
        assert!(Error::usage("bad flags").is_usage());
        assert!(Error::AccountNotFound {
            service: Service::Pinboard,
            name: "phil".to_string()
        }
        .is_usage());
        assert!(!Error::NoActiveAccounts {
            service: Service::Lastfm
        }
        .is_usage());
    }
}
