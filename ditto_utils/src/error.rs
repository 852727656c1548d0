use snafu::Snafu;

/// Why a single API request did not produce a usable body.
///
/// The `Display` text is short enough to be shown to the user as-is.
#[derive(Snafu, Debug, Clone, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))]
pub enum RequestError {
    #[snafu(display("could not connect to {url}"))]
    Connection { url: String },

    #[snafu(display("request to {url} timed out"))]
    Timeout { url: String },

    #[snafu(display("too many redirects from {url}"))]
    TooManyRedirects { url: String },

    #[snafu(display("request failed: {message}"))]
    Request { message: String },

    #[snafu(display("HTTP status {status}"))]
    Status { status: u16, body: String },
}

impl RequestError {
    pub(crate) fn classify(err: reqwest::Error, url: &str) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            RequestError::Timeout { url }
        } else if err.is_connect() {
            RequestError::Connection { url }
        } else if err.is_redirect() {
            RequestError::TooManyRedirects { url }
        } else {
            RequestError::Request {
                message: err.to_string(),
            }
        }
    }
}
