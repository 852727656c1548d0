use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use snafu::{ResultExt, Snafu};
use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("json error in file: {source}"))]
    Json { source: serde_json::Error },

    #[snafu(display("io error with file: {source}"))]
    Io { source: std::io::Error },

    #[snafu(display("try to save without path"))]
    PathNotSet,

    #[snafu(display("cannot parse proxy from: {source}"))]
    ProxyParse { source: reqwest::Error },

    #[snafu(display("cannot build http client: {source}"))]
    HttpClient { source: reqwest::Error },
}
type Result<T> = std::result::Result<T, Error>;

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    config_path: Option<PathBuf>,

    pub database_url: String,
    pub proxy_all: String,
    /// Zero keeps the http client's default.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub request_timeout: Duration,
    pub pinboard: ServiceConfig,
    pub flickr: ServiceConfig,
    pub lastfm: ServiceConfig,
    pub twitter: ServiceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            database_url: format!(
                "sqlite://{}",
                dirs::home_dir()
                    .unwrap_or_default()
                    .join(".ditto")
                    .join("ditto.db")
                    .to_string_lossy()
            ),
            proxy_all: "".to_string(),
            request_timeout: Duration::ZERO,
            pinboard: ServiceConfig::default(),
            flickr: ServiceConfig::default(),
            lastfm: ServiceConfig::default(),
            twitter: ServiceConfig::default(),
        }
    }
}

/// Per-service overrides. Empty values fall back to the service's defaults.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    pub api_url: String,
    pub proxy: String,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub request_interval: Option<Duration>,
}

/// Where a fetcher sends its requests and how long it waits between pages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiSettings {
    pub api_url: String,
    pub request_interval: Duration,
}

impl ApiSettings {
    pub fn new(api_url: impl Into<String>, request_interval: Duration) -> Self {
        Self {
            api_url: api_url.into(),
            request_interval,
        }
    }

    pub fn from_config(
        service: &ServiceConfig,
        default_url: &str,
        default_interval: Duration,
    ) -> Self {
        let api_url = if service.api_url.is_empty() {
            default_url
        } else {
            &service.api_url
        };
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            request_interval: service.request_interval.unwrap_or(default_interval),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            info!("creating config file: {}", path.to_string_lossy());
            let defaults = Config {
                config_path: Some(path.to_owned()),
                ..Default::default()
            };

            defaults.save()?;
            Ok(defaults)
        } else {
            let file = File::open(path).context(IoSnafu)?;
            let mut config_loaded: Config = serde_json::from_reader(file).context(JsonSnafu)?;
            config_loaded.config_path = Some(PathBuf::from(path));
            config_loaded.save()?;
            Ok(config_loaded)
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| PathNotSetSnafu.build())?;
        if let Some(p) = path.parent() {
            std::fs::create_dir_all(p).context(IoSnafu)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .context(IoSnafu)?;
        serde_json::to_writer_pretty(file, &self).context(JsonSnafu)
    }

    pub fn proxy(&self, url: &str) -> Result<Option<reqwest::Proxy>> {
        use reqwest::Proxy;
        if !url.is_empty() {
            Ok(Some(Proxy::all(url).context(ProxyParseSnafu)?))
        } else if !self.proxy_all.is_empty() {
            Ok(Some(Proxy::all(&self.proxy_all).context(ProxyParseSnafu)?))
        } else {
            Ok(None)
        }
    }

    /// Build the http client used for one service's API.
    pub fn http_client(&self, service: &ServiceConfig) -> Result<reqwest::Client> {
        let mut builder = reqwest::ClientBuilder::new().user_agent(concat!(
            "ditto/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(proxy) = self.proxy(&service.proxy)? {
            debug!("api proxy set: {:?}", proxy);
            builder = builder.proxy(proxy);
        }
        if !self.request_timeout.is_zero() {
            builder = builder.timeout(self.request_timeout);
        }
        builder.build().context(HttpClientSnafu)
    }
}
