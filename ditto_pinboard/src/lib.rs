use async_trait::async_trait;
use chrono::Utc;
use ditto_core::{
    config::{ApiSettings, Config},
    fetcher::latest_post_time,
    model::{Account, Service},
    outcome::Noun,
    scope::FetchScope,
    FetchError, Fetcher,
};
use ditto_utils::{http::Transport, try_skip};
use log::{debug, info};
use sqlx::SqlitePool;
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Instant,
};

pub mod api;
pub mod database;
pub mod normalize;

use api::Endpoint;

pub const NOUN: Noun = Noun::new("bookmark", "bookmarks");

pub struct PinboardFetcher {
    db: SqlitePool,
    transport: Arc<dyn Transport>,
    settings: ApiSettings,
    /// When the previous call went out, across every account of a run.
    last_request: Mutex<Option<Instant>>,
}

impl PinboardFetcher {
    pub fn new(db: SqlitePool, transport: Arc<dyn Transport>, settings: ApiSettings) -> Self {
        Self {
            db,
            transport,
            settings,
            last_request: Mutex::new(None),
        }
    }

    pub fn from_config(db: SqlitePool, transport: Arc<dyn Transport>, config: &Config) -> Self {
        let settings = ApiSettings::from_config(
            &config.pinboard,
            api::DEFAULT_API_URL,
            api::DEFAULT_REQUEST_INTERVAL,
        );
        Self::new(db, transport, settings)
    }

    /// Wait until `request_interval` has passed since the previous call.
    async fn pace(&self) {
        let last = *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let wait = last
            .map(|at| self.settings.request_interval.saturating_sub(at.elapsed()))
            .unwrap_or_default();
        if !wait.is_zero() {
            debug!("pinboard: waiting {:?} before the next call", wait);
            tokio::time::sleep(wait).await;
        }
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    async fn endpoint(&self, account: &Account, scope: &FetchScope) -> Result<Endpoint, FetchError> {
        Ok(match scope {
            FetchScope::Recent(n) => Endpoint::Recent(*n),
            FetchScope::All => Endpoint::All {
                from: None,
                to: None,
            },
            FetchScope::Days(_) | FetchScope::Range { .. } => {
                let (from, to) = scope.time_bounds(Utc::now());
                Endpoint::All { from, to }
            }
            FetchScope::Date(day) => Endpoint::Date(*day),
            FetchScope::SinceLast => Endpoint::All {
                from: latest_post_time(&self.db, database::TABLE, account.id).await?,
                to: None,
            },
        })
    }
}

#[async_trait]
impl Fetcher for PinboardFetcher {
    fn service(&self) -> Service {
        Service::Pinboard
    }

    fn noun(&self) -> Noun {
        NOUN
    }

    fn supports(&self, scope: &FetchScope) -> bool {
        match scope {
            FetchScope::Recent(n) => *n <= api::MAX_RECENT,
            _ => true,
        }
    }

    async fn fetch(&self, account: &Account, scope: &FetchScope) -> Result<usize, FetchError> {
        let token = account
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingCredentials { what: "API token" })?;
        let endpoint = self.endpoint(account, scope).await?;
        info!("pinboard: requesting {:?} for {}", endpoint, account);

        self.pace().await;
        let body = self
            .transport
            .get(&api::request(&self.settings.api_url, token, &endpoint))
            .await
            .map_err(api::request_error)?;
        let posts = api::parse_posts(&body)?;

        let mut bookmarks = Vec::with_capacity(posts.len());
        for post in &posts {
            bookmarks.push(try_skip!(normalize::bookmark(post)));
        }
        database::save_bookmarks(&self.db, account.id, &bookmarks, Utc::now()).await?;
        Ok(bookmarks.len())
    }
}
