use async_trait::async_trait;
use chrono::{Duration, Utc};
use ditto_core::{
    config::{ApiSettings, Config},
    fetcher::latest_post_time,
    model::{Account, Service},
    outcome::Noun,
    scope::FetchScope,
    FetchError, Fetcher,
};
use ditto_utils::{http::Transport, limit_reached, try_skip};
use log::{debug, info};
use sqlx::SqlitePool;
use std::sync::Arc;

pub mod api;
pub mod database;
pub mod normalize;

use api::Window;

pub const NOUN: Noun = Noun::new("scrobble", "scrobbles");

pub struct LastfmFetcher {
    db: SqlitePool,
    transport: Arc<dyn Transport>,
    settings: ApiSettings,
}

impl LastfmFetcher {
    pub fn new(db: SqlitePool, transport: Arc<dyn Transport>, settings: ApiSettings) -> Self {
        Self {
            db,
            transport,
            settings,
        }
    }

    pub fn from_config(db: SqlitePool, transport: Arc<dyn Transport>, config: &Config) -> Self {
        let settings = ApiSettings::from_config(
            &config.lastfm,
            api::DEFAULT_API_URL,
            api::DEFAULT_REQUEST_INTERVAL,
        );
        Self::new(db, transport, settings)
    }

    async fn window(&self, account: &Account, scope: &FetchScope) -> Result<Window, FetchError> {
        if let FetchScope::SinceLast = scope {
            let latest = latest_post_time(&self.db, database::TABLE, account.id).await?;
            return Ok(Window {
                from: latest.map(|t| t + Duration::seconds(1)),
                to: None,
            });
        }
        let (from, to) = scope.time_bounds(Utc::now());
        Ok(Window { from, to })
    }
}

#[async_trait]
impl Fetcher for LastfmFetcher {
    fn service(&self) -> Service {
        Service::Lastfm
    }

    fn noun(&self) -> Noun {
        NOUN
    }

    fn supports(&self, scope: &FetchScope) -> bool {
        !matches!(scope, FetchScope::Date(_))
    }

    async fn fetch(&self, account: &Account, scope: &FetchScope) -> Result<usize, FetchError> {
        let api_key = account
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingCredentials { what: "API key" })?;
        let user = account.remote_id.as_deref().unwrap_or(&account.username);
        let window = self.window(account, scope).await?;
        let limit = match scope {
            FetchScope::Recent(n) => Some(*n as usize),
            _ => None,
        };
        let page_size = limit.map_or(api::MAX_PAGE_SIZE, |n| n.min(api::MAX_PAGE_SIZE as usize) as u32);

        let mut fetched = 0;
        let mut page = 1;
        let mut total_pages = 1;
        loop {
            if page > 1 {
                tokio::time::sleep(self.settings.request_interval).await;
            }
            let req = api::recent_tracks(&self.settings.api_url, api_key, user, page_size, page, &window);
            let body = self.transport.get(&req).await.map_err(api::request_error)?;
            let parsed = api::parse_page(&body)?;
            if page == 1 {
                total_pages = parsed.total_pages;
                info!("lastfm: {} has {} scrobbles in {} pages", account, parsed.total, total_pages);
            }

            let mut scrobbles = Vec::with_capacity(parsed.tracks.len());
            for track in &parsed.tracks {
                if limit_reached(limit, fetched + scrobbles.len()) {
                    break;
                }
                if let Some(s) = try_skip!(normalize::scrobble(track)) {
                    scrobbles.push(s);
                }
            }
            database::save_scrobbles(&self.db, account.id, &scrobbles, Utc::now()).await?;
            fetched += scrobbles.len();
            debug!("lastfm: page {}/{} for {}: {} scrobbles", page, total_pages, account, scrobbles.len());

            if page >= total_pages || limit_reached(limit, fetched) {
                break;
            }
            page += 1;
        }
        Ok(fetched)
    }
}
