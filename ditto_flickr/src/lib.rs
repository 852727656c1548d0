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
use ditto_utils::{http::Transport, try_skip};
use log::{debug, info};
use sqlx::SqlitePool;
use std::sync::Arc;

pub mod api;
pub mod database;
pub mod normalize;

use api::UploadWindow;

pub const NOUN: Noun = Noun::new("photo", "photos");

pub struct FlickrFetcher {
    db: SqlitePool,
    transport: Arc<dyn Transport>,
    settings: ApiSettings,
}

impl FlickrFetcher {
    pub fn new(db: SqlitePool, transport: Arc<dyn Transport>, settings: ApiSettings) -> Self {
        Self {
            db,
            transport,
            settings,
        }
    }

    pub fn from_config(db: SqlitePool, transport: Arc<dyn Transport>, config: &Config) -> Self {
        let settings = ApiSettings::from_config(
            &config.flickr,
            api::DEFAULT_API_URL,
            api::DEFAULT_REQUEST_INTERVAL,
        );
        Self::new(db, transport, settings)
    }

    async fn window(&self, account: &Account, scope: &FetchScope) -> Result<UploadWindow, FetchError> {
        if let FetchScope::SinceLast = scope {
            let latest = latest_post_time(&self.db, database::TABLE, account.id).await?;
            return Ok(UploadWindow {
                min: latest.map(|t| t + Duration::seconds(1)),
                max: None,
            });
        }
        let (from, to) = scope.time_bounds(Utc::now());
        Ok(UploadWindow {
            min: from,
            max: to.map(|t| t - Duration::seconds(1)),
        })
    }
}

#[async_trait]
impl Fetcher for FlickrFetcher {
    fn service(&self) -> Service {
        Service::Flickr
    }

    fn noun(&self) -> Noun {
        NOUN
    }

    fn supports(&self, scope: &FetchScope) -> bool {
        match scope {
            FetchScope::Recent(n) => *n <= api::MAX_PAGE_SIZE,
            FetchScope::Date(_) => false,
            _ => true,
        }
    }

    async fn fetch(&self, account: &Account, scope: &FetchScope) -> Result<usize, FetchError> {
        let api_key = account
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingCredentials { what: "API key" })?;
        let user_id = account
            .remote_id
            .as_deref()
            .ok_or(FetchError::MissingCredentials {
                what: "Flickr user id",
            })?;
        let window = self.window(account, scope).await?;
        let (per_page, single_page) = match scope {
            FetchScope::Recent(n) => (*n, true),
            _ => (api::MAX_PAGE_SIZE, false),
        };

        let mut fetched = 0;
        let mut page = 1;
        let mut pages = 1;
        loop {
            if page > 1 {
                tokio::time::sleep(self.settings.request_interval).await;
            }
            let req = api::get_photos(&self.settings.api_url, api_key, user_id, per_page, page, &window);
            let body = self.transport.get(&req).await.map_err(api::request_error)?;
            let parsed = api::parse_page(&body)?;
            if page == 1 {
                pages = parsed.pages;
                info!("flickr: {} has {} photos in {} pages", account, parsed.total, pages);
            }

            let mut photos = Vec::with_capacity(parsed.photos.len());
            for photo in &parsed.photos {
                photos.push(try_skip!(normalize::photo(photo, user_id)));
            }
            database::save_photos(&self.db, account.id, &photos, Utc::now()).await?;
            fetched += photos.len();
            debug!("flickr: page {}/{} for {}: {} photos", parsed.page, pages, account, photos.len());

            if single_page || page >= pages {
                break;
            }
            page += 1;
        }
        Ok(fetched)
    }
}
