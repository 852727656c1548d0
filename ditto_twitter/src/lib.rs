use async_trait::async_trait;
use chrono::Utc;
use ditto_core::{
    config::{ApiSettings, Config},
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

use api::Query;

pub const NOUN: Noun = Noun::new("tweet", "tweets");

pub struct TwitterFetcher {
    db: SqlitePool,
    transport: Arc<dyn Transport>,
    settings: ApiSettings,
}

impl TwitterFetcher {
    pub fn new(db: SqlitePool, transport: Arc<dyn Transport>, settings: ApiSettings) -> Self {
        Self {
            db,
            transport,
            settings,
        }
    }

    pub fn from_config(db: SqlitePool, transport: Arc<dyn Transport>, config: &Config) -> Self {
        let settings = ApiSettings::from_config(
            &config.twitter,
            api::DEFAULT_API_URL,
            api::DEFAULT_REQUEST_INTERVAL,
        );
        Self::new(db, transport, settings)
    }

    async fn query(&self, account: &Account, scope: &FetchScope) -> Result<Query, FetchError> {
        if let FetchScope::SinceLast = scope {
            return Ok(Query {
                since_id: database::latest_tweet_id(&self.db, account.id).await?,
                ..Default::default()
            });
        }
        let (start_time, end_time) = scope.time_bounds(Utc::now());
        Ok(Query {
            since_id: None,
            start_time,
            end_time,
        })
    }
}

#[async_trait]
impl Fetcher for TwitterFetcher {
    fn service(&self) -> Service {
        Service::Twitter
    }

    fn noun(&self) -> Noun {
        NOUN
    }

    fn supports(&self, scope: &FetchScope) -> bool {
        !matches!(scope, FetchScope::Date(_))
    }

    async fn fetch(&self, account: &Account, scope: &FetchScope) -> Result<usize, FetchError> {
        let token = account
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingCredentials {
                what: "bearer token",
            })?;
        let user_id = account
            .remote_id
            .as_deref()
            .ok_or(FetchError::MissingCredentials {
                what: "Twitter user id",
            })?;
        let query = self.query(account, scope).await?;
        let limit = match scope {
            FetchScope::Recent(n) => Some(*n as usize),
            _ => None,
        };
        let page_size = limit.map_or(api::MAX_PAGE_SIZE, |n| n.min(api::MAX_PAGE_SIZE as usize) as u32);
        info!("twitter: {} with {:?}", account, query);

        let mut fetched = 0;
        let mut next_token: Option<String> = None;
        let mut pages = 0;
        loop {
            if pages > 0 {
                tokio::time::sleep(self.settings.request_interval).await;
            }
            let req = api::user_tweets(
                &self.settings.api_url,
                token,
                user_id,
                page_size,
                &query,
                next_token.as_deref(),
            );
            let body = self.transport.get(&req).await.map_err(api::request_error)?;
            let page = api::parse_page(&body)?;
            pages += 1;

            let mut tweets = Vec::with_capacity(page.tweets.len());
            for value in &page.tweets {
                if limit_reached(limit, fetched + tweets.len()) {
                    break;
                }
                tweets.push(try_skip!(normalize::tweet(value, &page.users, &account.username)));
            }
            database::save_tweets(&self.db, account.id, &tweets, Utc::now()).await?;
            fetched += tweets.len();
            debug!("twitter: page {} for {}: {} tweets", pages, account, tweets.len());

            match page.next_token {
                Some(next) if !limit_reached(limit, fetched) => next_token = Some(next),
                _ => break,
            }
        }
        Ok(fetched)
    }
}
