use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use sqlx::SqlitePool;

use crate::{
    accounts::{self, AccountSelector},
    error::FetchError,
    model::{Account, Service},
    outcome::{FetchOutcome, Noun},
    scope::FetchScope,
    Error, Result,
};

/// One service's fetch pipeline: request, normalize, upsert.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn service(&self) -> Service;

    fn noun(&self) -> Noun;

    /// Whether this service can fetch with the scope at all.
    fn supports(&self, scope: &FetchScope) -> bool;

    /// Fetch and store one account's items, returning how many were received.
    async fn fetch(&self, account: &Account, scope: &FetchScope) -> std::result::Result<usize, FetchError>;
}

/// Fetch every selected account in turn.
///
/// Usage and configuration problems fail the whole call before any request;
/// a failure while fetching one account is recorded in its outcome and the
/// next account is still fetched.
pub async fn run_fetch(
    db: &SqlitePool,
    fetcher: &dyn Fetcher,
    selector: &AccountSelector,
    scope: &FetchScope,
) -> Result<Vec<FetchOutcome>> {
    let service = fetcher.service();
    if !fetcher.supports(scope) {
        return Err(Error::usage(format!("{service} cannot fetch with {scope}")));
    }
    let accounts = accounts::resolve(db, service, selector).await?;

    let mut outcomes = Vec::with_capacity(accounts.len());
    for account in &accounts {
        outcomes.push(fetch_account(fetcher, account, scope).await);
    }
    Ok(outcomes)
}

async fn fetch_account(fetcher: &dyn Fetcher, account: &Account, scope: &FetchScope) -> FetchOutcome {
    let service = fetcher.service();
    let noun = fetcher.noun();
    if !account.has_credentials() {
        warn!("{service}: {account} has no api key, skipped");
        return FetchOutcome::Failure {
            account: account.username.clone(),
            messages: FetchError::MissingCredentials { what: "API key" }.messages(),
        };
    }

    info!("{service}: fetching {} for {account} ({scope})", noun.plural);
    match fetcher.fetch(account, scope).await {
        Ok(fetched) => {
            info!("{service}: {account}: {fetched} {}", noun.count(fetched));
            FetchOutcome::Success {
                account: account.username.clone(),
                fetched,
            }
        }
        Err(e) => {
            warn!("{service}: {account}: {e}");
            FetchOutcome::Failure {
                account: account.username.clone(),
                messages: e.messages(),
            }
        }
    }
}

/// Post time of the newest item stored for the account in `table`.
pub async fn latest_post_time(
    db: &SqlitePool,
    table: &'static str,
    account_id: i64,
) -> std::result::Result<Option<DateTime<Utc>>, FetchError> {
    let latest: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(&format!(
        "SELECT post_time FROM {table}
        WHERE account_id = ? AND post_time IS NOT NULL
        ORDER BY post_time DESC LIMIT 1"
    ))
    .bind(account_id)
    .fetch_optional(db)
    .await
    .map_err(|source| FetchError::StoreFailed {
        source,
        message: format!("cannot read latest {table}"),
    })?;
    Ok(latest.flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accounts::NewAccount,
        connect,
        outcome::{report_lines, ReportLine},
    };
    use std::sync::Mutex;

    /// Fails for accounts named in `failing`, counts calls.
    struct StubFetcher {
        failing: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn new(failing: Vec<&'static str>) -> Self {
            Self {
                failing,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        fn service(&self) -> Service {
            Service::Lastfm
        }

        fn noun(&self) -> Noun {
            Noun::new("scrobble", "scrobbles")
        }

        fn supports(&self, scope: &FetchScope) -> bool {
            !matches!(scope, FetchScope::Date(_))
        }

        async fn fetch(
            &self,
            account: &Account,
            _scope: &FetchScope,
        ) -> std::result::Result<usize, FetchError> {
            self.calls.lock().unwrap().push(account.username.clone());
            if self.failing.contains(&account.username.as_str()) {
                Err(FetchError::Api {
                    status: None,
                    code: Some("6".to_string()),
                    message: "User not found".to_string(),
                })
            } else {
                Ok(account.username.len())
            }
        }
    }

    async fn db_with(accounts: &[NewAccount]) -> SqlitePool {
        let db = connect("sqlite::memory:").await.unwrap();
        for account in accounts {
            accounts::add(&db, account).await.unwrap();
        }
        db
    }

    #[tokio::test]
    async fn failure_does_not_stop_other_accounts() {
        let db = db_with(&[
            NewAccount::new(Service::Lastfm, "ann").api_key("k"),
            NewAccount::new(Service::Lastfm, "bobby").api_key("k"),
            NewAccount::new(Service::Lastfm, "cy").api_key("k"),
        ])
        .await;
        let fetcher = StubFetcher::new(vec!["bobby"]);

        let outcomes = run_fetch(&db, &fetcher, &AccountSelector::AllActive, &FetchScope::All)
            .await
            .unwrap();
        assert_eq!(fetcher.calls(), vec!["ann", "bobby", "cy"]);
        assert_eq!(
            report_lines(&outcomes, fetcher.noun()),
            vec![
                ReportLine::Success("ann: Fetched 3 scrobbles".to_string()),
                ReportLine::Failure(
                    "bobby: Failed to fetch scrobbles: error 6: User not found".to_string()
                ),
                ReportLine::Success("cy: Fetched 2 scrobbles".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn missing_credentials_skip_the_request() {
        let db = db_with(&[
            NewAccount::new(Service::Lastfm, "ann"),
            NewAccount::new(Service::Lastfm, "cy").api_key("k"),
        ])
        .await;
        let fetcher = StubFetcher::new(vec![]);
        let outcomes = run_fetch(&db, &fetcher, &AccountSelector::AllActive, &FetchScope::All)
            .await
            .unwrap();
        assert_eq!(fetcher.calls(), vec!["cy"]);
        assert_eq!(
            outcomes[0],
            FetchOutcome::Failure {
                account: "ann".to_string(),
                messages: vec!["account has no API key".to_string()],
            }
        );
        assert!(outcomes[1].is_success());
    }

    #[tokio::test]
    async fn configuration_errors_fail_before_fetching() {
        let db = db_with(&[NewAccount::new(Service::Lastfm, "ann")
            .api_key("k")
            .active(false)])
        .await;
        let fetcher = StubFetcher::new(vec![]);

        let err = run_fetch(
            &db,
            &fetcher,
            &AccountSelector::Named("nobody".into()),
            &FetchScope::All,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::AccountNotFound { .. }));

        let err = run_fetch(
            &db,
            &fetcher,
            &AccountSelector::Named("ann".into()),
            &FetchScope::All,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::AccountInactive { .. }));

        let err = run_fetch(&db, &fetcher, &AccountSelector::AllActive, &FetchScope::All)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoActiveAccounts { .. }));

        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let err = run_fetch(
            &db,
            &fetcher,
            &AccountSelector::AllActive,
            &FetchScope::Date(date),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "lastfm cannot fetch with --date 2024-01-01");

        assert!(fetcher.calls().is_empty());
    }
}
