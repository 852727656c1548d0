use chrono::Utc;
use log::debug;
use snafu::ResultExt;
use sqlx::SqlitePool;

use crate::{
    error,
    model::{Account, Service},
    Result,
};

const COLUMNS: &str =
    "id, service, username, remote_id, api_key, is_active, time_created, time_modified";

/// Which accounts a fetch run is for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountSelector {
    AllActive,
    Named(String),
}

impl From<Option<String>> for AccountSelector {
    fn from(name: Option<String>) -> Self {
        match name {
            Some(name) => AccountSelector::Named(name),
            None => AccountSelector::AllActive,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAccount {
    pub service: Service,
    pub username: String,
    pub remote_id: Option<String>,
    pub api_key: Option<String>,
    pub is_active: bool,
}

impl NewAccount {
    pub fn new(service: Service, username: impl Into<String>) -> Self {
        Self {
            service,
            username: username.into(),
            remote_id: None,
            api_key: None,
            is_active: true,
        }
    }

    pub fn remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }
}

/// Resolve the accounts a run will fetch, failing before any request is made.
pub async fn resolve(
    db: &SqlitePool,
    service: Service,
    selector: &AccountSelector,
) -> Result<Vec<Account>> {
    match selector {
        AccountSelector::Named(name) => {
            let account = find(db, service, name)
                .await?
                .ok_or_else(|| {
                    error::AccountNotFound {
                        service,
                        name: name.clone(),
                    }
                    .build()
                })?;
            if !account.is_active {
                return error::AccountInactive {
                    service,
                    name: name.clone(),
                }
                .fail();
            }
            Ok(vec![account])
        }
        AccountSelector::AllActive => {
            let accounts: Vec<Account> = sqlx::query_as(&format!(
                "SELECT {COLUMNS} FROM account WHERE service = ? AND is_active ORDER BY id"
            ))
            .bind(service)
            .fetch_all(db)
            .await
            .context(error::Database {
                message: "cannot list accounts",
            })?;
            if accounts.is_empty() {
                return error::NoActiveAccounts { service }.fail();
            }
            debug!("{} active {} accounts", accounts.len(), service);
            Ok(accounts)
        }
    }
}

pub async fn find(db: &SqlitePool, service: Service, username: &str) -> Result<Option<Account>> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM account WHERE service = ? AND username = ?"
    ))
    .bind(service)
    .bind(username)
    .fetch_optional(db)
    .await
    .context(error::Database {
        message: "cannot find account",
    })
}

pub async fn list(db: &SqlitePool, service: Option<Service>) -> Result<Vec<Account>> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM account WHERE ? IS NULL OR service = ? ORDER BY service, username"
    ))
    .bind(service)
    .bind(service)
    .fetch_all(db)
    .await
    .context(error::Database {
        message: "cannot list accounts",
    })
}

/// Add an account, or replace the identity and credentials of an existing one.
pub async fn add(db: &SqlitePool, account: &NewAccount) -> Result<Account> {
    let now = Utc::now();
    sqlx::query_as(&format!(
        "INSERT INTO account (service, username, remote_id, api_key, is_active, time_created, time_modified)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        ON CONFLICT (service, username) DO UPDATE SET
            remote_id = ?3,
            api_key = ?4,
            is_active = ?5,
            time_modified = ?6
        RETURNING {COLUMNS}"
    ))
    .bind(account.service)
    .bind(&account.username)
    .bind(&account.remote_id)
    .bind(&account.api_key)
    .bind(account.is_active)
    .bind(now)
    .fetch_one(db)
    .await
    .context(error::Database {
        message: "cannot save account",
    })
}

pub async fn set_active(
    db: &SqlitePool,
    service: Service,
    username: &str,
    is_active: bool,
) -> Result<Account> {
    let account: Option<Account> = sqlx::query_as(&format!(
        "UPDATE account SET is_active = ?, time_modified = ?
        WHERE service = ? AND username = ?
        RETURNING {COLUMNS}"
    ))
    .bind(is_active)
    .bind(Utc::now())
    .bind(service)
    .bind(username)
    .fetch_optional(db)
    .await
    .context(error::Database {
        message: "cannot update account",
    })?;
    account.ok_or_else(|| {
        error::AccountNotFound {
            service,
            name: username.to_string(),
        }
        .build()
    })
}
