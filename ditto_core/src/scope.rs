use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::fmt;

use crate::{Error, Result};

/// What a fetch run should ask each service for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchScope {
    /// The most recent `n` items.
    Recent(u32),
    All,
    /// Items posted within the last `n` days.
    Days(u32),
    /// Items posted from the start of `start` to the end of `end` (or now).
    Range {
        start: NaiveDate,
        end: Option<NaiveDate>,
    },
    Date(NaiveDate),
    /// Items newer than the newest one already stored for the account.
    SinceLast,
}

impl fmt::Display for FetchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchScope::Recent(n) => write!(f, "--recent {n}"),
            FetchScope::All => write!(f, "--all"),
            FetchScope::Days(n) => write!(f, "--days {n}"),
            FetchScope::Range {
                start,
                end: Some(end),
            } => write!(f, "--start {start} --end {end}"),
            FetchScope::Range { start, end: None } => write!(f, "--start {start}"),
            FetchScope::Date(d) => write!(f, "--date {d}"),
            FetchScope::SinceLast => write!(f, "--since-last"),
        }
    }
}

impl FetchScope {
    /// The `[from, to)` window of post times the scope covers, if it is time based.
    pub fn time_bounds(&self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self {
            FetchScope::Days(n) => (Some(now - Duration::days(i64::from(*n))), None),
            FetchScope::Range { start, end } => (
                Some(start_of(*start)),
                end.map(|end| start_of(end) + Duration::days(1)),
            ),
            FetchScope::Date(d) => (Some(start_of(*d)), Some(start_of(*d) + Duration::days(1))),
            _ => (None, None),
        }
    }
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

/// The scope flags as given on the command line, before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeArgs {
    pub recent: Option<u32>,
    pub all: bool,
    pub days: Option<u32>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub date: Option<NaiveDate>,
    pub since_last: bool,
}

impl ScopeArgs {
    pub fn parse(&self) -> Result<FetchScope> {
        if self.days.is_some() && (self.start.is_some() || self.end.is_some()) {
            return Err(Error::usage("--days cannot be used with --start or --end"));
        }
        if self.end.is_some() && self.start.is_none() {
            return Err(Error::usage("--end needs --start"));
        }

        let mut given = Vec::new();
        if let Some(n) = self.recent {
            given.push(("--recent", FetchScope::Recent(n)));
        }
        if self.all {
            given.push(("--all", FetchScope::All));
        }
        if let Some(n) = self.days {
            given.push(("--days", FetchScope::Days(n)));
        }
        if let Some(start) = self.start {
            given.push((
                "--start",
                FetchScope::Range {
                    start,
                    end: self.end,
                },
            ));
        }
        if let Some(d) = self.date {
            given.push(("--date", FetchScope::Date(d)));
        }
        if self.since_last {
            given.push(("--since-last", FetchScope::SinceLast));
        }

        let scope = match given.len() {
            0 => {
                return Err(Error::usage(
                    "no fetch scope given: use one of --recent, --all, --days, --start, --date or --since-last",
                ))
            }
            1 => given.remove(0).1,
            _ => {
                let names: Vec<&str> = given.iter().map(|(name, _)| *name).collect();
                return Err(Error::usage(format!(
                    "{} cannot be used together",
                    names.join(" and ")
                )));
            }
        };

        match &scope {
            FetchScope::Recent(0) => Err(Error::usage("--recent must be at least 1")),
            FetchScope::Days(0) => Err(Error::usage("--days must be at least 1")),
            FetchScope::Range {
                start,
                end: Some(end),
            } if start > end => Err(Error::usage(format!(
                "--start {start} is after --end {end}"
            ))),
            _ => Ok(scope),
        }
    }
}
