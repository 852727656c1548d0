use crate::log::init_log4rs;
use ::log::{debug, error, info};
use chrono::NaiveDate;
use clap::{Args, Parser};
use colored::Colorize;
use ditto_core::{
    accounts::{self, AccountSelector, NewAccount},
    config::Config,
    model::Service,
    outcome::{report_lines, ReportLine},
    run_fetch,
    scope::ScopeArgs,
    tags, Fetcher,
};
use ditto_flickr::FlickrFetcher;
use ditto_lastfm::LastfmFetcher;
use ditto_pinboard::PinboardFetcher;
use ditto_twitter::TwitterFetcher;
use ditto_utils::http::{HttpTransport, Transport};
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

mod log;

#[derive(Parser)]
#[clap(version)]
struct Main {
    /// Directory holding config.json (default: ~/.ditto).
    #[clap(short, long)]
    config: Option<String>,
    #[clap(short, long)]
    verbose: bool,
    #[clap(subcommand)]
    subcommand: SubcommandMain,
}

#[derive(Parser)]
enum SubcommandMain {
    Init,
    Migrate,
    Account(AccountCommand),
    /// List public tags by use.
    Tags,
    Fetch(Fetch),
}

#[derive(Parser)]
struct AccountCommand {
    #[clap(subcommand)]
    subcommand: SubcommandAccount,
}

#[derive(Parser)]
enum SubcommandAccount {
    Add(AccountAdd),
    List(AccountList),
    SetActive(AccountSetActive),
}

#[derive(Parser)]
struct AccountAdd {
    service: Service,
    username: String,
    /// Flickr NSID or Twitter user id.
    #[clap(long)]
    remote_id: Option<String>,
    /// API key, Pinboard `user:TOKEN` or Twitter bearer token.
    #[clap(long)]
    api_key: Option<String>,
    #[clap(long)]
    inactive: bool,
}

#[derive(Parser)]
struct AccountList {
    service: Option<Service>,
}

#[derive(Parser)]
struct AccountSetActive {
    service: Service,
    username: String,
    #[clap(long)]
    inactive: bool,
}

#[derive(Parser)]
struct Fetch {
    #[clap(subcommand)]
    subcommand: SubcommandFetch,
}

#[derive(Parser)]
enum SubcommandFetch {
    Pinboard(FetchArgs),
    Flickr(FetchArgs),
    Lastfm(FetchArgs),
    Twitter(FetchArgs),
}

impl SubcommandFetch {
    fn split(self) -> (Service, FetchArgs) {
        match self {
            SubcommandFetch::Pinboard(a) => (Service::Pinboard, a),
            SubcommandFetch::Flickr(a) => (Service::Flickr, a),
            SubcommandFetch::Lastfm(a) => (Service::Lastfm, a),
            SubcommandFetch::Twitter(a) => (Service::Twitter, a),
        }
    }
}

#[derive(Args)]
struct FetchArgs {
    /// Fetch only this account (default: every active account).
    #[clap(long)]
    account: Option<String>,
    #[clap(flatten)]
    scope: ScopeFlags,
}

#[derive(Args)]
struct ScopeFlags {
    /// The most recent N items.
    #[clap(long, value_name = "N")]
    recent: Option<u32>,
    #[clap(long)]
    all: bool,
    /// Items posted in the last N days.
    #[clap(long, value_name = "N")]
    days: Option<u32>,
    #[clap(long, value_name = "YYYY-MM-DD")]
    start: Option<NaiveDate>,
    #[clap(long, value_name = "YYYY-MM-DD")]
    end: Option<NaiveDate>,
    #[clap(long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,
    /// Items newer than the newest one already stored.
    #[clap(long)]
    since_last: bool,
}

impl From<ScopeFlags> for ScopeArgs {
    fn from(f: ScopeFlags) -> Self {
        ScopeArgs {
            recent: f.recent,
            all: f.all,
            days: f.days,
            start: f.start,
            end: f.end,
            date: f.date,
            since_last: f.since_last,
        }
    }
}

fn fetcher(service: Service, config: &Config, db: SqlitePool) -> anyhow::Result<Box<dyn Fetcher>> {
    let service_config = match service {
        Service::Pinboard => &config.pinboard,
        Service::Flickr => &config.flickr,
        Service::Lastfm => &config.lastfm,
        Service::Twitter => &config.twitter,
    };
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(config.http_client(service_config)?));
    Ok(match service {
        Service::Pinboard => Box::new(PinboardFetcher::from_config(db, transport, config)),
        Service::Flickr => Box::new(FlickrFetcher::from_config(db, transport, config)),
        Service::Lastfm => Box::new(LastfmFetcher::from_config(db, transport, config)),
        Service::Twitter => Box::new(TwitterFetcher::from_config(db, transport, config)),
    })
}

fn print_report(lines: &[ReportLine]) {
    for line in lines {
        match line {
            ReportLine::Success(text) => println!("{}", text.green()),
            ReportLine::Failure(text) => eprintln!("{}", text.red()),
        }
    }
}

async fn run_internal(opts: Main) -> anyhow::Result<()> {
    let config_builder = || {
        let config_path = if let Some(c) = &opts.config {
            PathBuf::from(c)
        } else {
            dirs::home_dir().unwrap_or_default().join(".ditto")
        }
        .join("config.json");
        let config = Config::from_file(&config_path)?;
        debug!("config loaded: {:?}", config_path);

        Ok(config) as anyhow::Result<Config>
    };

    let pre_fn = async {
        let config = config_builder()?;
        let db = ditto_core::connect(&config.database_url).await?;
        Ok((config, db)) as anyhow::Result<_>
    };

    match opts.subcommand {
        SubcommandMain::Init => {
            config_builder()?;
        }
        SubcommandMain::Migrate => {
            pre_fn.await?;
            info!("migration finished");
        }
        SubcommandMain::Account(c) => {
            let (_, db) = pre_fn.await?;
            match c.subcommand {
                SubcommandAccount::Add(a) => {
                    let mut new = NewAccount::new(a.service, a.username).active(!a.inactive);
                    if let Some(remote_id) = a.remote_id {
                        new = new.remote_id(remote_id);
                    }
                    if let Some(api_key) = a.api_key {
                        new = new.api_key(api_key);
                    }
                    let account = accounts::add(&db, &new).await?;
                    info!("saved {} account {}", account.service, account);
                }
                SubcommandAccount::List(l) => {
                    for account in accounts::list(&db, l.service).await? {
                        let state = if account.is_active {
                            "active".green()
                        } else {
                            "inactive".bright_black()
                        };
                        let key = if account.has_credentials() {
                            ""
                        } else {
                            " (no api key)"
                        };
                        println!("{}\t{}\t{}{}", account.service, account.username, state, key);
                    }
                }
                SubcommandAccount::SetActive(s) => {
                    let account =
                        accounts::set_active(&db, s.service, &s.username, !s.inactive).await?;
                    info!(
                        "{} account {} is now {}",
                        account.service,
                        account,
                        if account.is_active { "active" } else { "inactive" }
                    );
                }
            }
        }
        SubcommandMain::Tags => {
            let (_, db) = pre_fn.await?;
            for t in tags::public_tags(&db).await? {
                println!("{}\t{}", t.count, t.tag.name);
            }
        }
        SubcommandMain::Fetch(c) => {
            let (service, args) = c.subcommand.split();
            let scope = ScopeArgs::from(args.scope).parse()?;
            let selector = AccountSelector::from(args.account);
            let (config, db) = pre_fn.await?;
            let fetcher = fetcher(service, &config, db.clone())?;
            let outcomes = run_fetch(&db, fetcher.as_ref(), &selector, &scope).await?;
            print_report(&report_lines(&outcomes, fetcher.noun()));
        }
    };

    Ok(())
}

/// 2 for a mistake in how ditto was invoked, 1 for anything else.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ditto_core::Error>() {
        Some(e) if e.is_usage() => 2,
        _ => 1,
    }
}

/// Run the app and return the exit code.
pub async fn run() -> i32 {
    let opts = Main::parse();
    if let Err(e) = init_log4rs(opts.verbose) {
        eprintln!("cannot set up logging: {e}");
        return 1;
    }
    if let Err(e) = run_internal(opts).await {
        error!("{}", e);
        exit_code(&e)
    } else {
        0
    }
}
