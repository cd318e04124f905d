use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use moto_scout::config;
use moto_scout::history;
use moto_scout::report;
use moto_scout::scrapers::{scrape_all, ChromeSession, PaginationConfig, ScrapeSettings};
use moto_scout::sheets::{self, CsvWorkbook, GoogleSheetsStore, SheetStore};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Moto Scout - Wallapop motorcycle listing tracker")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Google spreadsheet id; without it sheets go to the CSV workbook
    #[arg(long, env = "GOOGLE_SHEET_ID", global = true)]
    sheet_id: Option<String>,

    /// OAuth access token for the Sheets API
    #[arg(long, env = "GOOGLE_SHEETS_ACCESS_TOKEN", global = true, hide_env_values = true)]
    access_token: Option<String>,

    /// Directory of the local CSV workbook
    #[arg(long, env = "MOTO_SCOUT_WORKBOOK", default_value = "workbook", global = true)]
    workbook: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape every account and upload a dated sheet (default)
    Scrape(ScrapeArgs),
    /// Merge the latest scrape sheet into Data_Historico
    UpdateHistory,
    /// Verify the sheet store is reachable
    Check,
}

#[derive(Args, Debug)]
struct ScrapeArgs {
    /// Only scrape the two test accounts
    #[arg(long, env = "TEST_MODE", value_parser = parse_flag)]
    test_mode: bool,

    /// JSON file mapping account name to profile URL
    #[arg(long)]
    accounts: Option<PathBuf>,

    /// Stop loading a profile once this many listings are visible
    #[arg(long, default_value_t = PaginationConfig::default().target)]
    target: usize,

    /// Maximum load-more clicks per profile
    #[arg(long, default_value_t = PaginationConfig::default().max_clicks)]
    max_clicks: usize,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Also write the listings to this JSON file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Scrape without uploading
    #[arg(long)]
    dry_run: bool,
}

const FALSEY: [&str; 7] = ["", "0", "n", "no", "f", "false", "off"];

/// Env-style boolean: anything outside the falsey spellings is true, in any case
fn parse_flag(value: &str) -> Result<bool, std::convert::Infallible> {
    let value = value.trim().to_ascii_lowercase();
    Ok(!FALSEY.contains(&value.as_str()))
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|value| parse_flag(&value).unwrap_or(false))
}

impl Default for ScrapeArgs {
    fn default() -> Self {
        let pagination = PaginationConfig::default();
        Self {
            test_mode: env_flag("TEST_MODE"),
            accounts: None,
            target: pagination.target,
            max_clicks: pagination.max_clicks,
            headful: false,
            json: None,
            dry_run: false,
        }
    }
}

fn open_store(args: &StoreArgs) -> Result<Box<dyn SheetStore>> {
    let sheet_id = args
        .sheet_id
        .clone()
        .or_else(|| std::env::var("GOOGLE_SHEET_ID_MOTICK").ok())
        .filter(|id| !id.trim().is_empty());

    match sheet_id {
        Some(id) => {
            let token = args
                .access_token
                .clone()
                .context("A sheet id needs --access-token or GOOGLE_SHEETS_ACCESS_TOKEN")?;
            Ok(Box::new(GoogleSheetsStore::new(id, token)?))
        }
        None => Ok(Box::new(CsvWorkbook::new(args.workbook.clone()))),
    }
}

async fn run_scrape(args: ScrapeArgs, store: &dyn SheetStore) -> Result<()> {
    let accounts = match &args.accounts {
        Some(path) => config::load_accounts(path)?,
        None => config::accounts_for_mode(args.test_mode),
    };
    info!(
        "Mode: {}, {} accounts, target {} listings per profile",
        if args.test_mode { "test" } else { "full" },
        accounts.len(),
        args.target
    );
    info!("Store: {}", store.describe());
    info!("");

    let mut settings = ScrapeSettings::default();
    settings.pagination.target = args.target;
    settings.pagination.max_clicks = args.max_clicks;

    let browser = ChromeSession::launch(!args.headful)?;
    let run = scrape_all(&browser, &accounts, &settings);
    report::log_run_summary(&run);

    let listings = run.into_listings();
    if listings.is_empty() {
        bail!("No listings extracted from any account");
    }

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&listings)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("💾 Saved {} listings to {}", listings.len(), path.display());
    }

    if args.dry_run {
        info!("Dry run, skipping upload");
        return Ok(());
    }

    let sheet = sheets::upload(store, &listings, Local::now().date_naive())
        .await
        .context("Upload failed")?;
    info!("✅ {} listings saved to {}", listings.len(), sheet);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    info!("🏍️  Moto Scout - Wallapop listing tracker");
    info!("==========================================");

    let store = open_store(&cli.store)?;

    match cli.command.unwrap_or_else(|| Command::Scrape(ScrapeArgs::default())) {
        Command::Scrape(args) => run_scrape(args, store.as_ref()).await?,
        Command::UpdateHistory => {
            history::update_history(store.as_ref()).await?;
        }
        Command::Check => {
            sheets::check_connection(store.as_ref())
                .await
                .with_context(|| format!("Cannot reach {}", store.describe()))?;
            info!("✅ Store reachable");
        }
    }

    Ok(())
}
