use anyhow::{bail, Result};
use clap::Parser;
use lakescraper::{
    batch::{run_batch, BatchOutcome},
    config::{Config, Profile, SchemaPolicy},
    dates::{read_dates, DateToken},
    fetch::HttpSource,
    output::{render_preview, Sheet},
    session::Session,
};
use std::path::PathBuf;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const PROCEED_PROMPT: &str =
    "Proceed with scraping all dates from the workbook? Enter 'y' to continue or 'n' to exit: ";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Scrape CMWSSB daily lake levels for the dates listed in a workbook"
)]
struct Args {
    /// YAML file overriding the profile defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Profile::Full)]
    profile: Profile,

    /// Workbook whose first column lists the dates
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum)]
    schema_policy: Option<SchemaPolicy>,

    /// Date scraped and previewed before the batch run
    #[arg(long, default_value = "04-08-2023")]
    test_date: DateToken,

    #[arg(long)]
    skip_test: bool,

    /// Do not ask before starting the batch run
    #[arg(short, long)]
    yes: bool,
}

async fn confirm(question: &str) -> Result<bool> {
    let mut stdout = io::stdout();
    stdout.write_all(question.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(io::stdin()).read_line(&mut line).await?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    // ─── 2) configuration ────────────────────────────────────────────
    let args = Args::parse();
    let mut cfg = Config::load(args.profile, args.config.as_deref())?;
    if let Some(input) = args.input {
        cfg.input = input;
    }
    if let Some(output) = args.output {
        cfg.output = output;
    }
    if let Some(policy) = args.schema_policy {
        cfg.schema_policy = policy;
    }
    info!(
        input = %cfg.input.display(),
        output = %cfg.output.display(),
        headers = cfg.headers.len(),
        "configuration"
    );

    if !cfg.input.exists() {
        bail!(
            "input workbook not found: {} (pass --input or set `input` in the config)",
            cfg.input.display()
        );
    }

    // ─── 3) single-date test run ─────────────────────────────────────
    if !args.skip_test {
        info!("testing with single date {} first", args.test_date);
        let block = {
            let session = Session::new(HttpSource::new(&cfg)?, &cfg)?;
            let block = session.scrape_date(&args.test_date).await;
            block
        };
        let Some(sheet) = Sheet::from_block(block) else {
            bail!(
                "test failed: no data for {}; check the website and table structure",
                args.test_date
            );
        };
        let preview = render_preview(&sheet);
        println!("\nData for {}:\n{preview}\n", args.test_date);
        info!("test successful; found {} records", sheet.rows.len());
    }

    if !args.yes && !confirm(PROCEED_PROMPT).await? {
        info!("scraping cancelled");
        return Ok(());
    }

    // ─── 4) batch run ────────────────────────────────────────────────
    let dates = read_dates(&cfg.input)?;
    if dates.is_empty() {
        warn!("no valid dates found in {}", cfg.input.display());
        return Ok(());
    }

    let outcome = {
        let session = Session::new(HttpSource::new(&cfg)?, &cfg)?;
        let outcome = run_batch(
            &session,
            &dates,
            &cfg.output,
            cfg.schema_policy,
            tokio::signal::ctrl_c(),
        )
        .await?;
        outcome
    };

    match outcome {
        BatchOutcome::Written {
            records,
            unique_dates,
            columns,
        } => {
            println!("\nData saved to {}", cfg.output.display());
            println!("Total records: {records}");
            println!("Unique dates processed: {unique_dates}");
            println!("Columns extracted: {columns:?}");
        }
        BatchOutcome::NothingExtracted => println!("No data was successfully extracted"),
        BatchOutcome::Interrupted => println!("Scraping interrupted by user"),
    }
    Ok(())
}
