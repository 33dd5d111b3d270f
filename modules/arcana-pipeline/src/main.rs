use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arcana_common::{Config, ContentPolicy, Taxonomy};
use arcana_ledger::TopicLedger;
use arcana_pipeline::coordinator::{Pipeline, RunOptions};
use arcana_pipeline::gateway::{DesiredStatus, PublishGateway};
use arcana_pipeline::generator::ClaudeGenerator;
use arcana_pipeline::retry::{RetryPolicy, TokioSleeper};
use arcana_pipeline::schedule;
use arcana_pipeline::selector::TopicSelector;
use arcana_pipeline::validator::ContentValidator;
use wordpress_client::WordPressClient;

#[derive(Parser)]
#[command(name = "arcana", about = "Automated psychological-content publishing pipeline")]
struct Cli {
    /// Desired publication status
    #[arg(long, value_enum, default_value = "draft")]
    status: StatusArg,

    /// Schedule the post this many hours from now (implies --status scheduled)
    #[arg(long)]
    schedule_hours: Option<u32>,

    /// Disable the automatic sanitization pass
    #[arg(long)]
    no_sanitize: bool,

    /// Print ledger statistics and exit without running the pipeline
    #[arg(long)]
    stats: bool,

    /// Ledger database path (overrides ARCANA_LEDGER_PATH)
    #[arg(long)]
    db: Option<PathBuf>,

    /// RNG seed for reproducible topic selection
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatusArg {
    Draft,
    Publish,
    Scheduled,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let taxonomy = Taxonomy::default();

    if cli.stats {
        let config = Config::stats_from_env();
        let path = cli.db.unwrap_or_else(|| PathBuf::from(&config.ledger_path));
        let ledger = TopicLedger::open(&path).await?;

        let stats = ledger.statistics().await?;
        let remaining = ledger.remaining_combinations(&taxonomy).await?;
        println!("{stats}");
        println!(
            "Combinations:       {} of {} remaining",
            remaining,
            taxonomy.total_combinations()
        );
        return Ok(());
    }

    info!("Arcana pipeline starting...");

    let config = Config::from_env();
    config.log_redacted();

    let path = cli
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.ledger_path));
    let ledger = TopicLedger::open(&path).await?;

    let selector = match cli.seed {
        Some(seed) => TopicSelector::with_seed(taxonomy, seed),
        None => TopicSelector::new(taxonomy),
    };

    let wordpress = WordPressClient::new(
        &config.wordpress_url,
        &config.wordpress_username,
        &config.wordpress_app_password,
    )?;

    let sleeper = Arc::new(TokioSleeper);
    let gateway = PublishGateway::new(Arc::new(wordpress), RetryPolicy::default(), sleeper.clone());
    let generator = Box::new(ClaudeGenerator::new(&config.anthropic_api_key));
    let validator = ContentValidator::new(ContentPolicy::default());

    let mut pipeline = Pipeline::new(
        ledger,
        selector,
        generator,
        validator,
        gateway,
        RetryPolicy::default(),
        sleeper,
    );

    let opts = run_options(&cli);
    let report = pipeline.run(&opts).await?;
    println!("{report}");

    Ok(())
}

/// Resolve CLI flags into run options. An explicit delay forces scheduled
/// mode; an immediate publish outside the publish windows is deferred to
/// the next slot rather than going out at an off-hour.
fn run_options(cli: &Cli) -> RunOptions {
    let now = chrono::Utc::now();
    let mut rng = StdRng::from_os_rng();

    let (desired_status, schedule_time) = match (cli.status, cli.schedule_hours) {
        (_, Some(hours)) => {
            let time = now + chrono::Duration::hours(hours as i64);
            (DesiredStatus::Scheduled, Some(time))
        }
        (StatusArg::Scheduled, None) => {
            let time = schedule::next_publish_slot(now, &mut rng);
            (DesiredStatus::Scheduled, Some(time))
        }
        (StatusArg::Publish, None) => {
            if schedule::in_publish_window(now) {
                (DesiredStatus::Publish, None)
            } else {
                let time = schedule::next_publish_slot(now, &mut rng);
                info!(slot = %time, "Outside publish window, deferring to next slot");
                (DesiredStatus::Scheduled, Some(time))
            }
        }
        (StatusArg::Draft, None) => (DesiredStatus::Draft, None),
    };

    if let Some(time) = schedule_time {
        info!(scheduled_for = %time, "Post will be scheduled");
    }

    RunOptions {
        desired_status,
        schedule_time,
        sanitize: !cli.no_sanitize,
    }
}
