use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use browserless_client::BrowserlessClient;
use gigsignal_common::{load_config, AppConfig, Secrets, SkillMatcher, StoreBackend};
use gigsignal_scanner::notify::{Dispatcher, TelegramNotifier};
use gigsignal_scanner::pipeline::ScanPipeline;
use gigsignal_scanner::scheduler::ScanScheduler;
use gigsignal_scanner::scoring::ScoreAnalyzer;
use gigsignal_scanner::scrapers::build_scrapers;
use gigsignal_scanner::seen::SeenSet;
use gigsignal_store::{OpportunityStore, PgStore, SqliteStore};
use llm_client::OpenAiChat;

#[derive(Parser)]
#[command(name = "gigsignal", about = "Remote opportunity discovery pipeline")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config/gigsignal.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scan pipeline.
    Scan {
        /// Run a single tick and exit.
        #[arg(long)]
        once: bool,
    },
    /// Print top opportunities from the store.
    Report {
        #[arg(long, default_value_t = 10)]
        top: i64,
        #[arg(long, default_value_t = 0)]
        min_score: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gigsignal=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Command::Scan { once } => scan(config, once).await,
        Command::Report { top, min_score } => report(config, top, min_score).await,
    }
}

async fn build_store(
    config: &AppConfig,
    database_url: Option<&str>,
) -> Result<Arc<dyn OpportunityStore>> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            let store = SqliteStore::connect(&config.store.path).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Postgres => {
            let url = database_url
                .context("store.backend = \"postgres\" requires DATABASE_URL")?;
            let store = PgStore::connect(url).await?;
            Ok(Arc::new(store))
        }
    }
}

async fn scan(config: AppConfig, once: bool) -> Result<()> {
    info!("GigSignal scanner starting...");
    let secrets = Secrets::from_env();
    secrets.log_redacted();

    let store = build_store(&config, secrets.database_url.as_deref()).await?;
    let seen = Arc::new(SeenSet::load(&config.scanner.seen_file)?);

    // Skill vocabulary: the operator's configured skills, or the stock
    // list when none are configured.
    let skills = if config.scoring.skills.is_empty() {
        Arc::new(SkillMatcher::default_vocabulary())
    } else {
        Arc::new(SkillMatcher::new(&config.scoring.skills)?)
    };

    let browser = secrets
        .browserless_url
        .as_deref()
        .map(|url| Arc::new(BrowserlessClient::new(url, secrets.browserless_token.as_deref())));
    let scrapers = build_scrapers(&config.sites, skills, browser)?;
    info!(sources = scrapers.len(), "Scrapers ready");

    let mut chat = OpenAiChat::new(&secrets.llm_api_key, &secrets.llm_model);
    if let Some(base_url) = &secrets.llm_base_url {
        chat = chat.with_base_url(base_url);
    }
    let analyzer = ScoreAnalyzer::new(Arc::new(chat), config.scoring.clone());

    let notifier = Arc::new(TelegramNotifier::new(
        &secrets.telegram_api_base,
        &secrets.telegram_token,
        &secrets.telegram_chat_id,
    ));
    let dispatcher = Dispatcher::new(notifier, config.scanner.max_per_message);

    let pipeline = Arc::new(ScanPipeline::new(
        scrapers,
        config.filters.clone(),
        seen,
        analyzer,
        store,
        dispatcher,
    ));

    if once {
        let cancelled = Arc::new(AtomicBool::new(false));
        let stats = pipeline.run_tick(&cancelled).await?;
        info!("Single scan complete. {stats}");
        return Ok(());
    }

    let scheduler = ScanScheduler::new(
        pipeline,
        Duration::from_secs(config.scanner.scan_interval_secs),
    );
    let handle = scheduler.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received, stopping scheduler...");
    handle.stop().await;
    Ok(())
}

async fn report(config: AppConfig, top: i64, min_score: i64) -> Result<()> {
    let database_url = std::env::var("DATABASE_URL").ok();
    let store = build_store(&config, database_url.as_deref()).await?;

    let opportunities = store.get_top(top, min_score, None).await?;
    if opportunities.is_empty() {
        println!("No scored opportunities (min score {min_score}).");
    } else {
        println!("Top {} opportunities (min score {min_score}):\n", opportunities.len());
        for (i, opp) in opportunities.iter().enumerate() {
            let budget = opp.budget_display().unwrap_or_else(|| "n/a".to_string());
            println!(
                "{:>2}. [{:>3}] [{}] {} ({budget})",
                i + 1,
                opp.score.unwrap_or(0),
                opp.platform,
                opp.title,
            );
            if let Some(reason) = &opp.score_reason {
                println!("      {reason}");
            }
            println!("      {} — {}\n", opp.status, opp.source_url);
        }
    }

    let stats = store.stats().await?;
    let avg = stats
        .avg_score
        .map(|s| format!("{s:.1}"))
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "Store: {} total, avg score {avg}, {} high scorers (>=80)",
        stats.total, stats.high_score_count
    );
    Ok(())
}
