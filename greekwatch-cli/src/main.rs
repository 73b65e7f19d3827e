//! GreekWatch CLI: replay, live monitoring, settings and journal commands.
//!
//! Commands:
//! - `replay`: run recorded snapshots (CSV) through one session offline
//! - `live`: run the scheduled engine against the synthetic chain feed
//! - `settings`: print every tunable with its effective value
//! - `history`: print the signal journal, newest first

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use greekwatch_core::domain::SessionId;
use greekwatch_core::journal::{MemoryJournal, SignalRecord, SignalSink};
use greekwatch_core::settings::SCHEMA;
use greekwatch_runner::{
    load_snapshots_csv, Clock, Engine, EngineParts, ExchangeClock, JsonlJournal, ReplayDriver,
    ReplayReport, RunnerConfig, SettingsStore, SyntheticChainFeed,
};

#[derive(Parser)]
#[command(
    name = "greekwatch",
    about = "GreekWatch CLI, an intraday index-options signal engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded snapshots through one session.
    Replay {
        /// CSV with columns timestamp, underlying_price, strike, premium, delta, gamma, theta, iv.
        #[arg(long)]
        feed: PathBuf,

        /// Runner config (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON-lines journal to append signals to. Overrides the config.
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Print the full report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the scheduled engine against the synthetic chain feed.
    Live {
        /// Runner config (TOML).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Session identity.
        #[arg(long, default_value = "local")]
        session: String,

        /// Seed for the synthetic feed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Starting underlying price for the synthetic feed.
        #[arg(long, default_value_t = 22_000.0)]
        start_price: f64,

        /// Stop after this many seconds (runs until Ctrl-C otherwise).
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Print every setting with its effective value.
    Settings {
        /// Runner config (TOML) whose [settings] overrides to apply.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the signal journal, newest first.
    History {
        /// JSON-lines journal file.
        #[arg(long)]
        journal: PathBuf,

        /// Show at most this many records.
        #[arg(long)]
        limit: Option<usize>,

        /// Print records as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            feed,
            config,
            journal,
            json,
        } => run_replay(&feed, config.as_deref(), journal, json),
        Commands::Live {
            config,
            session,
            seed,
            start_price,
            duration_secs,
        } => run_live(config.as_deref(), session, seed, start_price, duration_secs),
        Commands::Settings { config } => run_settings(config.as_deref()),
        Commands::History {
            journal,
            limit,
            json,
        } => run_history(&journal, limit, json),
    }
}

fn load_config(path: Option<&Path>) -> Result<RunnerConfig> {
    match path {
        Some(p) => RunnerConfig::load(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(RunnerConfig::default()),
    }
}

fn open_journal(path: Option<PathBuf>) -> Result<Arc<dyn SignalSink>> {
    Ok(match path {
        Some(p) => Arc::new(
            JsonlJournal::open(&p).with_context(|| format!("opening journal {}", p.display()))?,
        ),
        None => Arc::new(MemoryJournal::new()),
    })
}

fn run_replay(feed: &Path, config: Option<&Path>, journal: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config(config)?;
    let settings = config.typed_settings()?;
    let journal = open_journal(journal.or_else(|| config.journal_path.clone()))?;

    let tape = load_snapshots_csv(feed).with_context(|| format!("reading {}", feed.display()))?;
    info!(samples = tape.len(), feed = %feed.display(), "replay started");

    let driver = ReplayDriver::new(
        SessionId::new("replay"),
        settings,
        config.market_hours.clone(),
        config.buffers,
        journal,
    );
    let report = driver.run(&tape);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_replay_summary(&report);
    }
    Ok(())
}

fn print_replay_summary(report: &ReplayReport) {
    println!("Samples:      {}", report.samples);
    println!("Candles:      {}", report.candles);
    println!(
        "Detections:   {} ({} dropped)",
        report.detections.len(),
        report.dropped_detections
    );
    println!("Approvals:    {}", report.approvals.len());
    println!("Exits:        {}", report.exits.len());
    for c in &report.detections {
        println!(
            "  {}  {:<22} price {:>10.2}  premium {:>8.2}",
            c.detected_at,
            c.kind.to_string(),
            c.price,
            c.signal_premium
        );
    }
    for n in &report.exits {
        let premium = n.exit_premium.map_or("-".to_string(), |p| format!("{p:.2}"));
        println!("  {}  {:<22} {} @ {}", n.at, n.kind.to_string(), n.reason, premium);
    }
    for e in &report.journal_errors {
        eprintln!("journal error: {e}");
    }
    if let Some(s) = &report.final_status {
        println!("Final regime: {} / {}", s.bias, s.market_type);
    }
}

fn run_live(
    config: Option<&Path>,
    session: String,
    seed: u64,
    start_price: f64,
    duration_secs: Option<u64>,
) -> Result<()> {
    let config = load_config(config)?;
    let settings = Arc::new(SettingsStore::with_overrides(config.settings_overrides())?);
    let journal = open_journal(config.journal_path.clone())?;
    let clock: Arc<dyn Clock> = Arc::new(ExchangeClock::new(config.exchange.offset()?));
    let feed = Arc::new(SyntheticChainFeed::new(clock.clone(), seed, start_price));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    runtime.block_on(async move {
        let engine = Arc::new(Engine::new(EngineParts {
            settings,
            feed,
            journal,
            clock: clock.clone(),
            hours: config.market_hours.clone(),
            schedule: config.schedule.clone(),
            buffers: config.buffers,
        }));
        let id = SessionId::new(session);
        if !engine.hours().is_open(clock.now()) {
            info!(now = %clock.now(), "market is closed; jobs will idle until it opens");
        }
        engine.login(&id);

        let deadline = duration_secs.map(|s| tokio::time::Instant::now() + Duration::from_secs(s));
        let mut poll = tokio::time::interval(Duration::from_secs(5));
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = poll.tick() => {
                    if let Some(n) = engine.take_exit_notice(&id).await {
                        println!("EXIT {} {} @ {:?}", n.kind, n.reason, n.exit_premium);
                    }
                    if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
                        break;
                    }
                }
            }
        }

        if let Some(status) = engine.status(&id).await {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        engine.logout(&id);
        Ok::<(), anyhow::Error>(())
    })
}

fn run_settings(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let store = SettingsStore::with_overrides(config.settings_overrides())?;
    println!("{:<30} {:<10} {:<12} Description", "Key", "Kind", "Value");
    for spec in SCHEMA {
        let value = store.get(spec.key).unwrap_or_default();
        println!(
            "{:<30} {:<10} {:<12} {}",
            spec.key, spec.kind, value, spec.description
        );
    }
    Ok(())
}

fn run_history(journal: &Path, limit: Option<usize>, json: bool) -> Result<()> {
    let journal = JsonlJournal::open(journal)?;
    let mut records = journal.history()?;
    if let Some(n) = limit {
        records.truncate(n);
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No signals recorded.");
        return Ok(());
    }
    for r in &records {
        print_record(r);
    }
    Ok(())
}

fn print_record(r: &SignalRecord) {
    let fmt = |v: Option<f64>| v.map_or("-".to_string(), |x| format!("{x:.2}"));
    println!(
        "{:>5}  {}  {:<22} {:<27} strike {:>8}  signal {:>8.2}  entry {:>8}  exit {:>8}  {}",
        r.id.to_string(),
        r.timestamp,
        r.signal_type,
        r.status.to_string(),
        fmt(r.strike),
        r.signal_premium,
        fmt(r.entry_price),
        fmt(r.exit_price),
        r.result.as_deref().unwrap_or("")
    );
}
