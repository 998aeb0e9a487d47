//! ReelForge Session - headless spin loop
//!
//! Runs game logic on a worker thread and the presentation on the main
//! thread, linked by a channel pair.
//!
//! Usage:
//!   rf-session --spins 20 --seed 7
//!   rf-session --config session.json --realtime --verbose

mod logic;
mod messages;
mod presentation;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use rf_bus::{ChannelPair, Context};
use rf_core::RuntimeConfig;

use logic::LogicContext;
use presentation::{PresentationContext, PresentationOptions};

#[derive(Parser)]
#[command(name = "rf-session", about = "ReelForge headless spin session")]
struct Cli {
    /// Number of spins to play
    #[arg(short, long, default_value_t = 10)]
    spins: u32,

    /// Presentation frame rate
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Runtime config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    /// RNG seed for spin outcomes (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Bet per spin
    #[arg(short, long, default_value_t = 10)]
    bet: u64,

    /// Skip win rollups
    #[arg(long)]
    skip_rollups: bool,

    /// Sleep between frames instead of running as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Give up after this many wall-clock seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    let seed = cli.seed.unwrap_or_else(rand::random);
    log::info!("Starting session: {} spin(s), bet {}, seed {}", cli.spins, cli.bet, seed);

    let pair = ChannelPair::new(config.bus.clone());
    pair.init()?;
    let logic_link = pair.link(Context::Logic)?;
    let presentation_link = pair.link(Context::Presentation)?;

    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
    let bet = cli.bet;
    let logic = thread::Builder::new()
        .name("rf-logic".into())
        .spawn(move || LogicContext::new(logic_link, seed, bet).run(shutdown_rx))
        .context("failed to spawn logic thread")?;

    let (wake_tx, wake_rx) = crossbeam_channel::bounded::<()>(1);
    let inbound = Arc::clone(&presentation_link.inbound);
    let listener = inbound.on_arrival(move || {
        let _ = wake_tx.try_send(());
    });

    let options = PresentationOptions {
        spins: cli.spins,
        skip_rollups: cli.skip_rollups,
        ..PresentationOptions::default()
    };
    let outcome = {
        let mut presentation =
            PresentationContext::new(presentation_link, config.scheduler.clone(), options);
        presentation.run(
            cli.fps,
            cli.realtime,
            Duration::from_secs(cli.timeout_secs),
            &wake_rx,
        )
    };

    inbound.remove_arrival_listener(listener);
    drop(shutdown_tx);
    let logic_report = logic
        .join()
        .map_err(|_| anyhow!("logic thread panicked"))?;
    pair.deinit();

    let report = outcome?;
    log::info!(
        "Logic played {} spin(s), {} acknowledged",
        logic_report.spins,
        logic_report.acknowledged
    );
    let rtp = if logic_report.wagered > 0 {
        100.0 * logic_report.won as f64 / logic_report.wagered as f64
    } else {
        0.0
    };
    println!(
        "spins {}  wagered {}  won {}  rtp {:.1}%  frames {}  game time {:.2}s",
        report.completed,
        logic_report.wagered,
        report.shown_won,
        rtp,
        report.frames,
        report.game_time
    );
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
