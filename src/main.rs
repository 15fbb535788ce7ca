//! Application entry point for ttstreambot.
//!
//! # Startup sequence
//!
//! 1. Parse the command line and initialise logging.
//! 2. Bootstrap the config directory; a fresh one exits with guidance.
//! 3. Load and validate [`BotConfig`], log a summary.
//! 4. Build the voice table, destinations, Festival synthesizer.
//! 5. Start `baresip`, register the SIP account and wrap it in the
//!    [`CallOrchestrator`].
//! 6. Spawn the redemption consumer.
//! 7. Feed it: the fixture (`--test-baresip`) or notifications on stdin.
//! 8. Shut down: cancel, drain the consumer, quit `baresip`.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ttstreambot::{
    call::{CallOrchestrator, CallTimings, TokioClock},
    config::{Bootstrap, BotConfig, ConfigPaths},
    phone::{BaresipOptions, BaresipPhone, BaresipTimings, CallStack, DestinationRegistry},
    redemption::{self, Admission, RedemptionQueue, RedemptionRouter},
    synth::FestivalSynthesizer,
    voice::VoiceTable,
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "ttstreambot", version, about = "Phone calls from channel-point redemptions")]
struct Cli {
    /// Configuration directory [default: ~/.config/ttstreambot]
    #[arg(short, long, value_name = "PATH")]
    config_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG overrides it
    #[arg(short, long, default_value = "info", value_parser = parse_log_level)]
    log_level: log::LevelFilter,

    /// Forward baresip's own output to the debug log
    #[arg(long)]
    baresip_debug: bool,

    /// Place one call from a canned redemption instead of reading the live feed
    #[arg(long)]
    test_baresip: bool,

    /// Redemption notification replayed by --test-baresip
    #[arg(long, value_name = "FILE", default_value = "redemption.json")]
    fixture: PathBuf,
}

fn parse_log_level(value: &str) -> Result<log::LevelFilter, String> {
    value.parse().map_err(|_| {
        format!("unknown log level '{value}' (expected off, error, warn, info, debug or trace)")
    })
}

fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .format(|buf, record| writeln!(buf, "[{:<8}] {}", record.level(), record.args()))
        .init();
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", style(format!("{e:#}")).red());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let paths = ConfigPaths::new(
        cli.config_dir
            .clone()
            .unwrap_or_else(ConfigPaths::default_dir),
    );
    let config_dir = paths.config_dir.clone();

    let bootstrap = paths
        .ensure_defaults()
        .with_context(|| format!("cannot prepare {}", config_dir.display()))?;
    if bootstrap == Bootstrap::Created {
        eprintln!(
            "{}",
            style(format!(
                "Created a default configuration in {}.\n\
                 Fill in {} (Twitch credentials, phone destinations, SIP gateway) and start again.",
                config_dir.display(),
                paths.settings_file.display()
            ))
            .yellow()
        );
        return Ok(ExitCode::FAILURE);
    }

    let config = match BotConfig::load_from(&paths.settings_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", style(format!("Configuration error: {e}")).red());
            return Ok(ExitCode::FAILURE);
        }
    };
    let baresip_dir = config.baresip.resolve_dir(&config_dir);
    config.log_summary(&baresip_dir);

    // --- Routing pieces ----------------------------------------------------
    let voices = VoiceTable::from_config(&config.festival).context("voice table")?;
    let destinations =
        DestinationRegistry::from_config(&config.phone).context("phone destinations")?;
    let synth = Arc::new(FestivalSynthesizer::new(&config.festival.text2wave));

    // --- Call stack --------------------------------------------------------
    let phone = Arc::new(
        BaresipPhone::start(&BaresipOptions {
            binary: config.baresip.binary.clone(),
            config_dir: baresip_dir,
            debug: cli.baresip_debug,
            account: Some(config.baresip.account()),
            timings: BaresipTimings::default(),
        })
        .await
        .context("cannot start baresip")?,
    );

    let cancel = CancellationToken::new();
    let orchestrator = Arc::new(CallOrchestrator::new(
        phone.clone(),
        Arc::new(TokioClock),
        CallTimings::from_config(&config.phone),
        cancel.clone(),
    ));
    let router = Arc::new(
        RedemptionRouter::new(voices, destinations, synth, orchestrator)
            .with_name_underscores_replaced(config.festival.replace_name_underscores),
    );

    let (queue, rx) = RedemptionQueue::new();
    let consumer = tokio::spawn(redemption::run_consumer(router, rx, cancel.clone()));

    // --- Feed --------------------------------------------------------------
    let fed = if cli.test_baresip {
        replay(&cli.fixture, queue).await
    } else {
        listen(queue, &cancel).await;
        Ok(())
    };

    finish(consumer, &cancel).await;
    if let Err(e) = phone.quit().await {
        log::warn!("baresip did not shut down cleanly: {e}");
    }
    log::info!("bye");

    fed.map(|()| ExitCode::SUCCESS)
}

/// Replay the fixture once; the queue is dropped so the consumer stops after
/// the call.
async fn replay(fixture: &std::path::Path, queue: RedemptionQueue) -> Result<()> {
    let admission = redemption::replay_fixture(fixture, &queue)
        .await
        .with_context(|| format!("cannot replay {}", fixture.display()))?;
    if admission != Admission::Accepted {
        log::warn!("test redemption was not admitted ({admission:?})");
    }
    Ok(())
}

/// Read notifications from stdin until EOF or Ctrl-C.
async fn listen(queue: RedemptionQueue, cancel: &CancellationToken) {
    log::info!("waiting for redemptions on stdin");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());

    tokio::select! {
        read = redemption::read_lines(stdin, &queue, cancel) => match read {
            Ok(accepted) => log::info!("notification feed closed after {accepted} redemption(s)"),
            Err(e) => log::error!("notification feed failed: {e}"),
        },
        _ = tokio::signal::ctrl_c() => {
            log::info!("interrupted, shutting down");
            cancel.cancel();
        }
    }
}

/// Let the consumer drain; a Ctrl-C meanwhile cancels the call in progress.
async fn finish(mut consumer: JoinHandle<()>, cancel: &CancellationToken) {
    tokio::select! {
        joined = &mut consumer => {
            if let Err(e) = joined {
                log::error!("redemption consumer crashed: {e}");
            }
            return;
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("interrupted, cancelling the call in progress");
            cancel.cancel();
        }
    }
    if let Err(e) = consumer.await {
        log::error!("redemption consumer crashed: {e}");
    }
}
