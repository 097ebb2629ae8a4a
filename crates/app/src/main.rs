use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use neurocue_app::config::AppConfig;
use neurocue_app::cue::LogPresenter;
use neurocue_app::runtime::SessionController;
use neurocue_app::shutdown::ShutdownHandler;
use neurocue_export::{write_table, SessionStats};
use neurocue_foundation::SessionError;

#[derive(Parser, Debug)]
#[command(name = "neurocue", about = "Motor-imagery session recorder")]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, env = "NEUROCUE_CONFIG")]
    config: Option<PathBuf>,

    /// Destination for the session table (default: session_<timestamp>.csv
    /// in the configured output directory).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Override the number of trials.
    #[arg(long)]
    trials: Option<u32>,

    /// Override the stop grace period in seconds.
    #[arg(long)]
    grace: Option<f64>,

    /// Override the source channel count.
    #[arg(long)]
    channels: Option<usize>,

    /// Override the source sample rate in Hz.
    #[arg(long)]
    rate: Option<f64>,

    /// Walk the task list in order instead of drawing at random.
    #[arg(long, default_value_t = false)]
    fixed_order: bool,
}

fn init_logging() -> anyhow::Result<()> {
    std::fs::create_dir_all("logs").context("creating logs directory")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "neurocue.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(guard);
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(trials) = args.trials {
        config.schedule.max_trials = trials;
    }
    if let Some(grace) = args.grace {
        config.recorder.grace_period_secs = grace;
    }
    if let Some(channels) = args.channels {
        config.source.channels = channels;
    }
    if let Some(rate) = args.rate {
        config.source.rate_hz = rate;
    }
    if args.fixed_order {
        config.schedule.randomize = false;
    }
}

fn output_path(config: &AppConfig, args: &Args) -> PathBuf {
    args.output.clone().unwrap_or_else(|| {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        config.output_dir.join(format!("session_{stamp}.csv"))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    tracing::info!(
        trials = config.schedule.max_trials,
        channels = config.source.channels,
        rate_hz = config.source.rate_hz,
        "starting neurocue session"
    );

    let shutdown = ShutdownHandler::new().install().await;
    let mut controller = SessionController::start(&config, Arc::new(LogPresenter))?;

    let mut poll = tokio::time::interval(Duration::from_millis(200));
    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                tracing::info!("stopping session on request");
                controller.stop();
                break;
            }
            _ = poll.tick() => {
                if controller.is_finished() {
                    break;
                }
            }
        }
    }

    let (snapshot, reason) = controller.finish()?;
    tracing::info!(?reason, "session finished");

    match SessionStats::compute(&snapshot) {
        Ok(stats) => println!("{stats}"),
        Err(SessionError::NoData) => {
            tracing::warn!("no samples recorded, nothing to export");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    let path = output_path(&config, &args);
    write_table(&snapshot, &path)
        .with_context(|| format!("exporting session table to {}", path.display()))?;
    println!("Session table written to {}", path.display());

    Ok(())
}
