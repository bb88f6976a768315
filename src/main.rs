use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use droidmon::config::{self, Config, load_config, load_config_from_path};
use droidmon::device::AdbClient;
use droidmon::error::StartupError;
use droidmon::event::{shutdown_channel, spawn_key_listener, spawn_signal_listener};
use droidmon::logging::{LogSink, init_tracing};
use droidmon::scheduler::Scheduler;
use droidmon::sink::{FileSink, LiveSink, OutputSink, Sink};
use droidmon::system::collector::{Collector, Strategy};
use droidmon::system::filter::{AppFilter, PackagePathTable};
use droidmon::system::sampler::Sampler;

#[derive(Parser, Debug)]
#[command(
    name = "droidmon",
    about = "Sample CPU, memory and storage usage of Android apps over adb"
)]
struct Cli {
    /// Sampling interval in milliseconds
    #[arg(value_parser = parse_interval)]
    interval_ms: u64,

    /// Stop after this many seconds (runs until interrupted when absent)
    #[arg(short = 'r', long = "rtime", value_parser = parse_run_time)]
    rtime: Option<Duration>,

    /// Path to the adb executable
    #[arg(short = 'p', long = "path")]
    path: Option<PathBuf>,

    /// Save samples to this JSON file instead of showing the live table
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read counters from the device's `top` instead of /proc
    #[arg(long)]
    top: bool,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_interval(raw: &str) -> Result<u64, String> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("`{raw}` is not a number of milliseconds"));
    }
    match raw.parse::<u64>() {
        Ok(0) => Err("interval must be greater than 0".to_string()),
        Ok(ms) => Ok(ms),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_run_time(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("`{raw}` is not a valid run time"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);

    let log_sink = match (&config.logging.file, &cli.output) {
        (Some(path), _) => LogSink::File(path),
        (None, Some(_)) => LogSink::Stderr,
        (None, None) => LogSink::Silent,
    };
    init_tracing(&config.logging.level, log_sink, config.logging.json)?;

    match run(&cli, &config).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(report) => match report.downcast_ref::<StartupError>() {
            Some(err) => {
                tracing::error!(%err, "startup failed");
                eprintln!("{err}");
                Ok(ExitCode::from(err.exit_code()))
            }
            None => Err(report),
        },
    }
}

async fn run(cli: &Cli, config: &Config) -> Result<()> {
    let client = AdbClient::new(
        &config.device.adb_path,
        Duration::from_secs(config.device.command_timeout_secs),
    )?;
    let devices = client
        .connected_devices()
        .await
        .map_err(StartupError::from)?;
    if devices.is_empty() {
        return Err(StartupError::NoDevice.into());
    }
    tracing::info!(?devices, adb = %client.adb_path().display(), "device connected");

    let strategy = resolve_strategy(&client, config.sampling.strategy).await;
    let filter = AppFilter::new(&config.sampling.app_prefix);

    println!("Reading package information...");
    let packages = PackagePathTable::load(&client, &filter).await;
    tracing::info!(packages = packages.len(), strategy = strategy.label(), "starting sampler");

    let collector = Collector::new(client, strategy, filter).with_top_timing(
        config.sampling.top_iterations,
        config.sampling.top_delay_secs,
    );
    let sampler = Sampler::new(collector, packages);
    let mut scheduler = Scheduler::new(sampler, Duration::from_millis(cli.interval_ms), cli.rtime);

    let (trigger, mut shutdown) = shutdown_channel();
    let _signals = spawn_signal_listener(trigger.clone());
    let mut sink = match &cli.output {
        Some(path) => OutputSink::File(FileSink::new(path)),
        None => {
            let _keys = spawn_key_listener(trigger);
            OutputSink::Live(LiveSink::init())
        }
    };

    let outcome = scheduler.run(&mut sink, &mut shutdown).await;
    let finished = sink.finish();
    let summary = outcome?;
    finished?;
    tracing::info!(
        iterations = summary.iterations,
        frames = summary.frames,
        "done"
    );
    Ok(())
}

/// `top` mode needs the tool on the device; otherwise fall back to /proc.
async fn resolve_strategy(client: &AdbClient, requested: Strategy) -> Strategy {
    if requested == Strategy::Top && !client.has_program("top").await {
        tracing::warn!("top not found on device, falling back to proc");
        eprintln!("`top` is not available on the device, sampling /proc instead");
        return Strategy::Proc;
    }
    requested
}

fn load_config_for_cli(cli: &Cli) -> config::Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(ref path) = cli.path {
        config.device.adb_path = path.clone();
    }
    if cli.top {
        config.sampling.strategy = Strategy::Top;
    }
    if let Some(ref file) = cli.log_file {
        config.logging.file = Some(file.clone());
    }

    config
}
