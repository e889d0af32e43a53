use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thermoguard_core::VERSION;
use thermoguard_cli::{Config, Supervisor};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Thermoguard - thermal-aware process supervisor
///
/// Launches a command and pauses its whole process tree when the CPU
/// temperature crosses the high threshold, resuming it once cooled down
#[derive(Parser, Debug)]
#[command(name = "thermoguard")]
#[command(version = VERSION)]
#[command(about = "Thermal-aware process tree supervisor", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pause threshold in °C
    #[arg(long)]
    high: Option<f64>,

    /// Resume threshold in °C
    #[arg(long)]
    cool: Option<f64>,

    /// Sampling interval (e.g. "1s", "500ms")
    #[arg(long, value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// Sensor command to query, first word is the program
    #[arg(long, value_name = "CMD")]
    sensor_cmd: Option<String>,

    /// Directory for rolling log files (stdout only when unset)
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Write a JSON stats snapshot here when supervision ends
    #[arg(long, value_name = "PATH")]
    stats_file: Option<PathBuf>,

    /// Write the default configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    generate_config: Option<PathBuf>,

    /// Command to launch and supervise
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("thermoguard: {:#}", e);
            1
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let (mut config, config_note) = load_config(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    init_logging(config.logging.log_dir.as_deref())?;
    if let Some(note) = config_note {
        warn!("{}", note);
    }

    if let Some(output) = &cli.generate_config {
        info!("Generating default configuration file: {:?}", output);
        Config::default()
            .save_to_file(&output.to_string_lossy())
            .map_err(|e| anyhow::anyhow!("Failed to save configuration file: {}", e))?;
        return Ok(0);
    }

    if cli.command.is_empty() {
        eprintln!("Usage: thermoguard [OPTIONS] <command> [args...]");
        return Ok(1);
    }

    info!("Thermoguard v{} starting", VERSION);
    info!(
        "Thresholds: pause at {:.1}°C, resume at {:.1}°C, interval {}ms",
        config.thermal.high_c, config.thermal.cool_c, config.monitoring.tick_interval_ms
    );

    let command = cli.command;
    let supervisor = Supervisor::new(config);
    supervisor.run(&command).await
}

/// Load configuration from file or use defaults.
///
/// Logging is not up yet at load time, so a missing file is reported via
/// the returned note and logged once the subscriber is installed.
fn load_config(path: Option<&Path>) -> Result<(Config, Option<String>)> {
    let Some(path) = path else {
        return Ok((Config::default(), None));
    };

    if path.exists() {
        let config = Config::load_from_file(&path.to_string_lossy())
            .map_err(|e| anyhow::anyhow!("Failed to load configuration file: {}", e))?;
        Ok((config, None))
    } else {
        let note = format!("Configuration file not found: {:?}, using defaults", path);
        Ok((Config::default(), Some(note)))
    }
}

/// CLI flags override config-file values
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(high) = cli.high {
        config.thermal.high_c = high;
    }
    if let Some(cool) = cli.cool {
        config.thermal.cool_c = cool;
    }
    if let Some(interval) = cli.interval {
        config.monitoring.tick_interval_ms = interval.as_millis() as u64;
    }
    if let Some(cmd) = &cli.sensor_cmd {
        let mut words = cmd.split_whitespace().map(String::from);
        if let Some(program) = words.next() {
            config.sensor.program = program;
            config.sensor.args = words.collect();
        }
    }
    if let Some(log_dir) = &cli.log_dir {
        config.logging.log_dir = Some(log_dir.clone());
    }
    if let Some(stats_file) = &cli.stats_file {
        config.logging.stats_file = Some(stats_file.clone());
    }
}

/// Initialize logging with stdout and optional file output
fn init_logging(log_dir: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(false);

    let registry = tracing_subscriber::registry().with(stdout_layer).with(filter);

    if let Some(dir) = log_dir {
        std::fs::create_dir_all(dir)?;

        let file_appender = tracing_appender::rolling::daily(dir, "thermoguard.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true),
            )
            .init();

        // Keep the background writer alive for the process lifetime
        std::mem::forget(guard);
    } else {
        registry.init();
    }

    Ok(())
}
