use crate::config::Config;
use anyhow::{Context, Result};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::Duration;
use thermoguard_core::{
    KillSignaler, PgrepLookup, SensorCommand, SupervisorStats, TemperatureSource,
    ThermalController,
};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Owns the supervised child's lifecycle and drives the thermal
/// controller on a fixed interval until the child exits.
pub struct Supervisor {
    config: Config,
}

impl Supervisor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Spawn `command` and supervise it to completion.
    ///
    /// Returns the process exit code the supervisor itself should exit
    /// with: the child's own status, or 130/143 when a termination
    /// request ended supervision early. Spawn failure is an error.
    pub async fn run(&self, command: &[String]) -> Result<i32> {
        let (program, args) = command
            .split_first()
            .context("No command to supervise")?;

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .spawn()
            .with_context(|| format!("Failed to spawn '{}'", program))?;

        let root = child
            .id()
            .map(|id| Pid::from_raw(id as i32))
            .context("Spawned child has no PID")?;

        info!("Supervising '{}' (pid {})", program, root);

        let sensor = SensorCommand::new(
            self.config.sensor.program.clone(),
            self.config.sensor.args.clone(),
        );
        let mut controller = ThermalController::new(
            root,
            self.config.thermal.high_c,
            self.config.thermal.cool_c,
            PgrepLookup::new(),
            KillSignaler::new(),
        );

        let mut ticker = interval(Duration::from_millis(
            self.config.monitoring.tick_interval_ms,
        ));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Termination requests arrive as polled events between ticks, so
        // shutdown is always a clean cancellation point and the paused
        // set can be released first
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to install SIGINT handler")?;
        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;

        let code = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reading = sensor.sample();
                    match reading {
                        Some(t) => info!("{:.1}°C", t),
                        None => warn!("Temperature unavailable this tick"),
                    }
                    controller.tick(reading);
                }
                status = child.wait() => {
                    let status = status.context("Failed waiting for child")?;
                    // Stopped descendants can outlive the root; make sure
                    // nothing is left frozen
                    controller.release();
                    let code = exit_code(status);
                    info!("Child process has ended with status {}", code);
                    break code;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down");
                    controller.release();
                    break 130;
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    controller.release();
                    break 143;
                }
            }
        };

        self.write_stats(controller.stats());

        Ok(code)
    }

    /// Dump the stats snapshot if a target file is configured.
    /// Failures are logged, never fatal.
    fn write_stats(&self, stats: &SupervisorStats) {
        let Some(path) = &self.config.logging.stats_file else {
            return;
        };

        let json = match serde_json::to_string_pretty(stats) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize stats: {}", e);
                return;
            }
        };

        if let Err(e) = std::fs::write(path, json) {
            warn!("Failed to write stats to {:?}: {}", path, e);
        } else {
            info!("Stats written to {:?}", path);
        }
    }
}

/// Map a child exit status to the supervisor's own exit code.
///
/// A signal-killed child maps to the usual 128+signum convention.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        code
    } else if let Some(sig) = status.signal() {
        128 + sig
    } else {
        1
    }
}
