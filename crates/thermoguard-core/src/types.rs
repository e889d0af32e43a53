use serde::{Deserialize, Serialize};

/// Controller state, persisted across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    Running,
    Paused,
}

/// Outcome of a tick that changed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The tree was paused; `frozen` is the number of descendants captured.
    Paused { frozen: usize },
    /// The captured set was resumed and released.
    Resumed { resumed: usize },
}

/// Supervision counters, exported as JSON on request.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SupervisorStats {
    pub total_ticks: u64,
    pub missed_samples: u64,
    pub total_pauses: u64,
    pub total_resumes: u64,
    pub signals_sent: u64,
}

impl SupervisorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&mut self) {
        self.total_ticks += 1;
    }

    // A tick where the sensor produced no usable reading
    pub fn record_missed_sample(&mut self) {
        self.missed_samples += 1;
    }

    pub fn record_pause(&mut self) {
        self.total_pauses += 1;
    }

    pub fn record_resume(&mut self) {
        self.total_resumes += 1;
    }

    pub fn record_signal(&mut self) {
        self.signals_sent += 1;
    }
}
