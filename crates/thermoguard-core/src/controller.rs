use crate::proctree::{ChildLookup, DescendantWalk};
use crate::signaler::{ProcessSignaler, SignalKind};
use crate::types::{ControllerState, SupervisorStats, Transition};
use nix::unistd::Pid;
use tracing::{debug, info};

/// Pause threshold in degrees Celsius.
pub const DEFAULT_HIGH_C: f64 = 90.0;

/// Resume threshold in degrees Celsius.
pub const DEFAULT_COOL_C: f64 = 77.0;

/// Two-state hysteresis machine driving thermal pause/resume of a
/// supervised process tree.
///
/// While `Running`, a reading at or above the high threshold captures the
/// descendants of the root, pauses each as it is discovered, and moves to
/// `Paused`. While `Paused`, a reading at or below the cool threshold
/// resumes exactly the captured set and moves back to `Running`. Readings
/// between the thresholds change nothing, which keeps the tree from
/// oscillating at a single boundary.
///
/// The frozen set is a snapshot taken at pause time: descendants spawned
/// while the tree is paused are not discovered and not signaled.
pub struct ThermalController<L, S> {
    root: Pid,
    high_c: f64,
    cool_c: f64,
    state: ControllerState,
    frozen: Vec<Pid>,
    lookup: L,
    signaler: S,
    stats: SupervisorStats,
}

impl<L: ChildLookup, S: ProcessSignaler> ThermalController<L, S> {
    /// Create a controller for the tree rooted at `root`.
    ///
    /// # Arguments
    /// * `root` - PID of the supervised child
    /// * `high_c` - reading at or above this pauses the tree (e.g. 90.0)
    /// * `cool_c` - reading at or below this resumes it (e.g. 77.0)
    pub fn new(root: Pid, high_c: f64, cool_c: f64, lookup: L, signaler: S) -> Self {
        Self {
            root,
            high_c,
            cool_c,
            state: ControllerState::Running,
            frozen: Vec::new(),
            lookup,
            signaler,
            stats: SupervisorStats::new(),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// PIDs captured by the current pause episode, in discovery order.
    pub fn frozen(&self) -> &[Pid] {
        &self.frozen
    }

    pub fn stats(&self) -> &SupervisorStats {
        &self.stats
    }

    /// Evaluate one temperature sample.
    ///
    /// `None` means the sensor produced nothing usable this tick; state is
    /// left untouched. Returns the transition that fired, if any.
    pub fn tick(&mut self, reading: Option<f64>) -> Option<Transition> {
        self.stats.record_tick();

        let reading = match reading {
            Some(t) => t,
            None => {
                self.stats.record_missed_sample();
                debug!("No reading this tick, state unchanged");
                return None;
            }
        };

        match self.state {
            ControllerState::Running if reading >= self.high_c => Some(self.pause(reading)),
            ControllerState::Paused if reading <= self.cool_c => Some(self.resume(reading)),
            _ => None,
        }
    }

    /// Capture and pause the descendant tree, then report `Paused`.
    ///
    /// Each PID is signaled the moment it is discovered, so an already
    /// runaway tree stops growing hotter while the walk is still going.
    /// A root with no descendants still moves the state to `Paused`.
    fn pause(&mut self, reading: f64) -> Transition {
        info!(
            "Temperature {:.1}°C reached {:.1}°C, pausing the command and its descendants",
            reading, self.high_c
        );

        for pid in DescendantWalk::new(&self.lookup, self.root) {
            self.signaler.send(pid, SignalKind::Pause);
            self.stats.record_signal();
            self.frozen.push(pid);
        }

        self.state = ControllerState::Paused;
        self.stats.record_pause();

        if self.frozen.is_empty() {
            info!("No descendants found to pause");
        } else {
            info!("Paused {} processes: {:?}", self.frozen.len(), self.raw_frozen());
        }

        Transition::Paused {
            frozen: self.frozen.len(),
        }
    }

    /// Resume exactly the set captured at pause time and release it.
    fn resume(&mut self, reading: f64) -> Transition {
        info!(
            "Temperature {:.1}°C dropped below {:.1}°C, resuming the command and its descendants",
            reading, self.cool_c
        );

        for pid in &self.frozen {
            self.signaler.send(*pid, SignalKind::Resume);
            self.stats.record_signal();
        }

        let resumed = self.frozen.len();
        self.frozen.clear();
        self.state = ControllerState::Running;
        self.stats.record_resume();

        Transition::Resumed { resumed }
    }

    /// Resume a paused tree outside the normal threshold logic.
    ///
    /// Called on supervisor shutdown so a termination request never leaves
    /// stopped processes behind. No-op while `Running`.
    pub fn release(&mut self) {
        if self.state != ControllerState::Paused {
            return;
        }

        info!(
            "Releasing {} paused processes before shutdown",
            self.frozen.len()
        );
        for pid in &self.frozen {
            self.signaler.send(*pid, SignalKind::Resume);
        }
        self.frozen.clear();
        self.state = ControllerState::Running;
    }

    fn raw_frozen(&self) -> Vec<i32> {
        self.frozen.iter().map(|pid| pid.as_raw()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    /// Mutable in-memory process table shared with the test body.
    #[derive(Clone, Default)]
    struct FakeLookup {
        children: Rc<RefCell<HashMap<i32, Vec<i32>>>>,
        walks: Rc<Cell<usize>>,
        failing: Rc<Cell<bool>>,
    }

    impl FakeLookup {
        fn with_tree(edges: &[(i32, &[i32])]) -> Self {
            let lookup = Self::default();
            for (parent, kids) in edges {
                lookup
                    .children
                    .borrow_mut()
                    .insert(*parent, kids.to_vec());
            }
            lookup
        }

        fn add_child(&self, parent: i32, child: i32) {
            self.children
                .borrow_mut()
                .entry(parent)
                .or_default()
                .push(child);
        }
    }

    impl ChildLookup for FakeLookup {
        fn children_of(&self, pid: Pid) -> Result<Vec<Pid>> {
            self.walks.set(self.walks.get() + 1);
            if self.failing.get() {
                return Err(Error::Tree("lookup unavailable".to_string()));
            }
            Ok(self
                .children
                .borrow()
                .get(&pid.as_raw())
                .map(|kids| kids.iter().map(|raw| Pid::from_raw(*raw)).collect())
                .unwrap_or_default())
        }
    }

    /// Records every signal instead of delivering it.
    #[derive(Clone, Default)]
    struct RecordingSignaler {
        sent: Rc<RefCell<Vec<(i32, SignalKind)>>>,
    }

    impl RecordingSignaler {
        fn sent(&self) -> Vec<(i32, SignalKind)> {
            self.sent.borrow().clone()
        }
    }

    impl ProcessSignaler for RecordingSignaler {
        fn send(&self, pid: Pid, kind: SignalKind) {
            self.sent.borrow_mut().push((pid.as_raw(), kind));
        }
    }

    const ROOT: i32 = 100;

    fn controller(
        lookup: &FakeLookup,
        signaler: &RecordingSignaler,
    ) -> ThermalController<FakeLookup, RecordingSignaler> {
        ThermalController::new(
            Pid::from_raw(ROOT),
            DEFAULT_HIGH_C,
            DEFAULT_COOL_C,
            lookup.clone(),
            signaler.clone(),
        )
    }

    #[test]
    fn test_starts_running_with_empty_set() {
        let lookup = FakeLookup::default();
        let signaler = RecordingSignaler::default();
        let ctrl = controller(&lookup, &signaler);

        assert_eq!(ctrl.state(), ControllerState::Running);
        assert!(ctrl.frozen().is_empty());
    }

    #[test]
    fn test_full_episode_sequence() {
        // Readings 85, 91, 95, 80, 76 with thresholds 90/77: pause fires
        // on the second tick, resume on the fifth, nothing in between
        let lookup = FakeLookup::with_tree(&[(ROOT, &[101, 102]), (101, &[103])]);
        let signaler = RecordingSignaler::default();
        let mut ctrl = controller(&lookup, &signaler);

        assert_eq!(ctrl.tick(Some(85.0)), None);
        assert_eq!(ctrl.state(), ControllerState::Running);

        assert_eq!(ctrl.tick(Some(91.0)), Some(Transition::Paused { frozen: 3 }));
        assert_eq!(ctrl.state(), ControllerState::Paused);
        assert_eq!(
            signaler.sent(),
            vec![
                (101, SignalKind::Pause),
                (103, SignalKind::Pause),
                (102, SignalKind::Pause),
            ]
        );

        assert_eq!(ctrl.tick(Some(95.0)), None);
        assert_eq!(ctrl.tick(Some(80.0)), None);
        assert_eq!(ctrl.state(), ControllerState::Paused);

        assert_eq!(ctrl.tick(Some(76.0)), Some(Transition::Resumed { resumed: 3 }));
        assert_eq!(ctrl.state(), ControllerState::Running);
        assert!(ctrl.frozen().is_empty());

        // Resume targets exactly the captured set, in capture order
        let resumes: Vec<(i32, SignalKind)> = signaler
            .sent()
            .into_iter()
            .filter(|(_, kind)| *kind == SignalKind::Resume)
            .collect();
        assert_eq!(
            resumes,
            vec![
                (101, SignalKind::Resume),
                (103, SignalKind::Resume),
                (102, SignalKind::Resume),
            ]
        );
    }

    #[test]
    fn test_hysteresis_band_holds_state() {
        let lookup = FakeLookup::with_tree(&[(ROOT, &[101])]);
        let signaler = RecordingSignaler::default();
        let mut ctrl = controller(&lookup, &signaler);

        ctrl.tick(Some(95.0));
        assert_eq!(ctrl.state(), ControllerState::Paused);

        // Anywhere strictly between cool and high: no transition
        for reading in [77.1, 80.0, 85.0, 89.9] {
            assert_eq!(ctrl.tick(Some(reading)), None);
            assert_eq!(ctrl.state(), ControllerState::Paused);
        }

        ctrl.tick(Some(77.0));
        assert_eq!(ctrl.state(), ControllerState::Running);

        // Same band while running: also no transition
        for reading in [77.1, 85.0, 89.9] {
            assert_eq!(ctrl.tick(Some(reading)), None);
            assert_eq!(ctrl.state(), ControllerState::Running);
        }
    }

    #[test]
    fn test_no_second_enumeration_while_paused() {
        let lookup = FakeLookup::with_tree(&[(ROOT, &[101])]);
        let signaler = RecordingSignaler::default();
        let mut ctrl = controller(&lookup, &signaler);

        ctrl.tick(Some(92.0));
        let walks_after_pause = lookup.walks.get();
        let signals_after_pause = signaler.sent().len();

        // Two more hot readings while already paused: no new walk, no
        // new signals
        ctrl.tick(Some(95.0));
        ctrl.tick(Some(99.0));

        assert_eq!(lookup.walks.get(), walks_after_pause);
        assert_eq!(signaler.sent().len(), signals_after_pause);
    }

    #[test]
    fn test_childless_pause_still_transitions() {
        let lookup = FakeLookup::default();
        let signaler = RecordingSignaler::default();
        let mut ctrl = controller(&lookup, &signaler);

        assert_eq!(ctrl.tick(Some(95.0)), Some(Transition::Paused { frozen: 0 }));
        assert_eq!(ctrl.state(), ControllerState::Paused);
        assert!(signaler.sent().is_empty());

        // Stays paused until a cool reading arrives
        assert_eq!(ctrl.tick(Some(85.0)), None);
        assert_eq!(ctrl.state(), ControllerState::Paused);

        assert_eq!(ctrl.tick(Some(77.0)), Some(Transition::Resumed { resumed: 0 }));
        assert_eq!(ctrl.state(), ControllerState::Running);
    }

    #[test]
    fn test_absent_reading_changes_nothing() {
        let lookup = FakeLookup::with_tree(&[(ROOT, &[101])]);
        let signaler = RecordingSignaler::default();
        let mut ctrl = controller(&lookup, &signaler);

        assert_eq!(ctrl.tick(None), None);
        assert_eq!(ctrl.state(), ControllerState::Running);

        ctrl.tick(Some(95.0));
        let frozen_before = ctrl.frozen().to_vec();

        // Absent reading while paused: set and state untouched
        assert_eq!(ctrl.tick(None), None);
        assert_eq!(ctrl.state(), ControllerState::Paused);
        assert_eq!(ctrl.frozen(), frozen_before.as_slice());
    }

    #[test]
    fn test_absent_readings_forever_never_signal() {
        let lookup = FakeLookup::with_tree(&[(ROOT, &[101])]);
        let signaler = RecordingSignaler::default();
        let mut ctrl = controller(&lookup, &signaler);

        for _ in 0..50 {
            assert_eq!(ctrl.tick(None), None);
        }

        assert_eq!(ctrl.state(), ControllerState::Running);
        assert!(signaler.sent().is_empty());
        assert_eq!(ctrl.stats().missed_samples, 50);
    }

    #[test]
    fn test_resume_ignores_processes_spawned_while_paused() {
        let lookup = FakeLookup::with_tree(&[(ROOT, &[101])]);
        let signaler = RecordingSignaler::default();
        let mut ctrl = controller(&lookup, &signaler);

        ctrl.tick(Some(95.0));
        assert_eq!(ctrl.frozen().len(), 1);

        // A new descendant appears while the tree is paused; only the
        // snapshot taken at pause time is resumed
        lookup.add_child(ROOT, 102);
        ctrl.tick(Some(70.0));

        let resumes: Vec<i32> = signaler
            .sent()
            .into_iter()
            .filter(|(_, kind)| *kind == SignalKind::Resume)
            .map(|(pid, _)| pid)
            .collect();
        assert_eq!(resumes, vec![101]);
    }

    #[test]
    fn test_pause_with_failing_lookup_is_childless_pause() {
        let lookup = FakeLookup::with_tree(&[(ROOT, &[101])]);
        lookup.failing.set(true);
        let signaler = RecordingSignaler::default();
        let mut ctrl = controller(&lookup, &signaler);

        assert_eq!(ctrl.tick(Some(95.0)), Some(Transition::Paused { frozen: 0 }));
        assert_eq!(ctrl.state(), ControllerState::Paused);
        assert!(signaler.sent().is_empty());
    }

    #[test]
    fn test_release_resumes_paused_tree() {
        let lookup = FakeLookup::with_tree(&[(ROOT, &[101, 102])]);
        let signaler = RecordingSignaler::default();
        let mut ctrl = controller(&lookup, &signaler);

        ctrl.tick(Some(95.0));
        ctrl.release();

        assert_eq!(ctrl.state(), ControllerState::Running);
        assert!(ctrl.frozen().is_empty());

        let resumes: Vec<i32> = signaler
            .sent()
            .into_iter()
            .filter(|(_, kind)| *kind == SignalKind::Resume)
            .map(|(pid, _)| pid)
            .collect();
        assert_eq!(resumes, vec![101, 102]);
    }

    #[test]
    fn test_release_while_running_is_noop() {
        let lookup = FakeLookup::with_tree(&[(ROOT, &[101])]);
        let signaler = RecordingSignaler::default();
        let mut ctrl = controller(&lookup, &signaler);

        ctrl.release();

        assert_eq!(ctrl.state(), ControllerState::Running);
        assert!(signaler.sent().is_empty());
    }

    #[test]
    fn test_exact_thresholds_are_inclusive() {
        let lookup = FakeLookup::with_tree(&[(ROOT, &[101])]);
        let signaler = RecordingSignaler::default();
        let mut ctrl = controller(&lookup, &signaler);

        // Exactly the high threshold pauses
        assert!(ctrl.tick(Some(90.0)).is_some());
        assert_eq!(ctrl.state(), ControllerState::Paused);

        // Exactly the cool threshold resumes
        assert!(ctrl.tick(Some(77.0)).is_some());
        assert_eq!(ctrl.state(), ControllerState::Running);
    }

    #[test]
    fn test_stats_track_episodes() {
        let lookup = FakeLookup::with_tree(&[(ROOT, &[101, 102])]);
        let signaler = RecordingSignaler::default();
        let mut ctrl = controller(&lookup, &signaler);

        ctrl.tick(Some(50.0));
        ctrl.tick(None);
        ctrl.tick(Some(95.0));
        ctrl.tick(Some(70.0));

        let stats = ctrl.stats();
        assert_eq!(stats.total_ticks, 4);
        assert_eq!(stats.missed_samples, 1);
        assert_eq!(stats.total_pauses, 1);
        assert_eq!(stats.total_resumes, 1);
        // Two pause signals + two resume signals
        assert_eq!(stats.signals_sent, 4);
    }
}
