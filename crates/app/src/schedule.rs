use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use neurocue_foundation::{SessionError, SharedClock};
use neurocue_stream::MarkerOutlet;

use crate::cue::CuePresenter;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Human-readable task names; marker labels are derived from these.
    pub tasks: Vec<String>,
    /// Imagined-movement epoch length.
    pub trial_secs: f64,
    /// Baseline period between trials.
    pub rest_secs: f64,
    pub max_trials: u32,
    /// Uniform random task selection; round-robin when false.
    pub randomize: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tasks: vec![
                "Clench Left Hand".into(),
                "Clench Right Hand".into(),
                "Open Left Hand".into(),
                "Open Right Hand".into(),
                "Stick Out Tongue".into(),
            ],
            trial_secs: 4.0,
            rest_secs: 4.0,
            max_trials: 50,
            randomize: true,
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.tasks.is_empty() {
            return Err(SessionError::Config("schedule has no tasks".into()));
        }
        if self.trial_secs < 0.0 || self.rest_secs < 0.0 {
            return Err(SessionError::Config(
                "trial and rest durations must be non-negative".into(),
            ));
        }
        if self.max_trials == 0 {
            return Err(SessionError::Config("max_trials must be at least 1".into()));
        }
        Ok(())
    }
}

/// Marker label for a task cue: lowercased, underscored, `_start` phase
/// suffix. "Clench Left Hand" -> "clench_left_hand_start".
pub fn task_label(task: &str) -> String {
    let mut slug = task.to_lowercase().replace(' ', "_");
    slug.push_str("_start");
    slug
}

/// The foreground cue loop: walks the trial sequence, emits a marker at
/// every phase boundary, and reports cue transitions to the presenter. It
/// only ever touches the marker outlet, so it can never block on recording
/// I/O.
pub struct TrialSchedule {
    cfg: ScheduleConfig,
    outlet: MarkerOutlet,
    presenter: Arc<dyn CuePresenter>,
    clock: SharedClock,
}

impl TrialSchedule {
    pub fn new(
        cfg: ScheduleConfig,
        outlet: MarkerOutlet,
        presenter: Arc<dyn CuePresenter>,
        clock: SharedClock,
    ) -> Self {
        Self {
            cfg,
            outlet,
            presenter,
            clock,
        }
    }

    pub fn run(&mut self, running: Arc<AtomicBool>) {
        tracing::info!(
            trials = self.cfg.max_trials,
            tasks = self.cfg.tasks.len(),
            "trial schedule started"
        );
        self.outlet.emit("session_start");

        let mut rng = SmallRng::from_entropy();
        let mut completed = 0u32;
        while running.load(Ordering::SeqCst) && completed < self.cfg.max_trials {
            let index = if self.cfg.randomize {
                rng.gen_range(0..self.cfg.tasks.len())
            } else {
                completed as usize % self.cfg.tasks.len()
            };
            let task = self.cfg.tasks[index].clone();

            self.presenter
                .task_cue(&task, completed + 1, self.cfg.max_trials);
            self.outlet.emit(task_label(&task));
            if !self.pause(self.cfg.trial_secs, &running) {
                break;
            }
            completed += 1;

            self.presenter.rest_cue();
            self.outlet.emit("rest_period_start");
            if !self.pause(self.cfg.rest_secs, &running) {
                break;
            }
        }

        if running.load(Ordering::SeqCst) && completed >= self.cfg.max_trials {
            self.outlet.emit("session_complete");
            self.presenter.session_complete();
        } else {
            self.outlet.emit("session_stop");
            self.presenter.session_stopped();
        }
        tracing::info!(completed, "trial schedule finished");
    }

    /// Sliced sleep so an external stop is honored within one slice.
    fn pause(&self, secs: f64, running: &Arc<AtomicBool>) -> bool {
        let slice = Duration::from_millis(50);
        let deadline = self.clock.now() + Duration::from_secs_f64(secs);
        loop {
            let now = self.clock.now();
            if now >= deadline {
                return true;
            }
            if !running.load(Ordering::SeqCst) {
                return false;
            }
            let remaining = deadline.saturating_duration_since(now);
            self.clock.sleep(remaining.min(slice));
        }
    }
}

/// Handle to the dedicated schedule thread.
pub struct ScheduleHandle {
    handle: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl ScheduleHandle {
    pub fn spawn(mut schedule: TrialSchedule) -> Result<Self, SessionError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let handle = thread::Builder::new()
            .name("trial-schedule".to_string())
            .spawn(move || schedule.run(flag))
            .map_err(|e| SessionError::Config(format!("failed to spawn schedule thread: {e}")))?;
        Ok(Self { handle, running })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Halt after the current slice; the runner emits `session_stop` on the
    /// way out.
    pub fn stop(self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.handle.join();
    }

    pub fn join(self) {
        let _ = self.handle.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocue_foundation::test_clock;
    use neurocue_stream::{marker_channel, MarkerSource};
    use parking_lot::Mutex;

    struct RecordingPresenter {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingPresenter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl CuePresenter for RecordingPresenter {
        fn task_cue(&self, task: &str, _trial: u32, _total: u32) {
            self.calls.lock().push(format!("task:{task}"));
        }
        fn rest_cue(&self) {
            self.calls.lock().push("rest".into());
        }
        fn session_complete(&self) {
            self.calls.lock().push("complete".into());
        }
        fn session_stopped(&self) {
            self.calls.lock().push("stopped".into());
        }
    }

    fn drain_labels(inlet: &mut impl MarkerSource) -> Vec<String> {
        let mut labels = Vec::new();
        while let Ok(Some(event)) = inlet.poll_nonblocking() {
            labels.push(event.label);
        }
        labels
    }

    #[test]
    fn task_label_slugs() {
        assert_eq!(task_label("Clench Left Hand"), "clench_left_hand_start");
        assert_eq!(task_label("Rest"), "rest_start");
    }

    #[test]
    fn emits_full_marker_sequence_in_fixed_order() {
        let clock = test_clock();
        let (outlet, mut inlet) = marker_channel(clock.clone());
        let presenter = RecordingPresenter::new();
        let cfg = ScheduleConfig {
            tasks: vec!["Left Hand".into(), "Right Hand".into()],
            trial_secs: 0.2,
            rest_secs: 0.1,
            max_trials: 3,
            randomize: false,
        };
        let mut schedule = TrialSchedule::new(cfg, outlet, presenter.clone(), clock.clone());

        // Virtual clock: pauses advance time instead of blocking.
        schedule.run(Arc::new(AtomicBool::new(true)));

        let labels = drain_labels(&mut inlet);
        assert_eq!(
            labels,
            vec![
                "session_start",
                "left_hand_start",
                "rest_period_start",
                "right_hand_start",
                "rest_period_start",
                "left_hand_start",
                "rest_period_start",
                "session_complete",
            ]
        );
        assert_eq!(presenter.calls.lock().last().unwrap(), "complete");
    }

    #[test]
    fn random_mode_draws_from_task_set() {
        let clock = test_clock();
        let (outlet, mut inlet) = marker_channel(clock.clone());
        let cfg = ScheduleConfig {
            tasks: vec!["Left Hand".into(), "Right Hand".into()],
            trial_secs: 0.0,
            rest_secs: 0.0,
            max_trials: 10,
            randomize: true,
        };
        let mut schedule =
            TrialSchedule::new(cfg, outlet, RecordingPresenter::new(), clock.clone());
        schedule.run(Arc::new(AtomicBool::new(true)));

        let labels = drain_labels(&mut inlet);
        let task_cues: Vec<&String> = labels
            .iter()
            .filter(|l| l.ends_with("_hand_start"))
            .collect();
        assert_eq!(task_cues.len(), 10);
        for cue in task_cues {
            assert!(
                cue == "left_hand_start" || cue == "right_hand_start",
                "unexpected cue {cue}"
            );
        }
    }

    #[test]
    fn external_stop_emits_session_stop() {
        let clock = test_clock();
        let (outlet, mut inlet) = marker_channel(clock.clone());
        let presenter = RecordingPresenter::new();
        let cfg = ScheduleConfig {
            tasks: vec!["Left Hand".into()],
            trial_secs: 0.0,
            rest_secs: 0.0,
            max_trials: 5,
            randomize: false,
        };
        let mut schedule = TrialSchedule::new(cfg, outlet, presenter.clone(), clock.clone());

        // Never allowed to run: stops before the first trial completes.
        schedule.run(Arc::new(AtomicBool::new(false)));

        let labels = drain_labels(&mut inlet);
        assert_eq!(labels.first().unwrap(), "session_start");
        assert_eq!(labels.last().unwrap(), "session_stop");
        assert!(!labels.contains(&"session_complete".to_string()));
        assert_eq!(presenter.calls.lock().last().unwrap(), "stopped");
    }
}
