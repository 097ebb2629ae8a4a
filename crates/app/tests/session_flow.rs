//! Whole-app session flow: schedule, aligner, buffer, export working
//! together on real threads with compressed timings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use neurocue_app::config::{AppConfig, SourceConfig};
use neurocue_app::cue::LogPresenter;
use neurocue_app::runtime::SessionController;
use neurocue_app::schedule::ScheduleConfig;
use neurocue_export::{write_table, SessionStats};
use neurocue_foundation::{SessionState, StopReason};

fn short_config() -> AppConfig {
    let mut config = AppConfig {
        schedule: ScheduleConfig {
            tasks: vec!["Left Hand".into(), "Right Hand".into()],
            trial_secs: 0.05,
            rest_secs: 0.02,
            max_trials: 2,
            randomize: false,
        },
        source: SourceConfig {
            channels: 4,
            rate_hz: 200.0,
        },
        ..Default::default()
    };
    config.recorder.grace_period_secs = 0.2;
    config
}

fn wait_finished(controller: &SessionController, limit: Duration) {
    let started = Instant::now();
    while !controller.is_finished() {
        assert!(
            started.elapsed() < limit,
            "session did not finish within {limit:?}"
        );
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn full_session_records_exports_and_summarizes() {
    let config = short_config();
    let controller =
        SessionController::start(&config, Arc::new(LogPresenter)).expect("session starts");

    wait_finished(&controller, Duration::from_secs(10));

    let (snapshot, reason) = controller.finish().expect("snapshot after finish");
    assert_eq!(reason, Some(StopReason::AutoStop));

    // session_start + 2 * (task + rest) + session_complete
    let labels: Vec<&str> = snapshot.markers.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "session_start",
            "left_hand_start",
            "rest_period_start",
            "right_hand_start",
            "rest_period_start",
            "session_complete",
        ]
    );
    assert!(!snapshot.samples.is_empty());

    let stats = SessionStats::compute(&snapshot).unwrap();
    assert_eq!(stats.total_samples, snapshot.samples.len());
    assert_eq!(stats.total_markers, 6);
    let percent_sum: f64 = stats.labels.iter().map(|l| l.percent).sum();
    assert!((percent_sum - 100.0).abs() < 1e-6);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.csv");
    write_table(&snapshot, &path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(
        lines.next().unwrap(),
        "timestamp,relative_time,marker,sample_id,CH1,CH2,CH3,CH4"
    );
    assert_eq!(lines.count(), snapshot.samples.len());
}

#[test]
fn external_stop_ends_session_cleanly() {
    let mut config = short_config();
    // Long trials: the session would run far longer than this test without
    // the external stop.
    config.schedule.trial_secs = 30.0;
    config.schedule.max_trials = 100;

    let mut controller =
        SessionController::start(&config, Arc::new(LogPresenter)).expect("session starts");

    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(controller.status(), SessionState::Recording);

    controller.stop();
    assert_eq!(controller.status(), SessionState::Stopped);

    let (snapshot, reason) = controller.finish().expect("snapshot after stop");
    assert!(reason.is_some());
    let labels: Vec<&str> = snapshot.markers.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(labels.last().unwrap(), &"session_stop");
    assert!(!snapshot.samples.is_empty());
}
