//! End-to-end pipeline test: synthetic sample source and in-process marker
//! channel feeding the aligner on its own thread, session ended by the
//! monitor's grace period.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use neurocue_foundation::{real_clock, SessionState, StopReason};
use neurocue_stream::{
    marker_channel, AlignerConfig, AlignerHandle, MonitorConfig, RecordingBuffer, SampleSource,
    SessionMonitor, StreamAligner, SynthConfig, SyntheticSampleSource,
};
use neurocue_telemetry::PipelineMetrics;

#[test]
fn records_and_auto_stops_a_short_session() {
    let clock = real_clock();
    let (outlet, inlet) = marker_channel(clock.clone());

    let mut source = SyntheticSampleSource::new(
        SynthConfig {
            channel_count: 4,
            rate_hz: 200.0,
            ..Default::default()
        },
        clock.clone(),
    );
    let meta = source.connect().expect("synthetic source connects");

    let buffer = Arc::new(RecordingBuffer::new());
    buffer
        .start(meta.channel_count, meta.channel_labels.clone())
        .unwrap();

    let monitor = SessionMonitor::new(
        MonitorConfig {
            grace_period: Duration::from_millis(300),
            ..Default::default()
        },
        clock.clone(),
    );
    let metrics = PipelineMetrics::new();
    let aligner = StreamAligner::new(
        source,
        &meta,
        inlet,
        buffer.clone(),
        monitor,
        clock.clone(),
        AlignerConfig::default(),
        metrics.clone(),
    )
    .unwrap();
    let handle = AlignerHandle::spawn(aligner).unwrap();

    // Foreground cue loop, compressed.
    outlet.emit("session_start");
    thread::sleep(Duration::from_millis(100));
    outlet.emit("clench_left_hand_start");
    thread::sleep(Duration::from_millis(200));
    outlet.emit("session_complete");
    drop(outlet);

    let reason = handle.join().expect("aligner thread joins");
    assert_eq!(reason, StopReason::AutoStop);
    assert_eq!(buffer.status(), SessionState::Stopped);

    let snap = buffer.snapshot().expect("snapshot after stop");
    assert_eq!(snap.markers.len(), 3);
    assert_eq!(snap.stop_reason, Some(StopReason::AutoStop));

    // ~600ms at 200 Hz; generous lower bound to stay timing-tolerant.
    assert!(
        snap.samples.len() > 50,
        "expected a continuous stream, got {} samples",
        snap.samples.len()
    );

    // Order preserved, labels move forward only.
    for pair in snap.samples.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    let labels: Vec<&str> = snap
        .samples
        .iter()
        .map(|s| s.effective_label.as_str())
        .collect();
    assert!(labels.contains(&"session_start"));
    assert!(labels.contains(&"clench_left_hand_start"));

    // Relative time anchors on session_start.
    let anchor = snap.anchor_timestamp.expect("anchor recorded");
    let last = snap.samples.last().unwrap();
    assert!((last.relative_time - (last.timestamp - anchor)).abs() < 1e-9);

    // Snapshot is repeatable without side effects.
    let again = buffer.snapshot().unwrap();
    assert_eq!(again.samples.len(), snap.samples.len());
}

#[test]
fn explicit_stop_routes_through_same_path() {
    let clock = real_clock();
    let (outlet, inlet) = marker_channel(clock.clone());

    let mut source = SyntheticSampleSource::new(
        SynthConfig {
            channel_count: 4,
            rate_hz: 200.0,
            ..Default::default()
        },
        clock.clone(),
    );
    let meta = source.connect().unwrap();

    let buffer = Arc::new(RecordingBuffer::new());
    buffer.start(meta.channel_count, None).unwrap();

    let monitor = SessionMonitor::new(MonitorConfig::default(), clock.clone());
    let aligner = StreamAligner::new(
        source,
        &meta,
        inlet,
        buffer.clone(),
        monitor,
        clock.clone(),
        AlignerConfig::default(),
        PipelineMetrics::new(),
    )
    .unwrap();
    let handle = AlignerHandle::spawn(aligner).unwrap();

    outlet.emit("session_start");
    thread::sleep(Duration::from_millis(150));

    let reason = handle.stop().expect("aligner thread joins");
    assert_eq!(reason, StopReason::Requested);
    assert_eq!(buffer.status(), SessionState::Stopped);
    assert!(buffer.snapshot().unwrap().samples.len() > 10);
}
