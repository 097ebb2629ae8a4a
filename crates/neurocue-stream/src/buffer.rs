use parking_lot::Mutex;

use neurocue_foundation::{SessionError, SessionState, StopReason};

use crate::types::{LabeledSample, MarkerEvent};

/// Immutable, fully-copied view of a finished session. Handed to the
/// exporter; taking one repeatedly has no side effects.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub samples: Vec<LabeledSample>,
    pub markers: Vec<MarkerEvent>,
    pub channel_count: Option<usize>,
    pub channel_labels: Option<Vec<String>>,
    /// Timestamp of the first non-terminal marker, the relative-time anchor.
    pub anchor_timestamp: Option<f64>,
    pub stop_reason: Option<StopReason>,
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    samples: Vec<LabeledSample>,
    markers: Vec<MarkerEvent>,
    channel_count: Option<usize>,
    channel_labels: Option<Vec<String>>,
    anchor_timestamp: Option<f64>,
    stop_reason: Option<StopReason>,
}

/// Thread-safe, append-only accumulation of one session's labeled samples
/// and raw marker events, with lifecycle control. One writer thread (the
/// aligner); `start`/`stop`/`snapshot` may come from a controller context.
pub struct RecordingBuffer {
    inner: Mutex<Inner>,
}

impl Default for RecordingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBuffer {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Reset to empty and move to `Recording`. Valid from `Idle` or
    /// `Stopped` (a buffer can host consecutive sessions).
    pub fn start(
        &self,
        channel_count: usize,
        channel_labels: Option<Vec<String>>,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        let current = inner.state;
        if !current.can_transition(SessionState::Recording) {
            return Err(SessionError::InvalidState {
                required: SessionState::Idle,
                actual: current,
            });
        }
        *inner = Inner {
            state: SessionState::Recording,
            channel_count: Some(channel_count),
            channel_labels,
            ..Inner::default()
        };
        tracing::info!(channel_count, "recording started");
        Ok(())
    }

    pub fn append_sample(&self, sample: LabeledSample) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        let state = inner.state;
        if !state.is_active() {
            return Err(SessionError::InvalidState {
                required: SessionState::Recording,
                actual: state,
            });
        }
        inner.samples.push(sample);
        Ok(())
    }

    pub fn append_marker(&self, marker: MarkerEvent) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        let state = inner.state;
        if !state.is_active() {
            return Err(SessionError::InvalidState {
                required: SessionState::Recording,
                actual: state,
            });
        }
        inner.markers.push(marker);
        Ok(())
    }

    /// Record the relative-time anchor. Only the first call sticks.
    pub fn set_anchor(&self, timestamp: f64) {
        let mut inner = self.inner.lock();
        if inner.anchor_timestamp.is_none() {
            inner.anchor_timestamp = Some(timestamp);
            tracing::info!(timestamp, "session anchor set");
        }
    }

    /// Enter the grace window: a terminal marker was seen, trailing samples
    /// are still accepted until `stop`.
    pub fn mark_stopping(&self) {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::Recording {
            inner.state = SessionState::Stopping;
            tracing::info!("session stopping, grace window open");
        }
    }

    /// Move to `Stopped`. Idempotent: the first reason wins, later calls are
    /// no-ops. Every shutdown path, intentional or not, lands here.
    pub fn stop(&self, reason: StopReason) {
        let mut inner = self.inner.lock();
        let state = inner.state;
        match state {
            SessionState::Stopped => {}
            SessionState::Idle => {
                tracing::warn!("stop on idle buffer ignored");
            }
            SessionState::Recording | SessionState::Stopping => {
                tracing::info!(?reason, samples = inner.samples.len(), "recording stopped");
                inner.state = SessionState::Stopped;
                inner.stop_reason = Some(reason);
            }
        }
    }

    pub fn status(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn sample_count(&self) -> usize {
        self.inner.lock().samples.len()
    }

    /// Full copy of the accumulated session. Only valid once `Stopped`;
    /// everything appended strictly before `stop()` returned is visible.
    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let inner = self.inner.lock();
        let state = inner.state;
        if state != SessionState::Stopped {
            return Err(SessionError::InvalidState {
                required: SessionState::Stopped,
                actual: state,
            });
        }
        Ok(SessionSnapshot {
            samples: inner.samples.clone(),
            markers: inner.markers.clone(),
            channel_count: inner.channel_count,
            channel_labels: inner.channel_labels.clone(),
            anchor_timestamp: inner.anchor_timestamp,
            stop_reason: inner.stop_reason.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;

    fn labeled(ts: f64, seq: u64) -> LabeledSample {
        LabeledSample::new(
            Sample {
                timestamp: ts,
                channels: vec![0.0; 4],
                sequence_id: seq,
            },
            "none".into(),
            0.0,
        )
    }

    #[test]
    fn snapshot_requires_stopped() {
        let buffer = RecordingBuffer::new();
        assert!(buffer.snapshot().is_err());

        buffer.start(4, None).unwrap();
        assert!(buffer.snapshot().is_err());

        buffer.stop(StopReason::Requested);
        assert!(buffer.snapshot().is_ok());
    }

    #[test]
    fn appends_visible_after_stop() {
        let buffer = RecordingBuffer::new();
        buffer.start(4, None).unwrap();
        for seq in 0..100 {
            buffer.append_sample(labeled(seq as f64 * 0.01, seq)).unwrap();
        }
        buffer
            .append_marker(MarkerEvent::new(0.5, "left_hand_start"))
            .unwrap();
        buffer.stop(StopReason::Requested);

        let snap = buffer.snapshot().unwrap();
        assert_eq!(snap.samples.len(), 100);
        assert_eq!(snap.markers.len(), 1);
        assert_eq!(snap.stop_reason, Some(StopReason::Requested));
    }

    #[test]
    fn stop_is_idempotent_first_reason_wins() {
        let buffer = RecordingBuffer::new();
        buffer.start(4, None).unwrap();
        buffer.stop(StopReason::AutoStop);
        buffer.stop(StopReason::Requested);
        let snap = buffer.snapshot().unwrap();
        assert_eq!(snap.stop_reason, Some(StopReason::AutoStop));
    }

    #[test]
    fn appends_allowed_during_grace_window() {
        let buffer = RecordingBuffer::new();
        buffer.start(4, None).unwrap();
        buffer.mark_stopping();
        assert_eq!(buffer.status(), SessionState::Stopping);
        buffer.append_sample(labeled(1.0, 0)).unwrap();
        buffer.stop(StopReason::AutoStop);
        assert!(buffer.append_sample(labeled(2.0, 1)).is_err());
        assert_eq!(buffer.snapshot().unwrap().samples.len(), 1);
    }

    #[test]
    fn restart_resets_contents() {
        let buffer = RecordingBuffer::new();
        buffer.start(4, None).unwrap();
        buffer.append_sample(labeled(0.0, 0)).unwrap();
        buffer.set_anchor(0.25);
        buffer.stop(StopReason::Requested);

        buffer.start(8, Some(vec!["AF3".into()])).unwrap();
        buffer.stop(StopReason::Requested);
        let snap = buffer.snapshot().unwrap();
        assert!(snap.samples.is_empty());
        assert_eq!(snap.channel_count, Some(8));
        assert_eq!(snap.anchor_timestamp, None);
    }

    #[test]
    fn anchor_only_first_call_sticks() {
        let buffer = RecordingBuffer::new();
        buffer.start(4, None).unwrap();
        buffer.set_anchor(1.5);
        buffer.set_anchor(9.9);
        buffer.stop(StopReason::Requested);
        assert_eq!(buffer.snapshot().unwrap().anchor_timestamp, Some(1.5));
    }
}
