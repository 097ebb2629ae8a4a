use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use neurocue_foundation::{SessionError, SharedClock, SourceError, StopReason};
use neurocue_telemetry::PipelineMetrics;

use crate::buffer::RecordingBuffer;
use crate::monitor::SessionMonitor;
use crate::source::{MarkerSource, SampleSource, StreamMeta};
use crate::types::{LabeledSample, MarkerEvent, Sample, NO_MARKER_LABEL};

#[derive(Debug, Clone)]
pub struct AlignerConfig {
    /// Bounded wait for one sample poll.
    pub poll_timeout: Duration,
    /// Yield between iterations when a poll came back empty.
    pub idle_sleep: Duration,
    /// Consecutive read failures from one source before it is declared lost.
    pub read_failure_threshold: u32,
    /// Rejected samples before a channel mismatch escalates to a lost source.
    pub mismatch_threshold: u32,
    /// Ceiling on the channel count a source may report.
    pub max_channels: usize,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(50),
            idle_sleep: Duration::from_millis(5),
            read_failure_threshold: 3,
            mismatch_threshold: 10,
            max_channels: 256,
        }
    }
}

/// Fuses the continuous sample stream and the sparse marker stream into one
/// ordered, labeled sequence.
///
/// Sole reader of both sources, single-threaded so label assignment is
/// deterministic. Each iteration drains every available marker, then polls
/// one sample with a bounded wait. A sample's label is the latest marker
/// whose timestamp is at or before the sample's, among markers observed so
/// far; a marker that arrives after its samples were finalized is not
/// backfilled.
pub struct StreamAligner<S: SampleSource, M: MarkerSource> {
    samples: S,
    markers: M,
    buffer: Arc<RecordingBuffer>,
    monitor: SessionMonitor,
    clock: SharedClock,
    cfg: AlignerConfig,
    metrics: PipelineMetrics,
    channel_count: usize,
    current_label: String,
    current_label_ts: f64,
    /// Drained markers not yet effective, ordered by timestamp.
    pending: VecDeque<MarkerEvent>,
    anchor: Option<f64>,
    sample_failures: u32,
    marker_failures: u32,
    mismatches: u32,
}

impl<S: SampleSource, M: MarkerSource> StreamAligner<S, M> {
    /// `samples` must already be connected; `meta` is what `connect`
    /// reported. The buffer must already be in `Recording`.
    pub fn new(
        samples: S,
        meta: &StreamMeta,
        markers: M,
        buffer: Arc<RecordingBuffer>,
        monitor: SessionMonitor,
        clock: SharedClock,
        cfg: AlignerConfig,
        metrics: PipelineMetrics,
    ) -> Result<Self, SessionError> {
        if meta.channel_count == 0 {
            return Err(SessionError::Config(
                "sample source reported zero channels".into(),
            ));
        }
        if meta.channel_count > cfg.max_channels {
            return Err(SessionError::Config(format!(
                "sample source reported {} channels, ceiling is {}",
                meta.channel_count, cfg.max_channels
            )));
        }
        Ok(Self {
            samples,
            markers,
            buffer,
            monitor,
            clock,
            cfg,
            metrics,
            channel_count: meta.channel_count,
            current_label: NO_MARKER_LABEL.to_string(),
            current_label_ts: f64::NEG_INFINITY,
            pending: VecDeque::new(),
            anchor: None,
            sample_failures: 0,
            marker_failures: 0,
            mismatches: 0,
        })
    }

    /// Consume both sources until stopped. All exits, including source loss,
    /// route through the buffer's `stop()`.
    pub fn run(&mut self, running: Arc<AtomicBool>) -> StopReason {
        tracing::info!(channels = self.channel_count, "stream aligner started");

        let reason = loop {
            if !running.load(Ordering::SeqCst) {
                break StopReason::Requested;
            }
            if !self.buffer.status().is_active() {
                // Stopped out from under us by the controller.
                break StopReason::Requested;
            }
            match self.step() {
                Ok(Some(reason)) => break reason,
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(error = %err, "source lost, stopping session");
                    break StopReason::SourceLost(err.to_string());
                }
            }
        };

        self.buffer.stop(reason.clone());
        tracing::info!(
            ?reason,
            samples = self.buffer.sample_count(),
            "stream aligner stopped"
        );
        reason
    }

    /// One polling iteration: drain all markers, check the stop timer, read
    /// at most one sample.
    fn step(&mut self) -> Result<Option<StopReason>, SourceError> {
        self.drain_markers()?;

        if self.monitor.should_stop() {
            return Ok(Some(StopReason::AutoStop));
        }

        match self.samples.poll(self.cfg.poll_timeout) {
            Ok(Some(sample)) => {
                self.sample_failures = 0;
                self.handle_sample(sample)?;
            }
            Ok(None) => {
                self.clock.sleep(self.cfg.idle_sleep);
            }
            Err(err) if err.is_transient() => {
                self.sample_failures += 1;
                self.metrics.record_read_failure();
                tracing::warn!(
                    error = %err,
                    failures = self.sample_failures,
                    "sample read failed"
                );
                if self.sample_failures >= self.cfg.read_failure_threshold {
                    return Err(self.lost(self.samples.name(), self.sample_failures));
                }
            }
            Err(err) => return Err(err),
        }
        Ok(None)
    }

    /// Drain every marker currently available, never just one: a burst
    /// between two sample polls must not be dropped.
    fn drain_markers(&mut self) -> Result<(), SourceError> {
        let mut drained = 0u64;
        loop {
            match self.markers.poll_nonblocking() {
                Ok(Some(event)) => {
                    self.marker_failures = 0;
                    drained += 1;
                    self.ingest_marker(event);
                }
                Ok(None) => break,
                Err(err) if err.is_transient() => {
                    self.marker_failures += 1;
                    self.metrics.record_read_failure();
                    tracing::warn!(
                        error = %err,
                        failures = self.marker_failures,
                        "marker read failed"
                    );
                    if self.marker_failures >= self.cfg.read_failure_threshold {
                        return Err(self.lost(self.markers.name(), self.marker_failures));
                    }
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        if drained > 0 {
            self.metrics.record_marker_burst(drained);
        }
        Ok(())
    }

    fn ingest_marker(&mut self, event: MarkerEvent) {
        tracing::info!(label = %event.label, timestamp = event.timestamp, "marker");
        self.metrics.record_marker();

        if self.buffer.append_marker(event.clone()).is_err() {
            tracing::debug!(label = %event.label, "marker after stop dropped");
            return;
        }

        if self.monitor.observe(&event) {
            self.buffer.mark_stopping();
        } else if self.anchor.is_none() && !self.monitor.is_terminal(&event.label) {
            // First meaningful marker anchors relative time.
            self.anchor = Some(event.timestamp);
            self.buffer.set_anchor(event.timestamp);
        }

        // Keep pending markers ordered by timestamp, arrival order on ties.
        let pos = self
            .pending
            .iter()
            .rposition(|m| m.timestamp <= event.timestamp)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.pending.insert(pos, event);
    }

    fn handle_sample(&mut self, sample: Sample) -> Result<(), SourceError> {
        if sample.channels.len() != self.channel_count {
            self.mismatches += 1;
            self.metrics.record_rejected_sample();
            tracing::warn!(
                expected = self.channel_count,
                got = sample.channels.len(),
                sequence_id = sample.sequence_id,
                rejected = self.mismatches,
                "sample rejected, channel count mismatch"
            );
            if self.mismatches >= self.cfg.mismatch_threshold {
                return Err(SourceError::SourceLost {
                    source_name: self.samples.name().to_string(),
                    reason: format!("{} channel-count mismatches", self.mismatches),
                });
            }
            return Ok(());
        }

        let label = self.effective_label_at(sample.timestamp);
        let relative = self.anchor.map(|a| sample.timestamp - a).unwrap_or(0.0);
        let labeled = LabeledSample::new(sample, label, relative);
        if self.buffer.append_sample(labeled).is_err() {
            tracing::debug!("sample after stop dropped");
        } else {
            self.metrics.record_sample();
        }
        Ok(())
    }

    /// Latest marker with timestamp at or before `sample_ts`, among markers
    /// already drained. Labels only move forward; promoted markers are
    /// consumed from the pending queue.
    fn effective_label_at(&mut self, sample_ts: f64) -> String {
        while let Some(front) = self.pending.front() {
            if front.timestamp > sample_ts {
                break;
            }
            let marker = self.pending.pop_front().expect("front checked above");
            if marker.timestamp >= self.current_label_ts {
                self.current_label_ts = marker.timestamp;
                self.current_label = marker.label;
            }
        }
        self.metrics.set_current_label(&self.current_label);
        self.current_label.clone()
    }

    fn lost(&self, source: &str, failures: u32) -> SourceError {
        SourceError::SourceLost {
            source_name: source.to_string(),
            reason: format!("{} consecutive read failures", failures),
        }
    }
}

/// Handle to the dedicated aligner thread.
pub struct AlignerHandle {
    handle: JoinHandle<StopReason>,
    running: Arc<AtomicBool>,
}

impl AlignerHandle {
    /// Run the aligner on its own named thread.
    pub fn spawn<S, M>(mut aligner: StreamAligner<S, M>) -> Result<Self, SessionError>
    where
        S: SampleSource + 'static,
        M: MarkerSource + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let handle = thread::Builder::new()
            .name("stream-aligner".to_string())
            .spawn(move || aligner.run(flag))
            .map_err(|e| SessionError::Config(format!("failed to spawn aligner thread: {e}")))?;
        Ok(Self { handle, running })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Request a stop and wait for the thread. The current iteration is
    /// allowed to complete; no in-flight read is interrupted.
    pub fn stop(self) -> Option<StopReason> {
        self.running.store(false, Ordering::SeqCst);
        self.handle.join().ok()
    }

    /// Wait for the aligner to finish on its own (auto-stop or source loss).
    pub fn join(self) -> Option<StopReason> {
        self.handle.join().ok()
    }
}
