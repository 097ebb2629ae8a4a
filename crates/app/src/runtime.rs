use std::sync::Arc;
use std::time::{Duration, Instant};

use neurocue_foundation::{real_clock, SessionError, SessionState, SharedClock, StopReason};
use neurocue_stream::{
    marker_channel, AlignerConfig, AlignerHandle, MarkerOutlet, MarkerSource, MonitorConfig,
    RecordingBuffer, SampleSource, SessionMonitor, SessionSnapshot, StreamAligner, SynthConfig,
    SyntheticSampleSource,
};
use neurocue_telemetry::PipelineMetrics;

use crate::config::AppConfig;
use crate::cue::CuePresenter;
use crate::schedule::{ScheduleHandle, TrialSchedule};

/// Plain command interface over one recording run: `start`, `stop`,
/// `status`, fully decoupled from any presentation layer.
///
/// Wires the pipeline together: synthetic sample source and in-process
/// marker channel into the aligner thread, trial schedule on its own thread
/// emitting markers, shared buffer in the middle.
pub struct SessionController {
    buffer: Arc<RecordingBuffer>,
    metrics: PipelineMetrics,
    clock: SharedClock,
    outlet: MarkerOutlet,
    grace_period: Duration,
    aligner: Option<AlignerHandle>,
    schedule: Option<ScheduleHandle>,
}

impl SessionController {
    /// Connect the sample source and start recording plus the cue schedule.
    /// A connection failure is fatal here; no partial session is created.
    pub fn start(
        config: &AppConfig,
        presenter: Arc<dyn CuePresenter>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let clock = real_clock();
        let metrics = PipelineMetrics::new();

        let mut source = SyntheticSampleSource::new(
            SynthConfig {
                channel_count: config.source.channels,
                rate_hz: config.source.rate_hz,
                ..Default::default()
            },
            clock.clone(),
        );
        let meta = source.connect()?;

        let buffer = Arc::new(RecordingBuffer::new());
        buffer.start(meta.channel_count, meta.channel_labels.clone())?;

        let recorder = &config.recorder;
        let grace_period = Duration::from_secs_f64(recorder.grace_period_secs);
        let monitor = SessionMonitor::new(
            MonitorConfig {
                terminal_labels: recorder.terminal_labels.clone(),
                grace_period,
            },
            clock.clone(),
        );

        let (outlet, mut inlet) = marker_channel(clock.clone());
        inlet.connect()?;
        let aligner = StreamAligner::new(
            source,
            &meta,
            inlet,
            buffer.clone(),
            monitor,
            clock.clone(),
            AlignerConfig {
                poll_timeout: Duration::from_millis(recorder.poll_timeout_ms),
                idle_sleep: Duration::from_millis(recorder.idle_sleep_ms),
                read_failure_threshold: recorder.read_failure_threshold,
                mismatch_threshold: recorder.mismatch_threshold,
                max_channels: recorder.max_channels,
            },
            metrics.clone(),
        )?;
        let aligner = AlignerHandle::spawn(aligner)?;

        let schedule = TrialSchedule::new(
            config.schedule.clone(),
            outlet.clone(),
            presenter,
            clock.clone(),
        );
        let schedule = match ScheduleHandle::spawn(schedule) {
            Ok(handle) => handle,
            Err(err) => {
                aligner.stop();
                return Err(err);
            }
        };

        Ok(Self {
            buffer,
            metrics,
            clock,
            outlet,
            grace_period,
            aligner: Some(aligner),
            schedule: Some(schedule),
        })
    }

    pub fn status(&self) -> SessionState {
        self.buffer.status()
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// The aligner exits on auto-stop or source loss; the session is over
    /// once its thread is done.
    pub fn is_finished(&self) -> bool {
        self.aligner
            .as_ref()
            .map(|a| a.is_finished())
            .unwrap_or(true)
    }

    /// Graceful external stop: halt the cue schedule (which emits
    /// `session_stop`) and let the monitor's grace window capture the tail.
    /// Falls back to a hard stop if the aligner does not wind down in time.
    pub fn stop(&mut self) {
        if let Some(schedule) = self.schedule.take() {
            schedule.stop();
        } else {
            // Schedule already gone; make sure a terminal marker exists.
            self.outlet.emit("session_stop");
        }

        let deadline = self.grace_period + Duration::from_secs(2);
        let started = Instant::now();
        while !self.is_finished() && started.elapsed() < deadline {
            self.clock.sleep(Duration::from_millis(20));
        }

        if let Some(aligner) = self.aligner.take() {
            match aligner.stop() {
                Some(reason) => tracing::info!(?reason, "session stopped"),
                None => tracing::error!("aligner thread panicked during stop"),
            }
        }
    }

    /// Join both threads and hand out the frozen session. Valid after the
    /// session finished on its own or after `stop()`.
    pub fn finish(mut self) -> Result<(SessionSnapshot, Option<StopReason>), SessionError> {
        if let Some(schedule) = self.schedule.take() {
            schedule.stop();
        }
        let reason = self.aligner.take().and_then(|aligner| aligner.stop());
        let snapshot = self.buffer.snapshot()?;
        Ok((snapshot, reason))
    }
}
