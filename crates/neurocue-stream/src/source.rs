use std::time::Duration;

use neurocue_foundation::SourceError;

use crate::types::{MarkerEvent, Sample};

/// What a sample source reports at connect time. The channel count is fixed
/// for the session; labels, when present, name channels 1:1 by position.
#[derive(Debug, Clone)]
pub struct StreamMeta {
    pub channel_count: usize,
    pub channel_labels: Option<Vec<String>>,
    pub nominal_rate_hz: Option<f64>,
}

/// Continuous biosignal source, e.g. an EEG headset stream. Implementations
/// stamp samples on the shared monotonic clock.
pub trait SampleSource: Send {
    /// Reach the source and learn its channel layout. A failure here is
    /// fatal to starting a session; no partial session is created.
    fn connect(&mut self) -> Result<StreamMeta, SourceError>;

    /// Blocking read with a bounded wait. `Ok(None)` means no sample became
    /// available within the timeout; the caller yields and retries.
    fn poll(&mut self, timeout: Duration) -> Result<Option<Sample>, SourceError>;

    fn name(&self) -> &str {
        "samples"
    }
}

/// Sparse event source. Polled without blocking so a burst of markers
/// between two sample reads can be drained in full.
pub trait MarkerSource: Send {
    /// Reach the source. In-process channels are born connected; network
    /// implementations resolve their stream here.
    fn connect(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    fn poll_nonblocking(&mut self) -> Result<Option<MarkerEvent>, SourceError>;

    fn name(&self) -> &str {
        "markers"
    }
}
