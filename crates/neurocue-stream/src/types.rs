/// Label a sample carries before any marker has been observed.
pub const NO_MARKER_LABEL: &str = "none";

/// One timestamped vector of biosignal channel readings. The channel vector
/// length is fixed for the lifetime of a session; a disagreement is a
/// `ChannelMismatch`, never silently truncated.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Monotonic seconds on the clock shared with the marker stream.
    pub timestamp: f64,
    pub channels: Vec<f64>,
    pub sequence_id: u64,
}

/// A discrete task-boundary or session-boundary event. Labels are opaque
/// tokens; only the monitor's terminal set gives any of them meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEvent {
    pub timestamp: f64,
    pub label: String,
}

impl MarkerEvent {
    pub fn new(timestamp: f64, label: impl Into<String>) -> Self {
        Self {
            timestamp,
            label: label.into(),
        }
    }
}

/// A sample plus the marker label that was effective when it was captured.
/// Produced exactly once per sample, never relabeled afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub timestamp: f64,
    /// Seconds since the session anchor (first non-terminal marker), or 0
    /// while no anchor exists yet.
    pub relative_time: f64,
    pub effective_label: String,
    pub sequence_id: u64,
    pub channels: Vec<f64>,
}

impl LabeledSample {
    pub fn new(sample: Sample, effective_label: String, relative_time: f64) -> Self {
        Self {
            timestamp: sample.timestamp,
            relative_time,
            effective_label,
            sequence_id: sample.sequence_id,
            channels: sample.channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_sample_carries_sample_fields() {
        let sample = Sample {
            timestamp: 12.5,
            channels: vec![1.0, 2.0, 3.0],
            sequence_id: 42,
        };
        let labeled = LabeledSample::new(sample, "left_hand_start".into(), 2.5);
        assert_eq!(labeled.timestamp, 12.5);
        assert_eq!(labeled.relative_time, 2.5);
        assert_eq!(labeled.sequence_id, 42);
        assert_eq!(labeled.channels, vec![1.0, 2.0, 3.0]);
        assert_eq!(labeled.effective_label, "left_hand_start");
    }
}
