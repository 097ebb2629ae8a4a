use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use neurocue_foundation::{SharedClock, SourceError};

use crate::source::{SampleSource, StreamMeta};
use crate::types::Sample;

/// Synthetic biosignal generator standing in for a headset stream during
/// development and testing: per-channel sine carriers with additive noise at
/// a fixed nominal rate, stamped on the shared clock.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub channel_count: usize,
    pub rate_hz: f64,
    pub amplitude: f64,
    pub noise: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            channel_count: 14, // consumer EEG headset layout
            rate_hz: 128.0,
            amplitude: 50.0,
            noise: 5.0,
        }
    }
}

pub struct SyntheticSampleSource {
    cfg: SynthConfig,
    clock: SharedClock,
    rng: SmallRng,
    sequence_id: u64,
    next_due: Option<f64>,
    connected: bool,
}

impl SyntheticSampleSource {
    pub fn new(cfg: SynthConfig, clock: SharedClock) -> Self {
        Self {
            cfg,
            clock,
            rng: SmallRng::from_entropy(),
            sequence_id: 0,
            next_due: None,
            connected: false,
        }
    }

    fn generate(&mut self, timestamp: f64) -> Sample {
        let channels = (0..self.cfg.channel_count)
            .map(|ch| {
                let freq = 8.0 + ch as f64; // spread channels over the alpha band and up
                let phase = 2.0 * std::f64::consts::PI * freq * timestamp;
                let jitter: f64 = self.rng.gen_range(-1.0..1.0);
                phase.sin() * self.cfg.amplitude + jitter * self.cfg.noise
            })
            .collect();
        let sample = Sample {
            timestamp,
            channels,
            sequence_id: self.sequence_id,
        };
        self.sequence_id += 1;
        sample
    }
}

impl SampleSource for SyntheticSampleSource {
    fn connect(&mut self) -> Result<StreamMeta, SourceError> {
        if self.cfg.rate_hz <= 0.0 || self.cfg.channel_count == 0 {
            return Err(SourceError::ConnectionFailed {
                source_name: self.name().to_string(),
                reason: format!(
                    "invalid synthetic layout: {} channels at {} Hz",
                    self.cfg.channel_count, self.cfg.rate_hz
                ),
            });
        }
        self.connected = true;
        tracing::info!(
            channels = self.cfg.channel_count,
            rate_hz = self.cfg.rate_hz,
            "synthetic sample source connected"
        );
        Ok(StreamMeta {
            channel_count: self.cfg.channel_count,
            channel_labels: None,
            nominal_rate_hz: Some(self.cfg.rate_hz),
        })
    }

    fn poll(&mut self, timeout: Duration) -> Result<Option<Sample>, SourceError> {
        if !self.connected {
            return Err(SourceError::ReadFailed("poll before connect".into()));
        }
        let period = 1.0 / self.cfg.rate_hz;
        let now = self.clock.now_secs();
        let due = *self.next_due.get_or_insert(now);

        if due > now {
            let wait = due - now;
            if wait > timeout.as_secs_f64() {
                self.clock.sleep(timeout);
                return Ok(None);
            }
            self.clock.sleep(Duration::from_secs_f64(wait));
        }
        self.next_due = Some(due + period);
        Ok(Some(self.generate(due)))
    }

    fn name(&self) -> &str {
        "synthetic-eeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocue_foundation::test_clock;

    #[test]
    fn connect_reports_layout() {
        let clock = test_clock();
        let mut source = SyntheticSampleSource::new(
            SynthConfig {
                channel_count: 8,
                rate_hz: 250.0,
                ..Default::default()
            },
            clock.clone(),
        );
        let meta = source.connect().unwrap();
        assert_eq!(meta.channel_count, 8);
        assert_eq!(meta.nominal_rate_hz, Some(250.0));
    }

    #[test]
    fn rejects_invalid_layout() {
        let clock = test_clock();
        let mut source = SyntheticSampleSource::new(
            SynthConfig {
                channel_count: 0,
                ..Default::default()
            },
            clock.clone(),
        );
        assert!(source.connect().is_err());
    }

    #[test]
    fn produces_fixed_rate_with_increasing_sequence_ids() {
        let clock = test_clock();
        let mut source = SyntheticSampleSource::new(
            SynthConfig {
                channel_count: 4,
                rate_hz: 100.0,
                ..Default::default()
            },
            clock.clone(),
        );
        source.connect().unwrap();

        let mut samples = Vec::new();
        // Virtual clock: poll sleeps advance time, so the script is exact.
        for _ in 0..10 {
            if let Some(sample) = source.poll(Duration::from_millis(50)).unwrap() {
                samples.push(sample);
            }
        }
        assert_eq!(samples.len(), 10);
        for (i, pair) in samples.windows(2).enumerate() {
            assert_eq!(samples[i].sequence_id, i as u64);
            let dt = pair[1].timestamp - pair[0].timestamp;
            assert!((dt - 0.01).abs() < 1e-9, "period was {dt}");
        }
        assert_eq!(samples[0].channels.len(), 4);
    }
}
