use std::fmt;

use neurocue_foundation::SessionError;
use neurocue_stream::SessionSnapshot;

#[derive(Debug, Clone, PartialEq)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

/// Summary of a finished session, computed once from the frozen snapshot.
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub total_samples: usize,
    pub total_markers: usize,
    pub duration_secs: f64,
    pub sample_rate_hz: f64,
    /// Per effective label, in first-seen order.
    pub labels: Vec<LabelCount>,
    /// Cross-task aggregation: phase suffixes stripped, so a task's start
    /// and end labels count together.
    pub tasks: Vec<LabelCount>,
}

impl SessionStats {
    pub fn compute(snapshot: &SessionSnapshot) -> Result<Self, SessionError> {
        if snapshot.samples.is_empty() {
            return Err(SessionError::NoData);
        }

        let total = snapshot.samples.len();
        let first_ts = snapshot.samples[0].timestamp;
        let last_ts = snapshot.samples[total - 1].timestamp;
        let duration = last_ts - first_ts;
        let rate = if duration > 0.0 {
            total as f64 / duration
        } else {
            0.0
        };

        let labels = count_by(snapshot, |label| label.to_string());
        let tasks = count_by(snapshot, |label| task_of(label).to_string());

        Ok(Self {
            total_samples: total,
            total_markers: snapshot.markers.len(),
            duration_secs: duration,
            sample_rate_hz: rate,
            labels,
            tasks,
        })
    }
}

fn count_by(snapshot: &SessionSnapshot, key: impl Fn(&str) -> String) -> Vec<LabelCount> {
    let total = snapshot.samples.len();
    let mut order: Vec<String> = Vec::new();
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for sample in &snapshot.samples {
        let k = key(&sample.effective_label);
        if !counts.contains_key(&k) {
            order.push(k.clone());
        }
        *counts.entry(k).or_insert(0) += 1;
    }
    order
        .into_iter()
        .map(|label| {
            let count = counts[&label];
            LabelCount {
                count,
                percent: count as f64 * 100.0 / total as f64,
                label,
            }
        })
        .collect()
}

/// Strip a trailing phase suffix so `left_hand_start` and `left_hand_end`
/// group under `left_hand`.
fn task_of(label: &str) -> &str {
    label
        .strip_suffix("_start")
        .or_else(|| label.strip_suffix("_end"))
        .unwrap_or(label)
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session summary")?;
        writeln!(f, "  samples:  {}", self.total_samples)?;
        writeln!(f, "  markers:  {}", self.total_markers)?;
        writeln!(f, "  duration: {:.3} s", self.duration_secs)?;
        writeln!(f, "  rate:     {:.2} Hz", self.sample_rate_hz)?;
        writeln!(f, "  by label:")?;
        for entry in &self.labels {
            writeln!(
                f,
                "    {:<28} {:>8} ({:5.1}%)",
                entry.label, entry.count, entry.percent
            )?;
        }
        writeln!(f, "  by task:")?;
        for entry in &self.tasks {
            writeln!(
                f,
                "    {:<28} {:>8} ({:5.1}%)",
                entry.label, entry.count, entry.percent
            )?;
        }
        Ok(())
    }
}
