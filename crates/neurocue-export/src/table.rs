use std::path::Path;

use neurocue_foundation::SessionError;
use neurocue_stream::SessionSnapshot;

/// Column names for the channel block: supplied labels 1:1 by position when
/// their count matches, otherwise positional `CH1..CHn` for every column.
/// Never a mix of the two schemes.
fn channel_headers(snapshot: &SessionSnapshot, channel_count: usize) -> Vec<String> {
    match &snapshot.channel_labels {
        Some(labels) if labels.len() == channel_count => labels.clone(),
        Some(labels) => {
            tracing::warn!(
                labels = labels.len(),
                channels = channel_count,
                "channel label count disagrees with channel count, using positional names"
            );
            positional_headers(channel_count)
        }
        None => positional_headers(channel_count),
    }
}

fn positional_headers(channel_count: usize) -> Vec<String> {
    (1..=channel_count).map(|i| format!("CH{i}")).collect()
}

/// Write one row per labeled sample: `timestamp, relative_time, marker,
/// sample_id, <channels...>`. Rows keep the buffer's order; timestamps are
/// serialized to microsecond precision.
///
/// The file appears atomically: rows go to a temporary file in the
/// destination directory which is persisted onto `path` only after a clean
/// flush. On any failure the destination is left untouched and the snapshot
/// stays in memory for retry.
pub fn write_table(snapshot: &SessionSnapshot, path: &Path) -> Result<(), SessionError> {
    if snapshot.samples.is_empty() {
        return Err(SessionError::NoData);
    }

    let channel_count = snapshot
        .channel_count
        .unwrap_or_else(|| snapshot.samples[0].channels.len());

    let export_failed = |reason: String| SessionError::ExportFailed {
        path: path.to_path_buf(),
        reason,
    };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir),
        None => tempfile::NamedTempFile::new(),
    }
    .map_err(|e| export_failed(format!("creating temporary file: {e}")))?;

    let mut writer = csv::Writer::from_writer(tmp);

    let mut header = vec![
        "timestamp".to_string(),
        "relative_time".to_string(),
        "marker".to_string(),
        "sample_id".to_string(),
    ];
    header.extend(channel_headers(snapshot, channel_count));
    writer
        .write_record(&header)
        .map_err(|e| export_failed(e.to_string()))?;

    let mut record = Vec::with_capacity(header.len());
    for sample in &snapshot.samples {
        if sample.channels.len() != channel_count {
            return Err(SessionError::ChannelMismatch {
                expected: channel_count,
                got: sample.channels.len(),
            });
        }
        record.clear();
        record.push(format!("{:.6}", sample.timestamp));
        record.push(format!("{:.6}", sample.relative_time));
        record.push(sample.effective_label.clone());
        record.push(sample.sequence_id.to_string());
        for value in &sample.channels {
            record.push(format!("{value}"));
        }
        writer
            .write_record(&record)
            .map_err(|e| export_failed(e.to_string()))?;
    }

    let tmp = writer
        .into_inner()
        .map_err(|e| export_failed(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| export_failed(e.to_string()))?;

    tracing::info!(
        path = %path.display(),
        rows = snapshot.samples.len(),
        "session table written"
    );
    Ok(())
}
