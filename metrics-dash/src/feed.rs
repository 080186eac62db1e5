//! JSON-lines history feed.
//!
//! Each line of a history file is one step:
//!
//! ```text
//! {"_step": 1, "train/loss": 0.93, "train/acc": 0.41}
//! ```
//!
//! Numeric fields become samples at X = `_step`; keys starting with `_` are
//! bookkeeping and skipped. [`HistoryReader`] tails the file incrementally,
//! and [`spawn_reader`] runs it on its own thread feeding a bounded channel.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::Value;

use crate::error::{DashError, Result};
use crate::series::{HistoryBatch, MetricData};

/// Field holding the X value of a line.
pub const STEP_KEY: &str = "_step";

/// Incremental reader over a growing history file.
#[derive(Debug)]
pub struct HistoryReader {
    path: PathBuf,
    file: Option<BufReader<File>>,
    last_position: u64,
    /// Trailing text of a line still being written.
    partial: String,
    /// X for lines without `_step`.
    next_step: f64,
    lines_read: u64,
}

impl HistoryReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            last_position: 0,
            partial: String::new(),
            next_step: 0.0,
            lines_read: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Open the file at the last read position. A missing file is not an
    /// error; it may not have been created yet.
    fn ensure_file(&mut self) -> Result<bool> {
        if self.file.is_some() {
            return Ok(true);
        }
        if !self.path.exists() {
            return Ok(false);
        }
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(self.last_position))?;
        self.file = Some(reader);
        Ok(true)
    }

    /// Start over if the file shrank under us.
    fn check_truncation(&mut self) -> Result<()> {
        let len = std::fs::metadata(&self.path)?.len();
        if len < self.last_position {
            tracing::info!(path = %self.path.display(), "history file truncated, rereading");
            self.file = None;
            self.last_position = 0;
            self.partial.clear();
            self.next_step = 0.0;
        }
        Ok(())
    }

    /// Read every complete line appended since the last poll, merged into
    /// one batch. Empty if nothing new arrived.
    pub fn poll(&mut self) -> Result<HistoryBatch> {
        let mut batch = HistoryBatch::new();
        if self.path.exists() {
            self.check_truncation()?;
        }
        if !self.ensure_file()? {
            return Ok(batch);
        }
        let Some(reader) = self.file.as_mut() else {
            return Ok(batch);
        };

        let mut lines = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            let n = reader.read_line(&mut line)?;
            if n == 0 {
                break;
            }
            if !line.ends_with('\n') {
                self.partial.push_str(&line);
                continue;
            }
            let mut full = std::mem::take(&mut self.partial);
            full.push_str(line.trim_end_matches(['\n', '\r']));
            lines.push(full);
        }
        self.last_position = reader.stream_position()?;

        for text in lines {
            if text.trim().is_empty() {
                continue;
            }
            self.lines_read += 1;
            match parse_line(&text, self.next_step) {
                Ok((step, metrics)) => {
                    self.next_step = step + 1.0;
                    merge_into(&mut batch, step, metrics);
                }
                Err(err) => {
                    tracing::warn!(line = self.lines_read, error = %err, "skipping history line");
                }
            }
        }
        Ok(batch)
    }
}

/// Parse one history line into its step and `(metric, value)` pairs.
pub fn parse_line(line: &str, fallback_step: f64) -> Result<(f64, Vec<(String, f64)>)> {
    let value: Value = serde_json::from_str(line)?;
    let Value::Object(map) = value else {
        return Err(DashError::feed("history line is not a JSON object"));
    };

    let step = map
        .get(STEP_KEY)
        .and_then(Value::as_f64)
        .unwrap_or(fallback_step);

    let metrics = map
        .iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .filter_map(|(key, v)| match v {
            Value::Number(n) => n.as_f64().map(|f| (key.clone(), f)),
            _ => None,
        })
        .collect();
    Ok((step, metrics))
}

fn merge_into(batch: &mut HistoryBatch, step: f64, metrics: Vec<(String, f64)>) {
    for (name, value) in metrics {
        let data = batch.entry(name).or_insert_with(MetricData::default);
        data.x.push(step);
        data.y.push(value);
    }
}

/// A reader thread and the receiving end of its batches.
#[derive(Debug)]
pub struct FeedHandle {
    pub batches: Receiver<HistoryBatch>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// Flag that stops the reader thread once set. The reader then drops its
    /// sender, which ends every loop blocked on `batches`.
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Ask the reader to stop and wait for it.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("history reader thread panicked");
            }
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Tail `path` on a background thread, sending merged batches over a
/// channel holding at most `capacity` pending batches.
///
/// When the channel is full the reader keeps accumulating into its pending
/// batch instead of blocking, so the UI never falls behind by more than one
/// merged batch.
pub fn spawn_reader(path: &Path, capacity: usize, poll_interval: Duration) -> Result<FeedHandle> {
    let (tx, rx) = sync_channel(capacity.max(1));
    let stop = Arc::new(AtomicBool::new(false));
    let mut reader = HistoryReader::new(path);
    let thread_stop = Arc::clone(&stop);

    let join = thread::Builder::new()
        .name("history-reader".to_string())
        .spawn(move || {
            tracing::info!(path = %reader.path().display(), "history reader started");
            let mut pending = HistoryBatch::new();
            while !thread_stop.load(Ordering::Relaxed) {
                match reader.poll() {
                    Ok(batch) => {
                        for (name, data) in batch {
                            let slot = pending.entry(name).or_default();
                            slot.x.extend(data.x);
                            slot.y.extend(data.y);
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "history poll failed"),
                }

                if !pending.is_empty() {
                    match tx.try_send(std::mem::take(&mut pending)) {
                        Ok(()) => {}
                        Err(TrySendError::Full(batch)) => pending = batch,
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
                thread::sleep(poll_interval);
            }
            tracing::info!(lines = reader.lines_read(), "history reader stopped");
        })
        .map_err(DashError::Io)?;

    Ok(FeedHandle {
        batches: rx,
        stop,
        join: Some(join),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let (step, mut metrics) =
            parse_line(r#"{"_step": 3, "loss": 0.5, "_runtime": 9.0, "tag": "x", "acc": 1}"#, 0.0)
                .unwrap();
        metrics.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(step, 3.0);
        assert_eq!(metrics, vec![("acc".to_string(), 1.0), ("loss".to_string(), 0.5)]);
    }

    #[test]
    fn test_parse_line_fallback_step() {
        let (step, _) = parse_line(r#"{"loss": 0.5}"#, 7.0).unwrap();
        assert_eq!(step, 7.0);
    }

    #[test]
    fn test_parse_line_rejects_non_objects() {
        assert!(matches!(parse_line("[1, 2]", 0.0), Err(DashError::Feed(_))));
        assert!(matches!(parse_line("{not json", 0.0), Err(DashError::Json(_))));
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut batch = HistoryBatch::new();
        merge_into(&mut batch, 1.0, vec![("loss".into(), 0.9)]);
        merge_into(&mut batch, 2.0, vec![("loss".into(), 0.8)]);
        let loss = &batch["loss"];
        assert_eq!(loss.x, vec![1.0, 2.0]);
        assert_eq!(loss.y, vec![0.9, 0.8]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let mut reader = HistoryReader::new("/nonexistent/metrics-dash/history.jsonl");
        assert!(reader.poll().unwrap().is_empty());
    }
}
