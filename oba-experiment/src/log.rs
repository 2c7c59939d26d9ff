use anyhow::{Context, Result};
use oba_core::TrialRecord;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Trailing-trial count for the running performance estimate.
pub const RUNNING_WINDOW: usize = 10;

/// Append-only session log, persisted after every trial.
///
/// The file holds the full record array; each save writes a sibling temp
/// file and renames it into place so a crash mid-write never leaves a
/// half-written log behind. Records are never modified after the fact
/// except to backfill the aggregate performance fields of the trial that
/// was just appended.
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    records: Vec<TrialRecord>,
}

impl SessionLog {
    /// Fresh log for a new session; nothing touches the disk until the
    /// first trial is appended.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        SessionLog {
            path: path.into(),
            records: Vec::new(),
        }
    }

    /// Reads a persisted log back. After trial 1 the file must exist; a
    /// missing or unreadable log is a logic error and propagates as such.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let bytes = fs::read(&path)
            .with_context(|| format!("session log {} is missing or unreadable", path.display()))?;
        let records: Vec<TrialRecord> = serde_json::from_slice(&bytes)
            .with_context(|| format!("session log {} is malformed", path.display()))?;
        Ok(SessionLog { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&TrialRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends one trial and persists the whole log.
    pub fn append(&mut self, record: TrialRecord) -> Result<()> {
        self.records.push(record);
        self.save()
    }

    /// Computes the aggregates including the newest trial, writes them into
    /// that trial's record and persists. Returns (cumulative, running).
    pub fn backfill_performance(&mut self) -> Result<(Option<f64>, Option<f64>)> {
        let cumulative = self.cumulative_performance();
        let running = self.running_performance(RUNNING_WINDOW);
        if let Some(last) = self.records.last_mut() {
            last.cumulative_performance = cumulative;
            last.running_performance = running;
        }
        self.save()?;
        Ok((cumulative, running))
    }

    /// Mean instantaneous accuracy over every trial so far. Zero-event
    /// "no data" trials are skipped, never counted as 0 or 100.
    pub fn cumulative_performance(&self) -> Option<f64> {
        mean_defined(self.records.iter())
    }

    /// Mean instantaneous accuracy over the trailing `window` trials,
    /// skipping "no data" trials within that window.
    pub fn running_performance(&self, window: usize) -> Option<f64> {
        let start = self.records.len().saturating_sub(window);
        mean_defined(self.records[start..].iter())
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("cannot create log directory {}", parent.display())
                })?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let file = fs::File::create(&tmp)
                .with_context(|| format!("cannot write session log {}", tmp.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), &self.records)?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("cannot replace session log {}", self.path.display()))?;
        Ok(())
    }
}

fn mean_defined<'a>(records: impl Iterator<Item = &'a TrialRecord>) -> Option<f64> {
    let values: Vec<f64> = records.filter_map(|r| r.instant_performance).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oba_core::PatchId;

    fn record(trial_num: usize, instant: Option<f64>) -> TrialRecord {
        TrialRecord {
            trial_num,
            frequency_tags: [12.0, 7.5],
            cued_patch: PatchId::One,
            n_events: usize::from(instant.is_some()),
            event_frames: vec![],
            event_patches: vec![],
            event_directions: vec![],
            tilt_magnitude: 50,
            event_times_ms: vec![],
            response_times_ms: vec![],
            instant_performance: instant,
            avg_rt_ms: None,
            cumulative_performance: None,
            running_performance: None,
        }
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("oba_log_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn no_data_trials_are_skipped_by_aggregates() {
        let mut log = SessionLog::create(scratch_path("skip"));
        log.records.push(record(1, Some(100.0)));
        log.records.push(record(2, None));
        log.records.push(record(3, Some(50.0)));
        assert_eq!(log.cumulative_performance(), Some(75.0));
        assert_eq!(log.running_performance(RUNNING_WINDOW), Some(75.0));
    }

    #[test]
    fn all_no_data_yields_no_data() {
        let mut log = SessionLog::create(scratch_path("none"));
        log.records.push(record(1, None));
        log.records.push(record(2, None));
        assert_eq!(log.cumulative_performance(), None);
        assert_eq!(log.running_performance(RUNNING_WINDOW), None);
    }

    #[test]
    fn running_window_only_sees_trailing_trials() {
        let mut log = SessionLog::create(scratch_path("window"));
        for i in 1..=10 {
            log.records.push(record(i, Some(0.0)));
        }
        for i in 11..=20 {
            log.records.push(record(i, Some(100.0)));
        }
        assert_eq!(log.running_performance(RUNNING_WINDOW), Some(100.0));
        assert_eq!(log.cumulative_performance(), Some(50.0));
    }

    #[test]
    fn reload_reproduces_backfilled_aggregates() {
        let path = scratch_path("reload");
        let mut log = SessionLog::create(&path);
        log.append(record(1, Some(100.0))).unwrap();
        log.backfill_performance().unwrap();
        log.append(record(2, Some(60.0))).unwrap();
        let (cumulative, running) = log.backfill_performance().unwrap();

        let reloaded = SessionLog::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        let last = reloaded.last().unwrap();
        assert_eq!(last.cumulative_performance, cumulative);
        assert_eq!(last.running_performance, running);
        assert_eq!(reloaded.cumulative_performance(), cumulative);
        assert_eq!(
            reloaded.running_performance(RUNNING_WINDOW),
            running
        );
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn loading_a_missing_log_fails() {
        assert!(SessionLog::load(scratch_path("missing_never_written")).is_err());
    }
}
