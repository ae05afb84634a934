use crate::domain::analysis::{HistoryEntry, TradeAnalysis};
use anyhow::Context;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

/// Most recent analyses kept on disk; insertion beyond the cap evicts the
/// oldest.
pub const HISTORY_CAP: usize = 20;

/// Append-bounded list of past analyses, newest first, persisted as one
/// JSON file. Operations run on the serialized command path, so there is no
/// locking.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Opens the store at `path`. A missing file is an empty history;
    /// malformed contents are logged and discarded, never raised.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        Self { path, entries }
    }

    /// Saved entries, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn find(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Prepends a fresh entry and persists the truncated list.
    pub fn record(&mut self, analysis: TradeAnalysis, ticker: &str) -> anyhow::Result<&HistoryEntry> {
        let entry = HistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            ticker: ticker.to_string(),
            timestamp: Utc::now(),
            analysis,
        };
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_CAP);
        self.persist()?;
        Ok(&self.entries[0])
    }

    /// Removes the entry with `id`. Unknown ids are a no-op; returns
    /// whether anything was removed.
    pub fn remove(&mut self, id: &str) -> anyhow::Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        if self.entries.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Drops every entry and deletes the backing file itself. Distinct from
    /// an empty list left behind by deletions: the key goes away.
    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| {
                format!("failed to remove history file {}", self.path.display())
            }),
        }
    }

    fn persist(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create history directory {}", parent.display())
                })?;
            }
        }

        let body =
            serde_json::to_vec_pretty(&self.entries).context("failed to serialize history")?;

        // Write-then-rename so no partial-write state is ever observable.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &body)
            .with_context(|| format!("failed to write history file {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace history file {}", self.path.display()))?;
        Ok(())
    }
}

fn load_entries(path: &Path) -> Vec<HistoryEntry> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read history file");
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "history file is malformed; starting with an empty history"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::Recommendation;

    struct TempPath(PathBuf);

    impl Drop for TempPath {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.0);
        }
    }

    fn temp_path() -> TempPath {
        TempPath(
            std::env::temp_dir().join(format!("pulse-history-{}.json", uuid::Uuid::new_v4())),
        )
    }

    fn sample_analysis(summary: &str) -> TradeAnalysis {
        TradeAnalysis {
            recommendation: Recommendation::Buy,
            confidence_score: 82.0,
            summary: summary.to_string(),
            reasoning: vec!["momentum".to_string()],
            risk_factors: vec!["valuation".to_string()],
            key_metrics: vec![],
        }
    }

    #[test]
    fn record_caps_the_history_at_twenty_newest_first() {
        let path = temp_path();
        let mut store = HistoryStore::open(&path.0);
        for i in 0..25 {
            store
                .record(sample_analysis(&format!("entry {i}")), "AAPL")
                .unwrap();
        }

        assert_eq!(store.entries().len(), HISTORY_CAP);
        assert_eq!(store.entries()[0].analysis.summary, "entry 24");
        assert_eq!(store.entries()[HISTORY_CAP - 1].analysis.summary, "entry 5");
    }

    #[test]
    fn reopening_round_trips_recorded_entries() {
        let path = temp_path();
        {
            let mut store = HistoryStore::open(&path.0);
            store.record(sample_analysis("persisted"), "MSFT").unwrap();
        }

        let store = HistoryStore::open(&path.0);
        assert_eq!(store.entries().len(), 1);
        assert_eq!(store.entries()[0].ticker, "MSFT");
        assert_eq!(store.entries()[0].analysis.summary, "persisted");
    }

    #[test]
    fn removing_an_unknown_id_is_a_no_op() {
        let path = temp_path();
        let mut store = HistoryStore::open(&path.0);
        store.record(sample_analysis("kept"), "AAPL").unwrap();

        assert!(!store.remove("no-such-id").unwrap());
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn removing_an_entry_preserves_the_order_of_the_rest() {
        let path = temp_path();
        let mut store = HistoryStore::open(&path.0);
        for i in 0..3 {
            store
                .record(sample_analysis(&format!("entry {i}")), "AAPL")
                .unwrap();
        }
        let middle = store.entries()[1].id.clone();

        assert!(store.remove(&middle).unwrap());
        assert_eq!(store.entries().len(), 2);
        assert_eq!(store.entries()[0].analysis.summary, "entry 2");
        assert_eq!(store.entries()[1].analysis.summary, "entry 0");
    }

    #[test]
    fn clear_removes_the_backing_file_not_just_the_entries() {
        let path = temp_path();
        let mut store = HistoryStore::open(&path.0);
        store.record(sample_analysis("gone"), "AAPL").unwrap();
        assert!(path.0.exists());

        store.clear().unwrap();
        assert!(store.entries().is_empty());
        assert!(!path.0.exists());

        let reopened = HistoryStore::open(&path.0);
        assert!(reopened.entries().is_empty());
    }

    #[test]
    fn malformed_file_loads_as_an_empty_history() {
        let path = temp_path();
        fs::write(&path.0, "{ not json").unwrap();

        let store = HistoryStore::open(&path.0);
        assert!(store.entries().is_empty());
    }
}
