//! JSON store of finished games, grouped by game-mode id.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use lane_defence_core::GameOutcome;
use serde::{Deserialize, Serialize};

/// Outcome of a single finished game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GameRecord {
    pub(crate) outcome: GameOutcome,
    /// Active play time in milliseconds.
    pub(crate) elapsed_ms: u64,
}

impl GameRecord {
    pub(crate) fn new(outcome: GameOutcome, elapsed: Duration) -> Self {
        Self {
            outcome,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Results file backed by a single JSON document.
///
/// ```text
/// {
///   "modes": {
///     "classic": [ { "outcome": "victory", "elapsed_ms": 184250 } ]
///   }
/// }
/// ```
#[derive(Debug)]
pub(crate) struct ResultsStore {
    path: PathBuf,
    contents: StoredResults,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredResults {
    #[serde(default)]
    modes: BTreeMap<String, Vec<GameRecord>>,
}

impl ResultsStore {
    /// Opens the store at `path`, starting empty when the file does not exist yet.
    pub(crate) fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = if path.exists() {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("failed to read results file {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("failed to parse results file {}", path.display()))?
        } else {
            StoredResults::default()
        };
        Ok(Self { path, contents })
    }

    /// Appends a finished game to the mode's history.
    pub(crate) fn record(&mut self, mode: &str, record: GameRecord) {
        self.contents
            .modes
            .entry(mode.to_owned())
            .or_default()
            .push(record);
    }

    /// Every game recorded for the mode, oldest first.
    pub(crate) fn records(&self, mode: &str) -> &[GameRecord] {
        self.contents
            .modes
            .get(mode)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Fastest victory recorded for the mode.
    pub(crate) fn best_victory(&self, mode: &str) -> Option<GameRecord> {
        self.records(mode)
            .iter()
            .filter(|record| record.outcome == GameOutcome::Victory)
            .min_by_key(|record| record.elapsed_ms)
            .copied()
    }

    /// Writes the store back to disk through a temporary file.
    pub(crate) fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json =
            serde_json::to_string_pretty(&self.contents).context("failed to serialize results")?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)
            .with_context(|| format!("failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "saved results");
        Ok(())
    }
}
