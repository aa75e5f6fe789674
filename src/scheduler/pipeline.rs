use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::io::{read_table_or_empty, write_table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Active,
    Inactive,
}

/// A recurring binding of one operation to a cadence with jitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    #[serde(alias = "op_id")]
    pub operation_id: i64,
    pub state: PipelineState,
    /// Seconds between runs
    pub repeat_every_time: u64,
    /// Maximum jitter in seconds, either side of the cadence
    pub diff_time: u64,
    /// Unix timestamp of the next run
    pub next_exec: i64,
}

impl Pipeline {
    pub fn is_active(&self) -> bool {
        self.state == PipelineState::Active
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.is_active() && self.next_exec <= now
    }

    fn max_jitter(&self) -> i64 {
        i64::try_from(self.diff_time).unwrap_or(i64::MAX)
    }

    /// `now + repeat_every_time + jitter`, jitter clamped to `±diff_time`.
    ///
    /// `None` when the result does not fit a timestamp.
    pub fn next_exec_after(&self, now: i64, jitter: i64) -> Option<i64> {
        let diff = self.max_jitter();
        let repeat = i64::try_from(self.repeat_every_time).ok()?;
        now.checked_add(repeat)?
            .checked_add(jitter.clamp(-diff, diff))
    }

    /// Uniform integer jitter in `[-diff_time, diff_time]`
    pub fn random_jitter(&self) -> i64 {
        let diff = self.max_jitter();
        rand::rng().random_range(-diff..=diff)
    }
}

/// Indices of due pipelines in store order
pub fn due_indices(pipelines: &[Pipeline], now: i64) -> Vec<usize> {
    pipelines
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_due(now))
        .map(|(i, _)| i)
        .collect()
}

/// JSON file holding every pipeline row
#[derive(Debug, Clone)]
pub struct PipelineStore {
    path: PathBuf,
}

impl PipelineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every row in store order; an unreadable store degrades to empty
    pub fn load(&self) -> Vec<Pipeline> {
        read_table_or_empty(&self.path)
    }

    pub fn save(&self, pipelines: &[Pipeline]) -> Result<(), StoreError> {
        write_table(&self.path, pipelines)
    }
}
