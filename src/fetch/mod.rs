use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod ytdlp;

pub use ytdlp::YtDlpFetcher;

use crate::Result;

/// Where an audio file sits in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetStage {
    /// Downloaded into the staging directory
    Fetched,
    /// Copied into the intermediate audio directory
    Staged,
    /// Cut down to the leading seconds
    Trimmed,
}

/// A single audio file tracked through the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioAsset {
    pub path: PathBuf,
    pub stage: AssetStage,
}

impl AudioAsset {
    pub fn new(path: impl Into<PathBuf>, stage: AssetStage) -> Self {
        Self {
            path: path.into(),
            stage,
        }
    }

    /// File name for display and for deriving downstream names
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Result of processing one item of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Ok(AudioAsset),
    Failed { item: String, reason: String },
}

/// Per-item outcomes of a batch step, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn push_ok(&mut self, asset: AudioAsset) {
        self.outcomes.push(ItemOutcome::Ok(asset));
    }

    pub fn push_failed(&mut self, item: impl Into<String>, reason: impl Into<String>) {
        self.outcomes.push(ItemOutcome::Failed {
            item: item.into(),
            reason: reason.into(),
        });
    }

    /// Assets that made it through, in order
    pub fn assets(&self) -> Vec<AudioAsset> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                ItemOutcome::Ok(asset) => Some(asset.clone()),
                ItemOutcome::Failed { .. } => None,
            })
            .collect()
    }

    /// `(item, reason)` for every failed item
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                ItemOutcome::Failed { item, reason } => Some((item.as_str(), reason.as_str())),
                ItemOutcome::Ok(_) => None,
            })
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, ItemOutcome::Ok(_)))
            .count()
    }

    /// Number of items attempted (succeeded + failed)
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }
}

/// Outcome of a search-and-download request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Number of results asked for
    pub requested: u32,
    pub items: BatchReport,
}

impl FetchReport {
    pub fn new(requested: u32) -> Self {
        Self {
            requested,
            items: BatchReport::default(),
        }
    }

    pub fn assets(&self) -> Vec<AudioAsset> {
        self.items.assets()
    }

    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.items.failures()
    }

    pub fn attempted(&self) -> usize {
        self.items.attempted()
    }
}

/// Search-and-download capability
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download audio for the top `count` results of `query` into `dest`.
    ///
    /// Individual results that fail are reported, not raised. An `Err` means the
    /// download mechanism itself could not run.
    async fn fetch(&self, query: &str, count: u32, dest: &Path) -> Result<FetchReport>;

    /// Name of the platform searched
    fn platform_name(&self) -> &'static str;
}

/// Copy fetched assets into the intermediate audio directory
pub async fn stage_assets(assets: &[AudioAsset], dest: &Path) -> BatchReport {
    let mut report = BatchReport::default();

    for asset in assets {
        let target = dest.join(asset.file_name());
        match tokio::fs::copy(&asset.path, &target).await {
            Ok(_) => report.push_ok(AudioAsset::new(target, AssetStage::Staged)),
            Err(e) => {
                tracing::warn!("Could not stage {}: {}", asset.path.display(), e);
                report.push_failed(asset.file_name(), e.to_string());
            }
        }
    }

    report
}
