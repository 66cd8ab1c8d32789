use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod ffmpeg;

pub use ffmpeg::FfmpegCodec;

use crate::fetch::{AssetStage, AudioAsset, BatchReport};
use crate::Result;

/// Name prefix for trimmed clips
pub const TRIMMED_PREFIX: &str = "trimmed_";

/// Decode / trim / concatenate / encode capability
#[async_trait]
pub trait AudioCodec: Send + Sync {
    /// Duration of an audio file in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Write the first `seconds` of `src` to `dst`; shorter sources are copied whole
    async fn trim(&self, src: &Path, dst: &Path, seconds: u32) -> Result<()>;

    /// Concatenate `inputs` end to end into `dst`, in the given order
    async fn concat(&self, inputs: &[PathBuf], dst: &Path) -> Result<()>;
}

/// Cuts fetched audio down to its leading seconds
pub struct Trimmer {
    codec: Arc<dyn AudioCodec>,
}

impl Trimmer {
    pub fn new(codec: Arc<dyn AudioCodec>) -> Self {
        Self { codec }
    }

    /// Trim one asset into `dir` as `trimmed_<name>`
    pub async fn trim(&self, asset: &AudioAsset, seconds: u32, dir: &Path) -> Result<AudioAsset> {
        let target = dir.join(format!("{}{}", TRIMMED_PREFIX, asset.file_name()));
        self.codec.trim(&asset.path, &target, seconds).await?;
        Ok(AudioAsset::new(target, AssetStage::Trimmed))
    }

    /// Trim every asset, keeping input order; failures are reported and skipped
    pub async fn trim_all<F>(&self, assets: &[AudioAsset], seconds: u32, dir: &Path, mut on_item: F) -> BatchReport
    where
        F: FnMut(usize, &AudioAsset, std::result::Result<&AudioAsset, &anyhow::Error>),
    {
        let mut report = BatchReport::default();

        for (idx, asset) in assets.iter().enumerate() {
            match self.trim(asset, seconds, dir).await {
                Ok(trimmed) => {
                    on_item(idx, asset, Ok(&trimmed));
                    report.push_ok(trimmed);
                }
                Err(e) => {
                    tracing::warn!("Could not trim {}: {:#}", asset.path.display(), e);
                    on_item(idx, asset, Err(&e));
                    report.push_failed(asset.file_name(), format!("{:#}", e));
                }
            }
        }

        report
    }
}

/// Observational facts about a merged file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub output: PathBuf,
    pub clips: usize,
    pub size_bytes: u64,
    /// `None` when the output could not be probed (e.g. empty output)
    pub duration_secs: Option<f64>,
}

/// Concatenates trimmed clips into the final file
pub struct Merger {
    codec: Arc<dyn AudioCodec>,
}

impl Merger {
    pub fn new(codec: Arc<dyn AudioCodec>) -> Self {
        Self { codec }
    }

    /// Concatenate `assets` strictly in order into `output`
    pub async fn merge(&self, assets: &[AudioAsset], output: &Path) -> Result<MergeSummary> {
        let inputs: Vec<PathBuf> = assets.iter().map(|asset| asset.path.clone()).collect();
        self.codec.concat(&inputs, output).await?;

        let size_bytes = fs_err::metadata(output)?.len();
        let duration_secs = if size_bytes == 0 {
            None
        } else {
            match self.codec.probe_duration(output).await {
                Ok(duration) => Some(duration),
                Err(e) => {
                    tracing::warn!("Could not probe merged output: {:#}", e);
                    None
                }
            }
        };

        Ok(MergeSummary {
            output: output.to_path_buf(),
            clips: assets.len(),
            size_bytes,
            duration_secs,
        })
    }
}
