//! Shared fakes for integration tests.
//!
//! A fake audio "file" is plain text with one `label seconds` segment per
//! line, so trimming, merge order and durations can be checked without
//! ffmpeg.
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mashup::fetch::{AssetStage, AudioAsset, FetchReport, Fetcher};
use mashup::{AudioCodec, Config, Mailer, MashupPipeline, Result};

/// Parse a fake audio file into its segments
pub fn read_segments(path: &Path) -> Vec<(String, f64)> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (label, seconds) = line.rsplit_once(' ').unwrap();
            (label.to_string(), seconds.parse().unwrap())
        })
        .collect()
}

pub fn write_segments(path: &Path, segments: &[(String, f64)]) {
    let text: String = segments
        .iter()
        .map(|(label, seconds)| format!("{} {}\n", label, seconds))
        .collect();
    std::fs::write(path, text).unwrap();
}

/// Codec over `label seconds` text files
#[derive(Default)]
pub struct SegmentCodec {
    pub trims: AtomicUsize,
    /// Labels whose clips cannot be trimmed
    pub corrupt: Vec<String>,
}

impl SegmentCodec {
    pub fn with_corrupt(labels: &[&str]) -> Self {
        Self {
            trims: AtomicUsize::new(0),
            corrupt: labels.iter().map(|label| label.to_string()).collect(),
        }
    }
}

#[async_trait]
impl AudioCodec for SegmentCodec {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        Ok(read_segments(path).iter().map(|(_, seconds)| seconds).sum())
    }

    async fn trim(&self, src: &Path, dst: &Path, seconds: u32) -> Result<()> {
        self.trims.fetch_add(1, Ordering::SeqCst);
        let segments = read_segments(src);
        if segments.iter().any(|(label, _)| self.corrupt.contains(label)) {
            anyhow::bail!("corrupt");
        }

        let mut remaining = seconds as f64;
        let mut kept = Vec::new();
        for (label, length) in segments {
            if remaining <= 0.0 {
                break;
            }
            kept.push((label, length.min(remaining)));
            remaining -= length;
        }
        write_segments(dst, &kept);
        Ok(())
    }

    async fn concat(&self, inputs: &[PathBuf], dst: &Path) -> Result<()> {
        let mut all = Vec::new();
        for input in inputs {
            all.extend(read_segments(input));
        }
        write_segments(dst, &all);
        Ok(())
    }
}

/// Fetcher writing one fake clip per configured length
pub struct FakeFetcher {
    pub clips: Vec<f64>,
    /// Results reported as failed, as `(item, reason)`
    pub failures: Vec<(String, String)>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new(clips: Vec<f64>) -> Self {
        Self {
            clips,
            failures: Vec::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_failures(mut self, failures: &[(&str, &str)]) -> Self {
        self.failures = failures
            .iter()
            .map(|(item, reason)| (item.to_string(), reason.to_string()))
            .collect();
        self
    }

    pub fn with_minutes(count: usize) -> Self {
        Self::new(vec![60.0; count])
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, query: &str, count: u32, dest: &Path) -> Result<FetchReport> {
        self.queries.lock().unwrap().push(query.to_string());
        let mut report = FetchReport::new(count);
        for (idx, seconds) in self.clips.iter().enumerate() {
            let label = format!("clip{:02}", idx);
            let path = dest.join(format!("{}.mp3", label));
            write_segments(&path, &[(label, *seconds)]);
            report.items.push_ok(AudioAsset::new(path, AssetStage::Fetched));
        }
        for (item, reason) in &self.failures {
            report.items.push_failed(item.as_str(), reason.as_str());
        }
        Ok(report)
    }

    fn platform_name(&self) -> &'static str {
        "Fake"
    }
}

/// Mailer that records recipients and the archive entry it was handed
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, archive: &Path) -> Result<()> {
        let file = std::fs::File::open(archive)?;
        let zip = zip::ZipArchive::new(file)?;
        let names = zip.file_names().map(str::to_string).collect();
        self.sent.lock().unwrap().push((to.to_string(), names));
        Ok(())
    }
}

/// Config rooted in `root` with SMTP credentials present
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.workspace.root = Some(root.to_path_buf());
    config.smtp.email = Some("bot@example.com".to_string());
    config.smtp.password = Some("app-password".to_string());
    config
}

pub struct Harness {
    pub pipeline: Arc<MashupPipeline>,
    pub fetcher: Arc<FakeFetcher>,
    pub codec: Arc<SegmentCodec>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn harness(config: Config, fetcher: FakeFetcher) -> Harness {
    harness_with_codec(config, fetcher, SegmentCodec::default())
}

pub fn harness_with_codec(config: Config, fetcher: FakeFetcher, codec: SegmentCodec) -> Harness {
    let fetcher = Arc::new(fetcher);
    let codec = Arc::new(codec);
    let mailer = Arc::new(RecordingMailer::default());
    let as_fetcher: Arc<dyn Fetcher> = fetcher.clone();
    let as_codec: Arc<dyn AudioCodec> = codec.clone();
    let as_mailer: Arc<dyn Mailer> = mailer.clone();
    let pipeline = Arc::new(MashupPipeline::new(config, as_fetcher, as_codec, Some(as_mailer)));

    Harness {
        pipeline,
        fetcher,
        codec,
        mailer,
    }
}
