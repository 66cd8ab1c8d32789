use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{AssetStage, AudioAsset, FetchReport, Fetcher};
use crate::config::Config;
use crate::Result;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// YouTube search-and-download using yt-dlp
pub struct YtDlpFetcher {
    yt_dlp_path: String,
    ffmpeg_location: Option<String>,
    cookies_file: Option<PathBuf>,
    bitrate_kbps: u32,
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            ffmpeg_location: None,
            cookies_file: None,
            bitrate_kbps: 192,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        // Only point yt-dlp at ffmpeg when it is not the one on PATH
        let ffmpeg_location = (config.tools.ffmpeg != "ffmpeg").then(|| config.tools.ffmpeg.clone());

        Self {
            yt_dlp_path: config.tools.yt_dlp.clone(),
            ffmpeg_location,
            cookies_file: config.fetch.cookies_file.clone(),
            bitrate_kbps: config.fetch.audio_bitrate_kbps,
        }
    }

    fn build_args(&self, query: &str, count: u32, dest: &Path) -> Vec<String> {
        let template = dest.join("%(title)s.%(ext)s");

        let mut args: Vec<String> = vec![
            "--format".into(),
            "bestaudio/best".into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            "mp3".into(),
            "--audio-quality".into(),
            format!("{}K", self.bitrate_kbps),
            "--output".into(),
            template.to_string_lossy().into_owned(),
            // Skip results that fail instead of aborting the search
            "--ignore-errors".into(),
            "--extractor-args".into(),
            "youtube:player_client=android,web".into(),
            "--user-agent".into(),
            USER_AGENT.into(),
            // Report each finished file on stdout, in download order
            "--no-simulate".into(),
            "--print".into(),
            "after_move:filepath".into(),
        ];

        if let Some(cookies) = &self.cookies_file {
            if cookies.exists() {
                args.push("--cookies".into());
                args.push(cookies.to_string_lossy().into_owned());
            } else {
                tracing::warn!("Cookies file not found, continuing without: {}", cookies.display());
            }
        }

        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.clone());
        }

        args.push(format!("ytsearch{}:{}", count, query));
        args
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(&self, query: &str, count: u32, dest: &Path) -> Result<FetchReport> {
        let args = self.build_args(query, count, dest);
        tracing::debug!("Running {} {}", self.yt_dlp_path, args.join(" "));

        let output = Command::new(&self.yt_dlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| {
                format!(
                    "Failed to run {}. Please install it: https://github.com/yt-dlp/yt-dlp",
                    self.yt_dlp_path
                )
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut report = parse_output(count, &stdout, &stderr);
        append_unreported(&mut report, dest)?;

        if !output.status.success() && report.attempted() == 0 {
            // yt-dlp failed without naming any video, e.g. the search itself failed
            let reason = stderr.lines().last().unwrap_or("yt-dlp exited with an error");
            report.items.push_failed(format!("ytsearch{}:{}", count, query), reason.trim());
        }

        tracing::info!(
            "Fetched {} of {} requested results ({} failed)",
            report.assets().len(),
            count,
            report.failures().len()
        );

        Ok(report)
    }

    fn platform_name(&self) -> &'static str {
        "YouTube"
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a report from yt-dlp's printed file paths and error lines
fn parse_output(requested: u32, stdout: &str, stderr: &str) -> FetchReport {
    let mut report = FetchReport::new(requested);

    for line in stdout.lines().map(str::trim).filter(|line| !line.is_empty()) {
        report.items.push_ok(AudioAsset::new(line, AssetStage::Fetched));
    }

    for line in stderr.lines().map(str::trim) {
        if let Some(message) = line.strip_prefix("ERROR:") {
            let message = message.trim();
            let (item, reason) = message.split_once(": ").unwrap_or(("unknown", message));
            report.items.push_failed(item.trim(), reason.trim());
        }
    }

    report
}

/// Add mp3 files present in `dest` that yt-dlp did not print, then drop printed paths that are missing
fn append_unreported(report: &mut FetchReport, dest: &Path) -> Result<()> {
    let mut on_disk: Vec<PathBuf> = fs_err::read_dir(dest)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("mp3"))
        .collect();
    on_disk.sort();

    let present: HashSet<&PathBuf> = on_disk.iter().collect();
    let mut reported = HashSet::new();

    report.items.outcomes.retain(|outcome| match outcome {
        super::ItemOutcome::Ok(asset) => {
            let keep = present.contains(&asset.path) && reported.insert(asset.path.clone());
            if !keep {
                tracing::debug!("Ignoring reported file not on disk: {}", asset.path.display());
            }
            keep
        }
        super::ItemOutcome::Failed { .. } => true,
    });

    for path in on_disk {
        if !reported.contains(&path) {
            report.items.push_ok(AudioAsset::new(path, AssetStage::Fetched));
        }
    }

    Ok(())
}
