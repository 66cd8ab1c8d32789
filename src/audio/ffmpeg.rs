use anyhow::Context;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::AudioCodec;
use crate::config::Config;
use crate::Result;

/// Audio codec operations backed by the ffmpeg and ffprobe binaries
pub struct FfmpegCodec {
    ffmpeg_path: String,
    ffprobe_path: String,
    bitrate_kbps: u32,
}

impl FfmpegCodec {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            bitrate_kbps: 192,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            ffmpeg_path: config.tools.ffmpeg.clone(),
            ffprobe_path: config.tools.ffprobe.clone(),
            bitrate_kbps: config.fetch.audio_bitrate_kbps,
        }
    }

    async fn run_ffmpeg(&self, args: &[String]) -> Result<()> {
        tracing::debug!("Running {} {}", self.ffmpeg_path, args.join(" "));

        let output = Command::new(&self.ffmpeg_path)
            .args(args)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ffmpeg_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            let last = error.lines().rev().find(|line| !line.trim().is_empty()).unwrap_or("");
            anyhow::bail!("ffmpeg failed: {}", last.trim());
        }

        Ok(())
    }

    fn encode_args(&self) -> Vec<String> {
        vec![
            "-vn".into(),
            "-c:a".into(),
            "libmp3lame".into(),
            "-b:a".into(),
            format!("{}k", self.bitrate_kbps),
        ]
    }
}

#[async_trait]
impl AudioCodec for FfmpegCodec {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v", "quiet",
                "-print_format", "json",
                "-show_format",
            ])
            .arg(path)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ffprobe_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to analyze file with ffprobe: {}", error);
        }

        let info: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        info["format"]["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok())
            .with_context(|| format!("No duration reported for {}", path.display()))
    }

    async fn trim(&self, src: &Path, dst: &Path, seconds: u32) -> Result<()> {
        // -t past the end of the stream simply stops at the end
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-i".into(),
            src.to_string_lossy().into_owned(),
            "-t".into(),
            seconds.to_string(),
        ];
        args.extend(self.encode_args());
        args.push(dst.to_string_lossy().into_owned());

        self.run_ffmpeg(&args)
            .await
            .with_context(|| format!("Failed to trim {}", src.display()))
    }

    async fn concat(&self, inputs: &[PathBuf], dst: &Path) -> Result<()> {
        if inputs.is_empty() {
            fs_err::write(dst, b"")?;
            return Ok(());
        }

        // Concat demuxer list file, removed when `list` is dropped
        let list_dir = dst.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let mut list = tempfile::Builder::new()
            .prefix("concat_")
            .suffix(".txt")
            .tempfile_in(list_dir)
            .context("Failed to create concat list")?;
        for input in inputs {
            let absolute = fs_err::canonicalize(input)?;
            writeln!(list, "file '{}'", escape_concat_path(&absolute.to_string_lossy()))?;
        }
        list.flush()?;

        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list.path().to_string_lossy().into_owned(),
        ];
        args.extend(self.encode_args());
        args.push(dst.to_string_lossy().into_owned());

        self.run_ffmpeg(&args)
            .await
            .with_context(|| format!("Failed to merge {} clips", inputs.len()))
    }
}

impl Default for FfmpegCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Quote a path for a single-quoted concat list entry
fn escape_concat_path(path: &str) -> String {
    path.replace('\'', r"'\''")
}
