//! Mashup orchestration.
//!
//! A run moves through `PreparingWorkspace -> Fetching -> Staging -> Trimming ->
//! Merging -> (Packaging -> Notifying) -> CleaningUp -> Done`. Any failure after
//! the workspace exists ends in `Failed`, and the workspace is torn down before
//! the error is returned. Validation happens before a run: the pipeline only
//! accepts an already validated [`MashupRequest`].

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

pub mod report;

pub use report::Reporter;

use crate::audio::{AudioCodec, FfmpegCodec, MergeSummary, Merger, Trimmer};
use crate::config::Config;
use crate::fetch::{self, AudioAsset, Fetcher, YtDlpFetcher};
use crate::notify::{Mailer, SmtpMailer};
use crate::package;
use crate::utils::{format_duration, format_file_size};
use crate::validation::{Destination, MashupRequest, Variant};
use crate::workspace::Workspace;
use crate::{MashupError, Result};

/// Merged file name inside the web workspace's output directory
pub const OUTPUT_AUDIO: &str = "mashup.mp3";

/// Archive name inside the web workspace's output directory
pub const OUTPUT_ARCHIVE: &str = "mashup.zip";

/// Stages of a mashup run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Validating,
    PreparingWorkspace,
    Fetching,
    Staging,
    Trimming,
    Merging,
    Packaging,
    Notifying,
    CleaningUp,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Validating => write!(f, "Validating"),
            PipelineStage::PreparingWorkspace => write!(f, "Preparing workspace"),
            PipelineStage::Fetching => write!(f, "Fetching"),
            PipelineStage::Staging => write!(f, "Staging"),
            PipelineStage::Trimming => write!(f, "Trimming"),
            PipelineStage::Merging => write!(f, "Merging"),
            PipelineStage::Packaging => write!(f, "Packaging"),
            PipelineStage::Notifying => write!(f, "Notifying"),
            PipelineStage::CleaningUp => write!(f, "Cleaning up"),
            PipelineStage::Done => write!(f, "Done"),
            PipelineStage::Failed => write!(f, "Failed"),
        }
    }
}

/// What a successful run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub request_id: Uuid,
    pub requested: u32,
    pub fetched: usize,
    pub trimmed: usize,
    /// Items dropped along the way, as `item: reason`
    pub skipped: Vec<String>,
    pub merge: MergeSummary,
    /// Recipient, for runs that were emailed
    pub delivered_to: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Audio gathered before merging
struct Gathered {
    fetched: usize,
    trimmed: Vec<AudioAsset>,
    skipped: Vec<String>,
}

/// Handle to a background mashup job.
///
/// Dropping the handle detaches the job; it still runs to completion.
pub struct JobHandle {
    id: Uuid,
    handle: JoinHandle<Result<RunSummary>>,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the job and return its outcome
    pub async fn wait(self) -> Result<RunSummary> {
        self.handle.await.context("Mashup job panicked")?
    }
}

/// Sequences fetch, trim, merge and delivery for one request at a time
pub struct MashupPipeline {
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    codec: Arc<dyn AudioCodec>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl MashupPipeline {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        codec: Arc<dyn AudioCodec>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        Self {
            config,
            fetcher,
            codec,
            mailer,
        }
    }

    /// Wire yt-dlp, ffmpeg and SMTP from configuration
    pub fn from_config(config: Config) -> Self {
        let fetcher: Arc<dyn Fetcher> = Arc::new(YtDlpFetcher::from_config(&config));
        let codec: Arc<dyn AudioCodec> = Arc::new(FfmpegCodec::from_config(&config));
        let mailer: Option<Arc<dyn Mailer>> = if config.mail_configured() {
            Some(Arc::new(SmtpMailer::new(config.smtp.clone())))
        } else {
            None
        };

        Self::new(config, fetcher, codec, mailer)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fresh workspace for a request under the configured root
    pub fn new_workspace(&self, variant: Variant) -> Workspace {
        Workspace::new(self.config.workspace_root(), variant)
    }

    /// CLI run: merge into the requested file, then clean up
    pub async fn run_to_file(
        &self,
        request: &MashupRequest,
        workspace: &Workspace,
        reporter: &Reporter,
    ) -> Result<RunSummary> {
        let output = match request.destination() {
            Destination::File(path) => path.clone(),
            Destination::Email(_) => anyhow::bail!("run_to_file needs a file destination"),
        };

        let started_at = Utc::now();
        let mut stage = PipelineStage::Validating;
        let result = async {
            let gathered = self.gather(request, workspace, reporter, &mut stage).await?;
            let merge = self.merge(&gathered.trimmed, &output, reporter, &mut stage).await?;
            Ok::<_, anyhow::Error>((gathered, merge))
        }
        .await;

        let (gathered, merge) = self.finish(result, workspace, reporter, stage)?;
        Ok(summary(workspace, request, gathered, merge, None, started_at))
    }

    /// Web run: merge, zip, email the archive, then clean up
    pub async fn run_and_email(
        &self,
        request: &MashupRequest,
        workspace: &Workspace,
        reporter: &Reporter,
    ) -> Result<RunSummary> {
        let recipient = match request.destination() {
            Destination::Email(address) => address.clone(),
            Destination::File(_) => anyhow::bail!("run_and_email needs an email destination"),
        };

        let started_at = Utc::now();
        let mut stage = PipelineStage::Validating;
        let result = async {
            let gathered = self.gather(request, workspace, reporter, &mut stage).await?;

            let output = workspace.output().join(OUTPUT_AUDIO);
            let merge = self.merge(&gathered.trimmed, &output, reporter, &mut stage).await?;

            advance(&mut stage, PipelineStage::Packaging);
            reporter.section("📦 Creating zip file...");
            let archive = package::package(&output, &workspace.output().join(OUTPUT_ARCHIVE)).await?;
            reporter.success("Created zip file");

            advance(&mut stage, PipelineStage::Notifying);
            reporter.section(format!("📧 Sending email to {}...", recipient));
            let mailer = self.mailer.as_ref().ok_or(MashupError::MailNotConfigured)?;
            mailer.send(&recipient, &archive).await?;
            reporter.success("Email sent successfully");

            Ok::<_, anyhow::Error>((gathered, merge))
        }
        .await;

        let (gathered, merge) = self.finish(result, workspace, reporter, stage)?;
        Ok(summary(workspace, request, gathered, merge, Some(recipient), started_at))
    }

    /// Run `run_and_email` on a background task in its own workspace
    pub fn spawn_email_job(self: &Arc<Self>, request: MashupRequest) -> JobHandle {
        let pipeline = Arc::clone(self);
        let workspace = self.new_workspace(Variant::Web);
        let id = workspace.id();
        let span = tracing::info_span!("mashup_job", request = %id);

        let handle = tokio::spawn(
            async move {
                tracing::info!("🎵 Starting mashup for {}...", request.query());
                let result = pipeline
                    .run_and_email(&request, &workspace, &Reporter::silent())
                    .await;
                match &result {
                    Ok(_) => tracing::info!("✅ Mashup process completed successfully!"),
                    Err(e) => tracing::error!("❌ Error in mashup process: {:#}", e),
                }
                result
            }
            .instrument(span),
        );

        JobHandle { id, handle }
    }

    /// Prepare, fetch, stage and trim
    async fn gather(
        &self,
        request: &MashupRequest,
        workspace: &Workspace,
        reporter: &Reporter,
        stage: &mut PipelineStage,
    ) -> Result<Gathered> {
        let mut skipped = Vec::new();

        advance(stage, PipelineStage::PreparingWorkspace);
        workspace.prepare()?;
        let names: Vec<String> = workspace.dir_names().iter().map(|n| format!("{}/", n)).collect();
        reporter.success(format!("Created directories: {}", names.join(", ")));

        advance(stage, PipelineStage::Fetching);
        reporter.section(format!(
            "🎵 Searching for '{}' videos on {}...",
            request.query(),
            self.fetcher.platform_name()
        ));
        let spinner = reporter.spinner(format!("Downloading {} videos...", request.count()));
        let fetched = self
            .fetcher
            .fetch(request.query(), request.count(), &workspace.downloads())
            .await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        let fetched = fetched?;

        let assets = fetched.assets();
        for (idx, asset) in assets.iter().enumerate() {
            reporter.item(idx + 1, assets.len(), format!("Downloaded: {}", display_title(&asset.path)));
        }
        for (item, reason) in fetched.failures() {
            reporter.warn(format!("Could not download {}: {}", item, reason));
            skipped.push(format!("{}: {}", item, reason));
        }
        if assets.is_empty() {
            return Err(MashupError::NothingFetched.into());
        }
        reporter.success(format!("Successfully downloaded {} audio files", assets.len()));

        advance(stage, PipelineStage::Staging);
        reporter.section("🎧 Processing audio files...");
        let staged = fetch::stage_assets(&assets, &workspace.audios()).await;
        for (idx, asset) in staged.assets().iter().enumerate() {
            reporter.item(idx + 1, assets.len(), format!("Processed: {}", asset.file_name()));
        }
        for (item, reason) in staged.failures() {
            reporter.warn(format!("Could not process {}: {}", item, reason));
            skipped.push(format!("{}: {}", item, reason));
        }
        reporter.success(format!("Processed {} audio files", staged.succeeded()));

        advance(stage, PipelineStage::Trimming);
        reporter.section(format!(
            "✂️  Trimming first {} seconds from each audio...",
            request.trim_seconds()
        ));
        let staged_assets = staged.assets();
        let total = staged_assets.len();
        let trimmer = Trimmer::new(Arc::clone(&self.codec));
        let trimmed = trimmer
            .trim_all(&staged_assets, request.trim_seconds(), &workspace.trimmed(), |idx, asset, outcome| {
                match outcome {
                    Ok(_) => reporter.item(idx + 1, total, format!("Trimmed: {}", asset.file_name())),
                    Err(e) => reporter.warn(format!("Could not trim {}: {:#}", asset.file_name(), e)),
                }
            })
            .await;
        for (item, reason) in trimmed.failures() {
            skipped.push(format!("{}: {}", item, reason));
        }
        if trimmed.succeeded() == 0 {
            return Err(MashupError::NothingTrimmed.into());
        }
        reporter.success(format!("Trimmed {} audio files", trimmed.succeeded()));

        Ok(Gathered {
            fetched: assets.len(),
            trimmed: trimmed.assets(),
            skipped,
        })
    }

    async fn merge(
        &self,
        clips: &[AudioAsset],
        output: &Path,
        reporter: &Reporter,
        stage: &mut PipelineStage,
    ) -> Result<MergeSummary> {
        advance(stage, PipelineStage::Merging);
        reporter.section(format!("🔗 Merging {} audio files...", clips.len()));
        for (idx, clip) in clips.iter().enumerate() {
            reporter.item(idx + 1, clips.len(), format!("Merging: {}", clip.file_name()));
        }

        let merge = Merger::new(Arc::clone(&self.codec)).merge(clips, output).await?;

        reporter.success(format!("Successfully created: {}", output.display()));
        reporter.detail(format!("File size: {}", format_file_size(merge.size_bytes)));
        if let Some(duration) = merge.duration_secs {
            reporter.detail(format!("Duration: {:.2} seconds ({})", duration, format_duration(duration)));
        }

        Ok(merge)
    }

    /// Tear the workspace down on every path and tag failures with their stage
    fn finish<T>(
        &self,
        result: Result<T>,
        workspace: &Workspace,
        reporter: &Reporter,
        stage: PipelineStage,
    ) -> Result<T> {
        match result {
            Ok(value) => {
                reporter.section("🧹 Cleaning up temporary files...");
                workspace
                    .teardown()
                    .map_err(|e| stage_error(PipelineStage::CleaningUp, e))?;
                reporter.success("Cleanup completed");
                tracing::info!("Stage: {} -> {}", PipelineStage::CleaningUp, PipelineStage::Done);
                Ok(value)
            }
            Err(e) => {
                tracing::info!("Stage: {} -> {}", stage, PipelineStage::Failed);
                let error = stage_error(stage, e);
                reporter.error(format!("Error: {}", error));
                if let Err(cleanup) = workspace.teardown() {
                    tracing::warn!("Cleanup after failure also failed: {:#}", cleanup);
                }
                Err(error)
            }
        }
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    tracing::debug!("Stage: {} -> {}", stage, next);
    *stage = next;
}

/// Keep classified errors as they are, tag everything else with the failing stage
fn stage_error(stage: PipelineStage, error: anyhow::Error) -> anyhow::Error {
    if error.downcast_ref::<MashupError>().is_some() {
        return error;
    }
    MashupError::Stage {
        stage,
        message: format!("{:#}", error),
    }
    .into()
}

fn summary(
    workspace: &Workspace,
    request: &MashupRequest,
    gathered: Gathered,
    merge: MergeSummary,
    delivered_to: Option<String>,
    started_at: DateTime<Utc>,
) -> RunSummary {
    RunSummary {
        request_id: workspace.id(),
        requested: request.count(),
        fetched: gathered.fetched,
        trimmed: gathered.trimmed.len(),
        skipped: gathered.skipped,
        merge,
        delivered_to,
        started_at,
        completed_at: Utc::now(),
    }
}

/// Video title from a downloaded file name
fn display_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Unknown".to_string())
}
