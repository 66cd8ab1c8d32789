//! Mashup - build an audio mashup from a singer's top videos
//!
//! This library searches a video platform for a singer, downloads the audio of the
//! top results, trims the leading seconds of each clip and concatenates them into a
//! single mp3. The CLI writes the result to a file; the web service zips it and
//! emails it to the requester.

pub mod audio;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod notify;
pub mod package;
pub mod pipeline;
pub mod utils;
pub mod validation;
pub mod web;
pub mod workspace;

pub use audio::{AudioCodec, FfmpegCodec, MergeSummary, Merger, Trimmer};
pub use cli::Cli;
pub use config::Config;
pub use fetch::{AssetStage, AudioAsset, FetchReport, Fetcher, ItemOutcome, YtDlpFetcher};
pub use notify::{Mailer, SmtpMailer};
pub use pipeline::{JobHandle, MashupPipeline, PipelineStage, Reporter, RunSummary};
pub use validation::{Destination, MashupRequest, RawRequest, Variant};
pub use workspace::Workspace;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error conditions callers of the pipeline need to tell apart
#[derive(thiserror::Error, Debug)]
pub enum MashupError {
    #[error("Invalid request: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("No videos were downloaded")]
    NothingFetched,

    #[error("No audio files were trimmed")]
    NothingTrimmed,

    #[error("Email service not configured. Please set SMTP_EMAIL and SMTP_PASSWORD environment variables.")]
    MailNotConfigured,

    #[error("{stage} failed: {message}")]
    Stage {
        stage: PipelineStage,
        message: String,
    },

    #[error("Process interrupted by user")]
    Interrupted,
}
