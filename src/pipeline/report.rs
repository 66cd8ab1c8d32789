use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Display;
use std::time::Duration;

/// Progress output for a pipeline run.
///
/// The console reporter prints every step to stdout for the CLI. The silent
/// reporter is used for background jobs, where the same events only go to the
/// log.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    console: bool,
}

macro_rules! log_event {
    ($reporter:expr, $($arg:tt)+) => {
        if $reporter.console {
            tracing::debug!($($arg)+);
        } else {
            tracing::info!($($arg)+);
        }
    };
}

impl Reporter {
    pub fn console() -> Self {
        Self { console: true }
    }

    pub fn silent() -> Self {
        Self { console: false }
    }

    pub fn is_console(&self) -> bool {
        self.console
    }

    /// Start of a pipeline step
    pub fn section(&self, message: impl Display) {
        log_event!(self, "{}", message);
        if self.console {
            println!("\n{}", message);
        }
    }

    /// Indented detail line
    pub fn detail(&self, message: impl Display) {
        tracing::debug!("{}", message);
        if self.console {
            println!("  {}", message);
        }
    }

    /// Progress on one item of a batch
    pub fn item(&self, index: usize, total: usize, message: impl Display) {
        tracing::debug!("[{}/{}] {}", index, total, message);
        if self.console {
            println!("  [{}/{}] {}", index, total, message);
        }
    }

    pub fn success(&self, message: impl Display) {
        log_event!(self, "{}", message);
        if self.console {
            println!("{} {}", style("✓").green(), message);
        }
    }

    pub fn warn(&self, message: impl Display) {
        tracing::warn!("{}", message);
        if self.console {
            println!("  {} {}", style("⚠ Warning:").yellow(), message);
        }
    }

    pub fn error(&self, message: impl Display) {
        tracing::error!("{}", message);
        if self.console {
            println!("\n{} {}", style("❌").red(), message);
        }
    }

    /// Spinner for a long step with no per-item progress
    pub fn spinner(&self, message: impl Into<String>) -> Option<ProgressBar> {
        if !self.console {
            return None;
        }

        let progress = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            progress.set_style(spinner_style);
        }
        progress.set_message(message.into());
        progress.enable_steady_tick(Duration::from_millis(120));
        Some(progress)
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::silent()
    }
}
