use clap::Parser;

use crate::validation::RawRequest;

#[derive(Parser, Debug)]
#[command(
    name = "mashup",
    about = "Mashup - merge the opening seconds of a singer's top videos into one mp3",
    version,
    long_about = "Searches YouTube for a singer, downloads the audio of the top results, trims the first few seconds of each and concatenates them into a single mp3 file.",
    after_help = "Example:\n  mashup \"Sharry Maan\" 20 25 output.mp3"
)]
pub struct Cli {
    /// Name of the singer to search for (quote names containing spaces)
    #[arg(value_name = "SINGER_NAME")]
    pub singer_name: String,

    /// Number of videos to download (must be > 10)
    #[arg(value_name = "NUMBER_OF_VIDEOS", allow_negative_numbers = true)]
    pub num_videos: String,

    /// Seconds to keep from the start of each audio (must be > 20)
    #[arg(value_name = "AUDIO_DURATION", allow_negative_numbers = true)]
    pub duration: String,

    /// Output file name (must end in .mp3)
    #[arg(value_name = "OUTPUT_FILE")]
    pub output: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Positional arguments as an unvalidated request
    pub fn raw_request(&self) -> RawRequest {
        RawRequest {
            query: self.singer_name.clone(),
            count: self.num_videos.clone(),
            trim_seconds: self.duration.clone(),
            destination: self.output.clone(),
        }
    }
}

/// Usage text printed when the positional arguments are wrong
pub fn usage() -> &'static str {
    r#"Usage:
  mashup "<SingerName>" <NumberOfVideos> <AudioDuration> <OutputFileName>

Example:
  mashup "Sharry Maan" 20 25 output.mp3

Parameters:
  SingerName      : Name of the singer to search
  NumberOfVideos  : Number of videos to download (must be > 10)
  AudioDuration   : Duration to trim from each audio in seconds (must be > 20)
  OutputFileName  : Name of output mp3 file"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_four_positionals() {
        let cli = Cli::try_parse_from(["mashup", "Sharry Maan", "20", "25", "out.mp3"]).unwrap();
        let raw = cli.raw_request();
        assert_eq!(raw.query, "Sharry Maan");
        assert_eq!(raw.count, "20");
        assert_eq!(raw.trim_seconds, "25");
        assert_eq!(raw.destination, "out.mp3");
        assert!(!cli.verbose);
    }

    #[test]
    fn test_negative_numbers_reach_validation() {
        let cli = Cli::try_parse_from(["mashup", "Singer", "-5", "-1", "out.mp3"]).unwrap();
        assert_eq!(cli.num_videos, "-5");
        assert_eq!(cli.duration, "-1");
    }

    #[test]
    fn test_rejects_wrong_argument_count() {
        assert!(Cli::try_parse_from(["mashup", "Singer", "20"]).is_err());
        assert!(Cli::try_parse_from(["mashup", "Singer", "20", "25", "a.mp3", "extra"]).is_err());
    }
}
