//! Input validation for mashup requests.
//!
//! Every check runs on every call, so a single response lists all of the
//! problems with a request instead of just the first one.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

/// Minimum number of videos (exclusive)
pub const MIN_VIDEOS: u32 = 10;

/// Minimum trim length in seconds (exclusive)
pub const MIN_TRIM_SECONDS: u32 = 20;

/// Required suffix for CLI output files
pub const OUTPUT_EXTENSION: &str = ".mp3";

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// Which entry point a request came through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Cli,
    Web,
}

/// Request fields exactly as the user supplied them
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub query: String,
    pub count: String,
    pub trim_seconds: String,
    pub destination: String,
}

/// Where the finished mashup goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    File(PathBuf),
    Email(String),
}

/// A validated mashup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MashupRequest {
    query: String,
    count: u32,
    trim_seconds: u32,
    destination: Destination,
}

impl MashupRequest {
    /// Validate CLI arguments into a request
    pub fn parse_cli(raw: &RawRequest) -> Result<Self, Vec<String>> {
        let errors = validate_cli(raw);
        if !errors.is_empty() {
            return Err(errors);
        }
        Self::from_checked(raw, Destination::File(PathBuf::from(raw.destination.trim())))
    }

    /// Validate web form fields into a request
    pub fn parse_web(raw: &RawRequest, mail_configured: bool) -> Result<Self, Vec<String>> {
        let errors = validate_web(raw, mail_configured);
        if !errors.is_empty() {
            return Err(errors);
        }
        Self::from_checked(raw, Destination::Email(raw.destination.trim().to_string()))
    }

    fn from_checked(raw: &RawRequest, destination: Destination) -> Result<Self, Vec<String>> {
        // Already validated, so parse failures here only repeat the messages
        let count = parse_int(&raw.count).ok_or_else(|| vec![invalid_int_message("count")])?;
        let trim_seconds =
            parse_int(&raw.trim_seconds).ok_or_else(|| vec![invalid_int_message("duration")])?;

        Ok(Self {
            query: raw.query.trim().to_string(),
            count: count as u32,
            trim_seconds: trim_seconds as u32,
            destination,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn trim_seconds(&self) -> u32 {
        self.trim_seconds
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }
}

/// Validate CLI arguments, returning every violation found
pub fn validate_cli(raw: &RawRequest) -> Vec<String> {
    let mut errors = Vec::new();

    if raw.query.trim().is_empty() {
        errors.push("Singer name cannot be empty".to_string());
    }

    match parse_int(&raw.count) {
        Some(n) if n <= MIN_VIDEOS as i64 => {
            errors.push(format!("Number of videos must be > {} (got {})", MIN_VIDEOS, n))
        }
        Some(_) => {}
        None => errors.push("Number of videos must be an integer".to_string()),
    }

    match parse_int(&raw.trim_seconds) {
        Some(n) if n <= MIN_TRIM_SECONDS as i64 => errors.push(format!(
            "Audio duration must be > {} seconds (got {})",
            MIN_TRIM_SECONDS, n
        )),
        Some(_) => {}
        None => errors.push("Audio duration must be an integer".to_string()),
    }

    if !raw.destination.trim().ends_with(OUTPUT_EXTENSION) {
        errors.push(format!("Output file must have {} extension", OUTPUT_EXTENSION));
    }

    errors
}

/// Validate web form fields, returning every violation found
pub fn validate_web(raw: &RawRequest, mail_configured: bool) -> Vec<String> {
    let mut errors = Vec::new();

    if raw.query.trim().is_empty() {
        errors.push("Singer name is required".to_string());
    }

    match parse_int(&raw.count) {
        Some(n) if n <= MIN_VIDEOS as i64 => errors.push(format!(
            "Number of videos must be greater than {} (got {})",
            MIN_VIDEOS, n
        )),
        Some(_) => {}
        None => errors.push(invalid_int_message("count")),
    }

    match parse_int(&raw.trim_seconds) {
        Some(n) if n <= MIN_TRIM_SECONDS as i64 => errors.push(format!(
            "Duration must be greater than {} seconds (got {})",
            MIN_TRIM_SECONDS, n
        )),
        Some(_) => {}
        None => errors.push(invalid_int_message("duration")),
    }

    if !is_valid_email(raw.destination.trim()) {
        errors.push("Invalid email format".to_string());
    }

    if !mail_configured {
        errors.push(
            "Email service not configured. Please set SMTP_EMAIL and SMTP_PASSWORD environment variables."
                .to_string(),
        );
    }

    errors
}

/// Check an address against the accepted email pattern
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Integers are accepted with surrounding whitespace; values too large for u32 are rejected
fn parse_int(value: &str) -> Option<i64> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n <= u32::MAX as i64)
}

fn invalid_int_message(field: &str) -> String {
    match field {
        "count" => "Number of videos must be a valid integer".to_string(),
        _ => "Duration must be a valid integer".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(query: &str, count: &str, seconds: &str, destination: &str) -> RawRequest {
        RawRequest {
            query: query.to_string(),
            count: count.to_string(),
            trim_seconds: seconds.to_string(),
            destination: destination.to_string(),
        }
    }

    #[test]
    fn test_valid_cli_request() {
        let request = MashupRequest::parse_cli(&raw("Sharry Maan", "20", "25", "output.mp3")).unwrap();
        assert_eq!(request.query(), "Sharry Maan");
        assert_eq!(request.count(), 20);
        assert_eq!(request.trim_seconds(), 25);
        assert_eq!(request.destination(), &Destination::File(PathBuf::from("output.mp3")));
    }

    #[test]
    fn test_count_boundary() {
        for count in [-3, 0, 5, 10] {
            let errors = validate_cli(&raw("Singer", &count.to_string(), "30", "out.mp3"));
            assert_eq!(errors.len(), 1, "count {} should be rejected", count);
            assert!(errors[0].contains("> 10"));
        }
        for count in [11, 12, 50] {
            assert!(validate_cli(&raw("Singer", &count.to_string(), "30", "out.mp3")).is_empty());
        }
    }

    #[test]
    fn test_trim_boundary() {
        for seconds in [0, 15, 20] {
            let errors = validate_cli(&raw("Singer", "15", &seconds.to_string(), "out.mp3"));
            assert_eq!(errors.len(), 1, "seconds {} should be rejected", seconds);
            assert!(errors[0].contains("> 20"));
        }
        for seconds in [21, 25, 90] {
            assert!(validate_cli(&raw("Singer", "15", &seconds.to_string(), "out.mp3")).is_empty());
        }
    }

    #[test]
    fn test_non_integer_fields() {
        let errors = validate_cli(&raw("Singer", "twenty", "2.5", "out.mp3"));
        assert_eq!(
            errors,
            vec![
                "Number of videos must be an integer".to_string(),
                "Audio duration must be an integer".to_string(),
            ]
        );
    }

    #[test]
    fn test_cli_requires_mp3_suffix() {
        let errors = validate_cli(&raw("Singer", "15", "25", "out.wav"));
        assert_eq!(errors, vec!["Output file must have .mp3 extension".to_string()]);
    }

    #[test]
    fn test_blank_query_rejected() {
        let errors = validate_cli(&raw("   ", "15", "25", "out.mp3"));
        assert_eq!(errors, vec!["Singer name cannot be empty".to_string()]);
    }

    #[test]
    fn test_web_accumulates_all_errors() {
        let errors = validate_web(&raw("", "5", "10", "bad"), true);
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e == "Singer name is required"));
        assert!(errors.iter().any(|e| e.contains("greater than 10 (got 5)")));
        assert!(errors.iter().any(|e| e.contains("greater than 20 seconds (got 10)")));
        assert!(errors.iter().any(|e| e == "Invalid email format"));
    }

    #[test]
    fn test_web_reports_missing_mail_configuration() {
        let errors = validate_web(&raw("Singer", "15", "25", "fan@example.com"), false);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Email service not configured"));
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("fan@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co.uk"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@example.c"));
        assert!(!is_valid_email("user name@example.com"));
    }

    #[test]
    fn test_web_request_trims_fields() {
        let request =
            MashupRequest::parse_web(&raw("  Singer ", " 15 ", "25", " fan@example.com "), true).unwrap();
        assert_eq!(request.query(), "Singer");
        assert_eq!(request.count(), 15);
        assert_eq!(request.destination(), &Destination::Email("fan@example.com".to_string()));
    }

    #[test]
    fn test_huge_count_is_not_an_integer() {
        let errors = validate_cli(&raw("Singer", "99999999999", "25", "out.mp3"));
        assert_eq!(errors, vec!["Number of videos must be an integer".to_string()]);
    }
}
