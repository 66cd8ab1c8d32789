use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Outgoing mail settings
    pub smtp: SmtpConfig,

    /// External tool locations
    pub tools: ToolsConfig,

    /// Downloader settings
    pub fetch: FetchConfig,

    /// Working directory settings
    pub workspace: WorkspaceConfig,

    /// HTTP listener settings
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// SMTP relay host
    pub server: String,

    /// SMTP submission port (STARTTLS)
    pub port: u16,

    /// Sender address, also used as the login name
    pub email: Option<String>,

    /// Login password (app password for Gmail)
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub yt_dlp: String,
    pub ffmpeg: String,
    pub ffprobe: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Pre-authenticated cookie file handed to yt-dlp
    pub cookies_file: Option<PathBuf>,

    /// Target mp3 bitrate in kbps
    pub audio_bitrate_kbps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Root under which per-request workspaces are created (system temp dir if unset)
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: "smtp.gmail.com".to_string(),
            port: 587,
            email: None,
            password: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            cookies_file: None,
            audio_bitrate_kbps: 192,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Cookie file picked up from the working directory when none is configured
const DEFAULT_COOKIES_FILE: &str = "youtube_cookies.txt";

impl Config {
    /// Load configuration from the optional config file, then apply environment overrides
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match Self::config_path() {
            Some(path) => {
                let content = fs_err::read_to_string(&path)
                    .context("Failed to read config file")?;
                serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => Self::default(),
        };

        config.apply_env_with(|key| std::env::var(key).ok())?;

        if config.fetch.cookies_file.is_none() {
            let local = PathBuf::from(DEFAULT_COOKIES_FILE);
            if local.exists() {
                config.fetch.cookies_file = Some(local);
            }
        }

        Ok(config)
    }

    /// Apply overrides from an environment-like lookup
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(server) = non_empty("SMTP_SERVER") {
            self.smtp.server = server;
        }
        if let Some(port) = non_empty("SMTP_PORT") {
            self.smtp.port = port.trim().parse().context("Failed to parse SMTP_PORT")?;
        }
        if let Some(email) = non_empty("SMTP_EMAIL") {
            self.smtp.email = Some(email);
        }
        if let Some(password) = non_empty("SMTP_PASSWORD") {
            self.smtp.password = Some(password);
        }
        if let Some(cookies) = non_empty("YOUTUBE_COOKIES") {
            self.fetch.cookies_file = Some(PathBuf::from(cookies));
        }
        if let Some(path) = non_empty("YT_DLP_PATH") {
            self.tools.yt_dlp = path;
        }
        if let Some(path) = non_empty("FFMPEG_PATH") {
            self.tools.ffmpeg = path;
        }
        if let Some(path) = non_empty("FFPROBE_PATH") {
            self.tools.ffprobe = path;
        }
        if let Some(root) = non_empty("MASHUP_WORKSPACE") {
            self.workspace.root = Some(PathBuf::from(root));
        }
        if let Some(host) = non_empty("HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("PORT") {
            self.server.port = port.trim().parse().context("Failed to parse PORT")?;
        }

        Ok(())
    }

    /// Config file location, if one exists
    fn config_path() -> Option<PathBuf> {
        // Current directory first for easy local runs
        let local_config = PathBuf::from("mashup.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("mashup").join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// True when both SMTP credentials are present
    pub fn mail_configured(&self) -> bool {
        self.smtp.email.is_some() && self.smtp.password.is_some()
    }

    /// Directory under which per-request workspaces are created
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace
            .root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Display current configuration without secrets
    pub fn display(&self) {
        println!("📧 Email Configuration:");
        println!("  SMTP Server: {}:{}", self.smtp.server, self.smtp.port);
        match &self.smtp.email {
            Some(email) if self.mail_configured() => {
                println!("  Email: {}", email);
                println!("  ✓ Email service configured");
            }
            _ => {
                println!("  ⚠️  Warning: Email not configured!");
                println!("  Set environment variables:");
                println!("    SMTP_EMAIL=your-email@gmail.com");
                println!("    SMTP_PASSWORD=your-app-password");
                println!("    SMTP_SERVER=smtp.gmail.com (optional)");
                println!("    SMTP_PORT=587 (optional)");
            }
        }
        println!("🎬 Tools: yt-dlp={} ffmpeg={} ffprobe={}", self.tools.yt_dlp, self.tools.ffmpeg, self.tools.ffprobe);
        if let Some(cookies) = &self.fetch.cookies_file {
            println!("🍪 Cookies file: {}", cookies.display());
        }
        println!("📁 Workspace root: {}", self.workspace_root().display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.smtp.server, "smtp.gmail.com");
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.fetch.audio_bitrate_kbps, 192);
        assert!(!config.mail_configured());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_with(lookup(&[
                ("SMTP_SERVER", "mail.example.com"),
                ("SMTP_PORT", "2525"),
                ("SMTP_EMAIL", "bot@example.com"),
                ("SMTP_PASSWORD", "secret"),
                ("YOUTUBE_COOKIES", "/etc/cookies.txt"),
                ("MASHUP_WORKSPACE", "/var/tmp/mashup"),
                ("PORT", "8080"),
            ]))
            .unwrap();

        assert_eq!(config.smtp.server, "mail.example.com");
        assert_eq!(config.smtp.port, 2525);
        assert!(config.mail_configured());
        assert_eq!(config.fetch.cookies_file, Some(PathBuf::from("/etc/cookies.txt")));
        assert_eq!(config.workspace_root(), PathBuf::from("/var/tmp/mashup"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_blank_credentials_are_not_configured() {
        let mut config = Config::default();
        config
            .apply_env_with(lookup(&[("SMTP_EMAIL", "bot@example.com"), ("SMTP_PASSWORD", "  ")]))
            .unwrap();
        assert!(!config.mail_configured());
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let mut config = Config::default();
        assert!(config.apply_env_with(lookup(&[("SMTP_PORT", "abc")])).is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("smtp:\n  port: 465\n").unwrap();
        assert_eq!(config.smtp.port, 465);
        assert_eq!(config.smtp.server, "smtp.gmail.com");
        assert_eq!(config.tools.ffmpeg, "ffmpeg");
    }
}
