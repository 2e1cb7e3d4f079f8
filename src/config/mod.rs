use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod env;

pub use env::{ConfigError, DatabaseConfig, RunConfig, StorageConfig, StorageProfile};

/// Non-secret settings, optionally loaded from a YAML file.
///
/// Secrets never live here; they come from the environment through [`RunConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// External tool locations
    pub tools: ToolSettings,

    /// Working directories, relative to the current directory
    pub workspace: WorkspaceSettings,

    /// YouTube access settings
    pub youtube: YoutubeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Video downloader binary
    pub yt_dlp: String,

    /// Transcoder binary
    pub ffmpeg: String,

    /// Media probe binary
    pub ffprobe: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Where `process` downloads source videos
    pub downloads_dir: PathBuf,

    /// Where clips are written and where `publish` looks for them
    pub shorts_dir: PathBuf,

    /// Root of the per-video directories used by `ingest` and `fetch`
    pub temp_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// Cookie files tried in order; the first one that exists is used
    pub cookies_paths: Vec<PathBuf>,

    /// Transcript languages in order of preference
    pub transcript_languages: Vec<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            yt_dlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("downloads"),
            shorts_dir: PathBuf::from("shorts"),
            temp_dir: PathBuf::from("temp"),
        }
    }
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            cookies_paths: vec![
                PathBuf::from("youtube_cookies.txt"),
                PathBuf::from(".github/youtube_cookies.txt"),
                PathBuf::from("../youtube_cookies.txt"),
            ],
            transcript_languages: vec!["vi".to_string(), "en".to_string()],
        }
    }
}

impl Settings {
    /// Load settings from the first settings file found, or fall back to defaults
    pub fn load() -> Result<Self> {
        match Self::existing_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read settings file")?;

        let settings: Settings =
            serde_yaml::from_str(&content).context("Failed to parse settings file")?;

        settings.validate()?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write these settings to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize settings")?;

        fs_err::write(path, content).context("Failed to write settings file")?;

        Ok(())
    }

    /// Candidate settings file locations, in lookup order
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("shorts.yaml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("shorts-pipeline").join("config.yaml"));
        }
        paths
    }

    fn existing_path() -> Option<PathBuf> {
        Self::candidate_paths().into_iter().find(|p| p.exists())
    }

    /// Validate settings
    fn validate(&self) -> Result<()> {
        if self.tools.yt_dlp.trim().is_empty()
            || self.tools.ffmpeg.trim().is_empty()
            || self.tools.ffprobe.trim().is_empty()
        {
            anyhow::bail!("Tool paths in the settings file must not be empty");
        }

        if self.youtube.transcript_languages.is_empty() {
            anyhow::bail!("At least one transcript language must be configured");
        }

        Ok(())
    }

    /// First configured cookie file that exists
    pub fn find_cookies_file(&self) -> Option<PathBuf> {
        self.youtube
            .cookies_paths
            .iter()
            .find(|p| p.is_file())
            .cloned()
    }

    /// Display current settings
    pub fn display(&self) {
        println!("Current Settings:");
        println!("  yt-dlp: {}", self.tools.yt_dlp);
        println!("  ffmpeg: {}", self.tools.ffmpeg);
        println!("  ffprobe: {}", self.tools.ffprobe);
        println!("  Downloads dir: {}", self.workspace.downloads_dir.display());
        println!("  Shorts dir: {}", self.workspace.shorts_dir.display());
        println!("  Temp dir: {}", self.workspace.temp_dir.display());
        let cookies: Vec<String> = self
            .youtube
            .cookies_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        println!("  Cookie files: {}", cookies.join(", "));
        println!(
            "  Transcript languages: {}",
            self.youtube.transcript_languages.join(", ")
        );
    }
}
