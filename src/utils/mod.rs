use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::path::Path;
use std::time::Duration;

pub mod command;

pub use command::{run_tool, ToolError};

/// Characters that may not appear in a clip filename
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum length (in characters) of a sanitized title
pub const MAX_FILENAME_TITLE_LEN: usize = 50;

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;
    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Format seconds as `HH:MM:SS.mmm` for ffmpeg's `-ss` and `-t` arguments
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
}

/// Turn a clip title into a filesystem-safe filename fragment.
///
/// Strips reserved characters, turns spaces into underscores, keeps only alphanumerics,
/// `_` and `-`, cuts the result to [`MAX_FILENAME_TITLE_LEN`] characters and trims
/// surrounding underscores. Applying it twice gives the same result as applying it once.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !INVALID_FILENAME_CHARS.contains(c))
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_FILENAME_TITLE_LEN)
        .collect();

    cleaned.trim_matches('_').to_string()
}

/// Show only the first few characters of a credential
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(8).collect();
    format!("{}...", visible)
}

/// Size of a file on disk, 0 when it cannot be read
pub async fn file_size(path: &Path) -> u64 {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.len())
        .unwrap_or(0)
}

/// Spinner shown while an external tool runs; hidden when `visible` is false
pub fn spinner(message: impl Into<Cow<'static, str>>, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

/// Check if the current environment has the external tools the pipeline shells out to
pub async fn check_dependencies(tools: &[&str]) -> Vec<String> {
    let mut missing = Vec::new();

    for tool in tools {
        if !check_command_available(tool).await {
            missing.push(format!("{} - not found in PATH", tool));
        }
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    // ffmpeg and ffprobe only understand `-version`
    let flag = if command.ends_with("ffmpeg") || command.ends_with("ffprobe") {
        "-version"
    } else {
        "--version"
    };

    Command::new(command)
        .arg(flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
