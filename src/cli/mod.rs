use clap::{Parser, Subcommand};

use crate::config::StorageProfile;

#[derive(Parser)]
#[command(
    name = "shorts",
    about = "Shorts pipeline - cut YouTube videos into short clips and publish them",
    version,
    long_about = "Disposable CI steps that download a YouTube video, split it into one-minute clips with ffmpeg, upload the clips to S3-compatible storage and record them in Postgres. Secrets are read from the environment."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// YouTube video identifier
    #[arg(long, global = true, env = "VIDEO_ID", value_name = "ID")]
    pub video_id: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Download a video, build its analysis and archive, and upload them to the processing bucket
    Ingest,

    /// Download the archive and analysis of a video from the processing bucket
    Fetch,

    /// Download, segment, cut and publish the clips of a video
    Process,

    /// Publish clips already cut into the shorts directory
    Publish,

    /// Show or initialise the settings file
    Config {
        /// Show current settings
        #[arg(short, long)]
        show: bool,

        /// Write the default settings to ./shorts.yaml
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Ingest => "ingest",
            Commands::Fetch => "fetch",
            Commands::Process => "process",
            Commands::Publish => "publish",
            Commands::Config { .. } => "config",
        }
    }

    /// Storage credentials a pipeline step reads, `None` for commands without storage
    pub fn storage_profile(&self) -> Option<StorageProfile> {
        match self {
            Commands::Ingest | Commands::Fetch => Some(StorageProfile::Processing),
            Commands::Process => Some(StorageProfile::Shorts),
            Commands::Publish => Some(StorageProfile::Default),
            Commands::Config { .. } => None,
        }
    }

    pub fn needs_database(&self) -> bool {
        matches!(self, Commands::Process | Commands::Publish)
    }

    /// Steps that shell out to yt-dlp, ffmpeg and ffprobe
    pub fn needs_tools(&self) -> bool {
        matches!(self, Commands::Ingest | Commands::Process)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_video_id_flag() {
        let cli = Cli::try_parse_from(["shorts", "process", "--video-id", "abc123", "-q"]).unwrap();
        assert_eq!(cli.command, Commands::Process);
        assert_eq!(cli.video_id.as_deref(), Some("abc123"));
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_flags_conflict() {
        assert!(Cli::try_parse_from(["shorts", "config", "--show", "--init"]).is_err());
    }

    #[test]
    fn test_step_requirements() {
        assert_eq!(
            Commands::Ingest.storage_profile(),
            Some(StorageProfile::Processing)
        );
        assert_eq!(Commands::Publish.storage_profile(), Some(StorageProfile::Default));
        assert!(Commands::Process.needs_database());
        assert!(!Commands::Fetch.needs_database());
        assert!(!Commands::Fetch.needs_tools());
        assert_eq!(
            Commands::Config {
                show: true,
                init: false
            }
            .storage_profile(),
            None
        );
    }
}
