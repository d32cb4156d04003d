//! CLI module for Sofy.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Sofy - short-form video generation
///
/// Assembles short videos from generative AI services, driven by YAML
/// configurations, and tracks every job it runs.
#[derive(Parser, Debug)]
#[command(name = "sofy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a video from a configuration
    Generate {
        /// Niche name (a file in the config directory) or path to a YAML file
        niche: String,

        /// Upload the result even if the configuration does not ask for it
        #[arg(long)]
        upload: bool,
    },

    /// List available video configurations
    List,

    /// List recorded jobs
    Jobs {
        /// Only pending and running jobs
        #[arg(short, long)]
        active: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one job
    Job {
        /// Job ID
        id: String,
    },

    /// Print the analytics report
    Report,

    /// Live dashboard of jobs, analytics and logs
    Monitor {
        /// Refresh interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Check credentials, directories and configurations
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "pipeline.max_concurrent_clips")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::parse_from(["sofy", "-vv", "generate", "motivational"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Generate { ref niche, upload: false } if niche == "motivational"
        ));
    }

    #[test]
    fn test_parse_jobs_flags() {
        let cli = Cli::parse_from(["sofy", "jobs", "--active", "--json", "--config", "/tmp/c.toml"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.toml"));
        assert!(matches!(cli.command, Commands::Jobs { active: true, json: true }));
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::parse_from(["sofy", "config", "set", "dashboard.max_log_entries", "20"]);
        match cli.command {
            Commands::Config {
                action: ConfigAction::Set { key, value },
            } => {
                assert_eq!(key, "dashboard.max_log_entries");
                assert_eq!(value, "20");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
