//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run one command in many directories in parallel with a live status block
#[derive(Parser, Debug)]
#[command(name = "parallax")]
#[command(version, about = "Parallel per-directory command runner", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directories to run the command in
    pub dirs: Vec<PathBuf>,

    /// Command and arguments, after `--`
    #[arg(last = true)]
    pub run: Vec<String>,

    /// Maximum number of commands running at once
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Tag shown in brackets before every row
    #[arg(short, long)]
    pub label: Option<String>,

    /// Noun used in outcome lines
    #[arg(long, default_value = "Run")]
    pub title: String,

    /// Verb used while running
    #[arg(long, default_value = "Running")]
    pub progressive: String,

    /// Output text that means "nothing to do"
    #[arg(long, value_name = "TEXT")]
    pub unchanged_if: Option<String>,

    /// Show each command's latest output line beneath its row
    #[arg(long)]
    pub show_output: bool,

    /// Leave keyboard echo enabled while running
    #[arg(long)]
    pub no_input_lock: bool,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["parallax"]);
        assert!(args.command.is_none());
        assert!(args.dirs.is_empty());
        assert!(args.run.is_empty());
        assert!(args.parallel.is_none());
        assert!(args.label.is_none());
        assert_eq!(args.title, "Run");
        assert_eq!(args.progressive, "Running");
        assert!(!args.show_output);
        assert!(!args.no_input_lock);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_dirs_and_command() {
        let args = Args::parse_from(["parallax", "a", "b", "--", "git", "pull", "--ff-only"]);
        assert_eq!(args.dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(args.run, vec!["git", "pull", "--ff-only"]);
    }

    #[test]
    fn test_args_options() {
        let args = Args::parse_from([
            "parallax",
            "-p",
            "8",
            "--label",
            "spm",
            "--title",
            "Pull",
            "--progressive",
            "Pulling",
            "--unchanged-if",
            "Already up to date.",
            "x",
            "--",
            "git",
            "pull",
        ]);
        assert_eq!(args.parallel, Some(8));
        assert_eq!(args.label.as_deref(), Some("spm"));
        assert_eq!(args.title, "Pull");
        assert_eq!(args.progressive, "Pulling");
        assert_eq!(args.unchanged_if.as_deref(), Some("Already up to date."));
    }

    #[test]
    fn test_args_config_subcommand() {
        let args = Args::parse_from(["parallax", "config", "show"]);
        assert!(matches!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));
    }
}
