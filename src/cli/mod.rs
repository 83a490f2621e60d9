//! CLI entry point for decanter.

pub mod auth;
pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Autolab from the command line
#[derive(Parser, Debug)]
#[command(name = "decanter", version, about = "Autolab command-line client")]
pub struct Cli {
    /// Log every request and failed response
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authorize this device (only needed once)
    Setup(SetupArgs),
    /// Show whether a credential is stored
    Status,
    /// Remove the stored credential
    Logout,
    /// Submit a file to an assessment
    Submit(SubmitArgs),
    /// List courses, assessments, submissions or account details
    List(ListArgs),
}

/// Arguments for `decanter setup`.
#[derive(Parser, Debug)]
pub struct SetupArgs {
    /// Replace an existing credential
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `decanter submit`.
#[derive(Parser, Debug)]
pub struct SubmitArgs {
    /// Course id (see `decanter list courses`)
    #[arg(short, long)]
    pub course: String,

    /// Assessment id (see `decanter list assessments`)
    #[arg(short, long)]
    pub assessment: String,

    /// File to upload
    #[arg(short, long)]
    pub file: PathBuf,

    /// Wait for grading and show the scores
    #[arg(short, long)]
    pub wait: bool,
}

/// What `decanter list` shows.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListTarget {
    Courses,
    #[value(alias = "ass")]
    Assessments,
    #[value(alias = "subs")]
    Submissions,
    Me,
}

/// Arguments for `decanter list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    pub target: ListTarget,

    /// Course id (required for submissions)
    #[arg(short, long)]
    pub course: Option<String>,

    /// Assessment id (required for submissions)
    #[arg(short, long)]
    pub assessment: Option<String>,

    /// Only show courses from this semester (e.g. s24)
    #[arg(short, long)]
    pub semester: Option<String>,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_setup_defaults() {
        let cli = Cli::try_parse_from(["decanter", "setup"]).unwrap();
        assert!(!cli.verbose);
        match cli.command {
            Commands::Setup(args) => assert!(!args.force),
            other => panic!("expected Setup, got {other:?}"),
        }
    }

    #[test]
    fn parse_submit_with_wait() {
        let cli = Cli::try_parse_from([
            "decanter", "submit", "-c", "cse220-s24", "-a", "pa1", "-f", "hw.zip", "--wait",
        ])
        .unwrap();
        match cli.command {
            Commands::Submit(args) => {
                assert_eq!(args.course, "cse220-s24");
                assert_eq!(args.assessment, "pa1");
                assert_eq!(args.file, PathBuf::from("hw.zip"));
                assert!(args.wait);
            }
            other => panic!("expected Submit, got {other:?}"),
        }
    }

    #[test]
    fn parse_submit_requires_file() {
        assert!(Cli::try_parse_from(["decanter", "submit", "-c", "c", "-a", "a"]).is_err());
    }

    #[test]
    fn parse_list_aliases() {
        let cli = Cli::try_parse_from(["decanter", "list", "subs", "-c", "c", "-a", "a"]).unwrap();
        match cli.command {
            Commands::List(args) => {
                assert_eq!(args.target, ListTarget::Submissions);
                assert_eq!(args.course.as_deref(), Some("c"));
            }
            other => panic!("expected List, got {other:?}"),
        }
        let cli = Cli::try_parse_from(["decanter", "list", "ass", "--semester", "s24"]).unwrap();
        match cli.command {
            Commands::List(args) => {
                assert_eq!(args.target, ListTarget::Assessments);
                assert_eq!(args.semester.as_deref(), Some("s24"));
            }
            other => panic!("expected List, got {other:?}"),
        }
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["decanter", "list", "me", "-v"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_unknown_list_target_fails() {
        assert!(Cli::try_parse_from(["decanter", "list", "grades"]).is_err());
    }
}
