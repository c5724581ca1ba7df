//! CLI - Command Line Interface for StreamVerse
//!
//! Every TUI action is scriptable. All output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Open a session, then browse
//! streamverse unlock 220325
//! streamverse lists --key romance --limit 5
//! streamverse search "before sunrise" --json
//!
//! # Resolve and play
//! streamverse resolve 76
//! streamverse play tt0112471 --backend vidsrc
//! ```

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::Backend;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Session is locked or the PIN was wrong
    Locked = 4,
    /// Movie has no playable identifier
    NotFound = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// StreamVerse - terminal movie discovery
///
/// Run without arguments to launch interactive TUI.
/// Use subcommands for scriptable automation.
#[derive(Parser, Debug)]
#[command(
    name = "streamverse",
    version,
    about = "Terminal movie discovery with curated lists and embed playback",
    long_about = "Browse curated movie lists, search the catalog, and open a \
                  movie on an embed player backend.\n\n\
                  Run without arguments to launch the interactive TUI.\n\
                  Use subcommands for automation and scripting.",
    after_help = "EXAMPLES:\n\
                  streamverse                         Launch interactive TUI\n\
                  streamverse unlock 123456           Open a session\n\
                  streamverse search \"heat\"           Search for movies\n\
                  streamverse play tt0113277 -b 2embed  Play on a backend"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run (omit for TUI mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Check if running in CLI mode (has subcommand)
    pub fn is_cli_mode(&self) -> bool {
        self.command.is_some()
    }

    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Unlock the session with the shared PIN
    #[command(visible_alias = "u")]
    Unlock(UnlockCmd),

    /// End the current session
    Lock,

    /// Fetch the curated home lists
    #[command(visible_alias = "ls")]
    Lists(ListsCmd),

    /// Search for movies
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Resolve a catalog id to its IMDb id
    #[command(visible_alias = "r")]
    Resolve(ResolveCmd),

    /// Build the player URL for a movie and open it
    #[command(visible_alias = "p")]
    Play(PlayCmd),

    /// Show or set the playback backend
    #[command(visible_alias = "b")]
    Backend(BackendCmd),

    /// Show or clear recently played movies
    #[command(visible_alias = "h")]
    History(HistoryCmd),
}

impl Command {
    /// Commands that only run inside an unlocked session
    pub fn requires_session(&self) -> bool {
        matches!(
            self,
            Command::Lists(_) | Command::Search(_) | Command::Resolve(_) | Command::Play(_)
        )
    }
}

/// Unlock with the shared PIN
#[derive(Args, Debug)]
pub struct UnlockCmd {
    /// Six-character PIN
    #[arg(required = true)]
    pub pin: String,
}

/// Fetch the curated lists
#[derive(Args, Debug)]
pub struct ListsCmd {
    /// Only print the list with this key
    #[arg(long, short = 'k')]
    pub key: Option<String>,

    /// Maximum movies per list
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

/// Search the catalog by title
#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Search query (title, keywords)
    #[arg(required = true)]
    pub query: String,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "10")]
    pub limit: usize,
}

/// Resolve a catalog id
#[derive(Args, Debug)]
pub struct ResolveCmd {
    /// TMDB movie id
    #[arg(required = true)]
    pub tmdb_id: u64,
}

/// Play a movie
#[derive(Args, Debug)]
pub struct PlayCmd {
    /// IMDb id (tt1234567) or TMDB movie id
    #[arg(required = true)]
    pub id: String,

    /// Backend to play on (defaults to the saved choice)
    #[arg(long, short = 'b', value_parser = parse_backend)]
    pub backend: Option<Backend>,

    /// Print the URL without opening a browser
    #[arg(long)]
    pub no_open: bool,
}

impl PlayCmd {
    /// Target of the play command
    pub fn target(&self) -> PlayTarget {
        let id = self.id.trim();
        if let Ok(tmdb_id) = id.parse::<u64>() {
            PlayTarget::Catalog(tmdb_id)
        } else {
            PlayTarget::External(id.to_string())
        }
    }
}

/// What a play command refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayTarget {
    /// Catalog id that still needs resolving
    Catalog(u64),
    /// IMDb id used as given
    External(String),
}

/// Show or set the backend
#[derive(Args, Debug)]
pub struct BackendCmd {
    /// New backend (vidfast, vidsrc, 2embed)
    #[arg(value_parser = parse_backend)]
    pub backend: Option<Backend>,
}

/// Show or clear history
#[derive(Args, Debug)]
pub struct HistoryCmd {
    /// Forget all recent selections
    #[arg(long)]
    pub clear: bool,
}

fn parse_backend(s: &str) -> Result<Backend, String> {
    s.parse()
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Session status response
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStatus {
    pub unlocked: bool,
}

/// Resolved movie response
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub tmdb_id: u64,
    pub title: String,
    pub imdb_id: String,
}

/// Play response
#[derive(Debug, Serialize, Deserialize)]
pub struct PlayResponse {
    pub imdb_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub backend: Backend,
    pub url: String,
    pub opened: bool,
}

/// Backend response
#[derive(Debug, Serialize, Deserialize)]
pub struct BackendResponse {
    pub backend: Backend,
    pub name: String,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_args_is_tui_mode() {
        let cli = Cli::parse_from::<_, &str>([]);
        assert!(!cli.is_cli_mode());
    }

    #[test]
    fn test_play_target() {
        let cmd = PlayCmd {
            id: "76".to_string(),
            backend: None,
            no_open: false,
        };
        assert_eq!(cmd.target(), PlayTarget::Catalog(76));

        let cmd = PlayCmd {
            id: "tt0112471".to_string(),
            backend: None,
            no_open: false,
        };
        assert_eq!(cmd.target(), PlayTarget::External("tt0112471".to_string()));
    }

    #[test]
    fn test_requires_session() {
        let cli = Cli::parse_from(["streamverse", "search", "heat"]);
        assert!(cli.command.as_ref().is_some_and(Command::requires_session));

        let cli = Cli::parse_from(["streamverse", "unlock", "123456"]);
        assert!(!cli.command.as_ref().is_some_and(Command::requires_session));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::Error), 1);
        assert_eq!(i32::from(ExitCode::InvalidArgs), 2);
        assert_eq!(i32::from(ExitCode::NetworkError), 3);
        assert_eq!(i32::from(ExitCode::Locked), 4);
        assert_eq!(i32::from(ExitCode::NotFound), 5);
    }
}
