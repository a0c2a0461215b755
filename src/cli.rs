use clap::{ArgAction, Args, Parser, Subcommand};
use rummage_config::Overrides;
use rummage_extract::KeywordMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rummage",
    author,
    version,
    about = "Sort a directory tree by content and record every keyword match",
    long_about = None
)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short, global = true, env = "RUMMAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Less logging (-q warnings, -qq errors) and no progress spinner
    #[arg(long, short, global = true, action = ArgAction::Count, conflicts_with = "verbose")]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}
impl Cli {
    /// Log level chosen on the command line, if any.
    pub fn log_directive(&self) -> Option<&'static str> {
        match (self.verbose, self.quiet) {
            (0, 0) => None,
            (0, 1) => Some("warn"),
            (0, _) => Some("error"),
            (1, _) => Some("debug"),
            _ => Some("trace"),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract, match and sort every file under the scan root
    Scan(ScanArgs),
    /// Count the detected file types under a directory into stats.json
    Stats(Target),
    /// Move every file into grouped/<extension>/ under the output root
    Group(Target),
    /// Remove the empty directories left under a directory
    Cleanup(Target),
}

/// The directory to work on and where the output goes.
#[derive(Args, Debug, Default)]
pub struct Target {
    /// Directory to work on (overrides `scan_root`)
    pub root: Option<PathBuf>,

    /// Output directory (overrides `output_root`)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}
impl Target {
    pub fn overrides(&self) -> Overrides {
        Overrides { scan_root: self.root.clone(), output_root: self.output.clone(), ..Overrides::default() }
    }
}

#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    #[command(flatten)]
    pub target: Target,

    /// Newline-delimited keyword file
    #[arg(long, short)]
    pub keywords: Option<PathBuf>,

    /// Treat keywords as regular expressions
    #[arg(long)]
    pub regex: bool,

    /// Files handled at once
    #[arg(long, short = 'j')]
    pub concurrency: Option<usize>,

    /// Rows read from each spreadsheet sheet
    #[arg(long)]
    pub row_limit: Option<usize>,

    /// Keep empty directories in the scan root
    #[arg(long)]
    pub no_cleanup: bool,

    /// Expand archives sitting directly in the scan root first
    #[arg(long)]
    pub expand_first: bool,
}
impl ScanArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            keywords_file: self.keywords.clone(),
            keyword_mode: self.regex.then_some(KeywordMode::Regex),
            concurrency: self.concurrency,
            row_limit: self.row_limit,
            cleanup: self.no_cleanup.then_some(false),
            expand_first: self.expand_first.then_some(true),
            ..self.target.overrides()
        }
    }
}
