use clap::Parser;
use std::path::PathBuf;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What to do when the extraction directory already exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionPolicy {
    /// Create the directory if missing, reuse it if present (never cleaned up).
    Reuse,
    /// Refuse to run if the directory already exists.
    Fail,
    /// Extract into a process-unique temporary directory removed on exit.
    Temp,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollisionPolicy::Reuse => write!(f, "reuse"),
            CollisionPolicy::Fail => write!(f, "fail"),
            CollisionPolicy::Temp => write!(f, "temp"),
        }
    }
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reuse" => Ok(CollisionPolicy::Reuse),
            "fail" => Ok(CollisionPolicy::Fail),
            "temp" => Ok(CollisionPolicy::Temp),
            _ => Err(format!("Invalid collision policy: {}", s)),
        }
    }
}

/// How findings longer than the preview length are expanded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpandMode {
    /// Ask the operator per finding (interactive prompt).
    Ask,
    /// Always print the full text after the preview.
    Always,
    /// Never print more than the preview.
    Never,
}

impl std::fmt::Display for ExpandMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpandMode::Ask => write!(f, "ask"),
            ExpandMode::Always => write!(f, "always"),
            ExpandMode::Never => write!(f, "never"),
        }
    }
}

impl std::str::FromStr for ExpandMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ask" => Ok(ExpandMode::Ask),
            "always" => Ok(ExpandMode::Always),
            "never" => Ok(ExpandMode::Never),
            _ => Err(format!("Invalid expand mode: {}", s)),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "apkgscan",
    version = VERSION,
    about = "Scan .apkg files for anomalies",
    long_about = "apkgscan unpacks an Anki deck archive, locates the embedded SQLite \
                  database and pattern-matches its text fields against a list of \
                  suspicious-content signatures before the deck is imported."
)]
pub struct Args {
    /// Path to the .apkg file to scan
    #[arg(value_name = "APKG_FILE")]
    pub apkg_file: PathBuf,

    /// Preview length for matched content before prompting to expand (default: 300)
    #[arg(short = 'p', long, default_value = "300")]
    pub preview_length: usize,

    /// Scan all tables in the database (default: only scan triggers and notes)
    #[arg(short = 'a', long)]
    pub all_tables: bool,

    /// Directory the archive is extracted into
    #[arg(long, value_name = "DIR", default_value = "extracted_apkg")]
    pub extract_dir: PathBuf,

    /// Collision policy for the extraction directory: 'reuse', 'fail' or 'temp'
    #[arg(long, value_name = "POLICY", default_value = "reuse")]
    pub on_collision: CollisionPolicy,

    /// YAML file with an ordered list of signatures (pattern, label); built-in list if omitted
    #[arg(short = 's', long, value_name = "FILE")]
    pub signatures: Option<PathBuf>,

    /// Expansion of findings longer than the preview: 'ask', 'always' or 'never'
    #[arg(long, value_name = "MODE", default_value = "ask")]
    pub expand: ExpandMode,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
