//! CLI argument parsing using clap.

use std::path::PathBuf;

use adpack_core::EncryptedPolicy;
use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "adpack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the central directory of an upload without extracting it
    Preview(PreviewArgs),
    /// Extract, classify and store the creatives of an upload
    Ingest(IngestArgs),
    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct PreviewArgs {
    /// Path to the ZIP upload
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// List every entry
    #[arg(short, long)]
    pub long: bool,

    /// Per-entry expansion ratio flagged as suspicious
    #[arg(long, default_value = "50", value_parser = parse_ratio)]
    pub entry_ratio: f64,

    /// Whole-archive expansion ratio flagged as suspicious
    #[arg(long, default_value = "100", value_parser = parse_ratio)]
    pub overall_ratio: f64,
}

#[derive(clap::Args)]
pub struct IngestArgs {
    /// Path to the ZIP upload
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Directory creatives are written to (nothing is stored when omitted)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Upload id used as the storage key (random when omitted)
    #[arg(long)]
    pub upload_id: Option<String>,

    /// Maximum number of files processed across all nested archives
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Maximum cumulative decompressed size
    #[arg(long, value_parser = parse_byte_size)]
    pub max_total_size: Option<u64>,

    /// Maximum decompressed size of a single file
    #[arg(long, value_parser = parse_byte_size)]
    pub max_file_size: Option<u64>,

    /// Maximum nesting depth of ZIP archives
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Handling of encrypted entries
    #[arg(long, value_name = "POLICY", default_value = "skip")]
    pub encrypted: EncryptedPolicy,

    /// Password for encrypted entries (with --encrypted attempt)
    #[arg(long, env = "ADPACK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Process archives whose overall expansion looks like a zip bomb
    #[arg(long)]
    pub allow_suspicious: bool,

    /// Keep files whose content duplicates an earlier file
    #[arg(long)]
    pub no_dedup: bool,

    /// Largest asset embedded into HTML as a data URL
    #[arg(long, value_parser = parse_byte_size)]
    pub max_inline_size: Option<u64>,

    /// Preferred entry file names for HTML creatives (can be repeated)
    #[arg(long = "entry", value_name = "FILENAME")]
    pub entry_preferences: Vec<String>,

    /// Print the defanged HTML of each creative
    #[arg(long)]
    pub show_html: bool,
}

fn parse_ratio(s: &str) -> Result<f64, String> {
    let ratio: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid ratio: {s}"))?;
    if ratio.is_finite() && ratio >= 1.0 {
        Ok(ratio)
    } else {
        Err(format!("ratio must be at least 1: {s}"))
    }
}

/// Parse byte size with optional suffix (K, M, G, T)
#[allow(clippy::option_if_let_else)]
fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty byte size".to_string());
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('T') {
        (stripped, 1024_u64.pow(4))
    } else if let Some(stripped) = s.strip_suffix('G') {
        (stripped, 1024_u64.pow(3))
    } else if let Some(stripped) = s.strip_suffix('M') {
        (stripped, 1024_u64.pow(2))
    } else if let Some(stripped) = s.strip_suffix('K') {
        (stripped, 1024)
    } else {
        (s, 1)
    };

    num_str
        .parse::<u64>()
        .map_err(|_| format!("invalid byte size: {s}"))
        .and_then(|n| {
            n.checked_mul(multiplier)
                .ok_or_else(|| format!("byte size overflow: {s}"))
        })
}
