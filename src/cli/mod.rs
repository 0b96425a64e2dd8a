//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "semrank",
    version,
    about = "Semantic term-expansion BM25 index and evaluation harness",
    long_about = "semrank builds a BM25 index over a pre-tokenized corpus, derives a semantic \
                  posting set from word-embedding neighbors, and compares the two rankings \
                  against graded relevance judgments."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/semrank/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tokenize a raw document directory into term-id files
    Prepare {
        /// Directory of raw .txt documents
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to write tokenized documents to
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Build the index: literal statistics, then semantic expansion
    Build {
        /// Drop all existing index contents first
        #[arg(long)]
        fresh: bool,

        /// Skip the semantic expansion pass
        #[arg(long)]
        literal_only: bool,

        /// Profile to apply (overrides expansion/ranking parameters)
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Rank documents for a single query
    Query {
        /// Query text
        query: String,

        /// Score against the semantic posting set instead of the literal one
        #[arg(long)]
        semantic: bool,

        /// Maximum number of results to return
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Evaluate both rankings against the judgment set
    Eval {
        /// Metric cutoff (defaults to evaluation.cutoff from config)
        #[arg(short = 'k', long)]
        cutoff: Option<usize>,

        /// Show the report in JSON format
        #[arg(long)]
        json: bool,

        /// Profile to apply (overrides expansion/ranking parameters)
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Show index statistics
    Stats,

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

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
