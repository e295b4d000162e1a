//! CLI command definitions

use clap::{Parser, ValueEnum};
use ensemble_domain::{ConsensusMethod, OutputFormat, Strategy};
use std::path::PathBuf;

/// How responders are raced
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// First successful answer wins
    Fastest,
    /// Ask the primary, fall back in order on failure
    Primary,
    /// Ask everyone and vote
    Consensus,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Fastest => Strategy::Fastest,
            StrategyArg::Primary => Strategy::Primary,
            StrategyArg::Consensus => Strategy::Consensus,
        }
    }
}

/// How a consensus vote is counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    /// Largest group of agreeing answers
    Majority,
    /// Largest group at the configured similarity threshold
    Similarity,
    /// Heaviest group by responder weight
    Weighted,
}

impl From<MethodArg> for ConsensusMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Majority => ConsensusMethod::Majority,
            MethodArg::Similarity => ConsensusMethod::Similarity,
            MethodArg::Weighted => ConsensusMethod::Weighted,
        }
    }
}

/// Output format for ensemble results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    /// Only the winning answer
    Answer,
    /// Every response, the vote and the answer
    Full,
    /// JSON output
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Answer => OutputFormat::Answer,
            OutputFormatArg::Full => OutputFormat::Full,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// CLI arguments for ensemble-quorum
#[derive(Parser, Debug)]
#[command(name = "ensemble-quorum")]
#[command(author, version, about = "Ask redundant responders, get one answer")]
#[command(long_about = r#"
Ensemble Quorum sends one prompt to several responders and resolves a single
answer from them.

Strategies:
  fastest     The first successful answer wins, the rest are cancelled
  primary     Ask the primary responder, fall back in order on failure
  consensus   Ask everyone, group similar answers and vote

Responders are declared as [[responders]] in the configuration file.
Configuration files are loaded from (in priority order):
1. --config <path>       Explicit config file
2. ./ensemble.toml       Project-level config
3. ~/.config/ensemble-quorum/config.toml   Global config

Example:
  ensemble-quorum "What is the capital of France?"
  ensemble-quorum -s consensus -m weighted -o full "Is 2^31 - 1 prime?"
  echo "Summarize this" | ensemble-quorum -s fastest --stream
"#)]
pub struct Cli {
    /// The prompt to send (read from stdin when omitted)
    pub prompt: Option<String>,

    /// Dispatch strategy
    #[arg(short, long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Consensus method
    #[arg(short, long, value_enum)]
    pub method: Option<MethodArg>,

    /// Similarity threshold in (0, 1] for grouping answers
    #[arg(long, value_name = "FLOAT")]
    pub threshold: Option<f64>,

    /// Index of the primary responder
    #[arg(long, value_name = "INDEX")]
    pub primary: Option<usize>,

    /// Deadline for the whole call, in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Upper bound for a single responder, in milliseconds
    #[arg(long, value_name = "MS")]
    pub responder_timeout_ms: Option<u64>,

    /// System prompt passed to every responder
    #[arg(long, value_name = "TEXT")]
    pub system: Option<String>,

    /// Sampling temperature passed to every responder
    #[arg(long, value_name = "FLOAT")]
    pub temperature: Option<f32>,

    /// Token limit passed to every responder
    #[arg(long, value_name = "N")]
    pub max_tokens: Option<u32>,

    /// Print the answer as it streams in
    #[arg(long)]
    pub stream: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormatArg>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Print similarity cache statistics after the call
    #[arg(long)]
    pub stats: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from([
            "ensemble-quorum",
            "-s",
            "consensus",
            "-m",
            "weighted",
            "--threshold",
            "0.8",
            "--timeout-ms",
            "5000",
            "-o",
            "json",
            "--temperature",
            "0.2",
            "--max-tokens",
            "256",
            "-vv",
            "What is the capital of France?",
        ])
        .unwrap();

        assert_eq!(cli.prompt.as_deref(), Some("What is the capital of France?"));
        assert_eq!(cli.strategy.map(Strategy::from), Some(Strategy::Consensus));
        assert_eq!(cli.method.map(ConsensusMethod::from), Some(ConsensusMethod::Weighted));
        assert_eq!(cli.threshold, Some(0.8));
        assert_eq!(cli.timeout_ms, Some(5000));
        assert_eq!(cli.output.map(OutputFormat::from), Some(OutputFormat::Json));
        assert_eq!(cli.temperature, Some(0.2));
        assert_eq!(cli.max_tokens, Some(256));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_everything_is_optional() {
        let cli = Cli::try_parse_from(["ensemble-quorum"]).unwrap();
        assert!(cli.prompt.is_none());
        assert!(cli.strategy.is_none());
        assert!(cli.output.is_none());
        assert!(!cli.stream);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["ensemble-quorum", "-s", "quorum", "q"]).is_err());
    }
}
