use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser};

/// CLI options
#[derive(Parser, Debug, Default)]
#[command(
    name = "gitscribe",
    version,
    about = "LLM-assisted Git commit message generator (with a translated variant)"
)]
#[command(group(
    ArgGroup::new("context_group")
        .args(["context", "no_context"])
        .multiple(false)
))]
#[command(group(
    ArgGroup::new("issue_group")
        .args(["issue", "no_issue"])
        .multiple(false)
))]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Model name to use (e.g. claude-sonnet-4-20250514)
    #[arg(long)]
    pub model: Option<String>,

    /// API key (otherwise uses ANTHROPIC_API_KEY env var)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Comma-separated languages to generate, primary first (e.g. en,ja)
    #[arg(long = "lang", value_delimiter = ',')]
    pub languages: Option<Vec<String>>,

    /// Maximum tokens the model may generate per message
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Prompt style: structured (step-by-step, tagged) or direct
    #[arg(long)]
    pub style: Option<String>,

    /// A brief description of the change, skipping the interactive question
    #[arg(long)]
    pub context: Option<String>,

    /// Do not ask for a description of the change
    #[arg(long)]
    pub no_context: bool,

    /// Issue number to pull into the prompt (defaults to the number in the branch name)
    #[arg(long)]
    pub issue: Option<u64>,

    /// Do not look up an issue
    #[arg(long)]
    pub no_issue: bool,

    /// Amend the previous commit instead of creating a new one
    #[arg(long)]
    pub amend: bool,

    /// Accept the primary message without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Print the prompts and exit without calling the model
    #[arg(long)]
    pub dry_run: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
