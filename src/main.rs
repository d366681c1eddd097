mod cli_args;
mod config;
mod diff;
mod error;
mod git;
mod llm;
mod logging;
mod message;
mod quality;
mod tracker;
mod ui;
mod workflow;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use crate::cli_args::Cli;
use crate::config::Config;
use crate::error::AppError;
use crate::git::GitCli;
use crate::llm::anthropic::AnthropicClient;
use crate::tracker::{GitHubClient, IssueTracker};
use crate::tracker::credentials::{default_sources, resolve_token};
use crate::ui::TerminalPrompter;
use crate::workflow::{RunOptions, RunOutcome, Session};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(outcome) => {
            match outcome {
                RunOutcome::Cancelled => println!("cancelled by user"),
                RunOutcome::DryRun => log::info!("Dry run finished, nothing sent to the model"),
                other => log::debug!("Run finished: {other:?}"),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            let kind = err
                .downcast_ref::<AppError>()
                .map(AppError::kind)
                .unwrap_or("internal");
            log::error!("Run failed: {err:#}");
            log::debug!("{err:?}");
            eprintln!("{} {err:#}", format!("error[{kind}]:").red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunOutcome> {
    // No side effects before the configuration is known to be complete.
    let config = Config::from_sources(&cli)?;
    logging::init_logger(cli.verbose, config.log_file.as_deref())
        .context("setting up logging")?;
    log::debug!(
        "Model {}, primary language {}, languages {:?}, style {:?}",
        config.model,
        config.primary_language(),
        config.languages,
        config.style
    );

    let llm = AnthropicClient::new(
        config.anthropic_api_key.clone(),
        config.model.clone(),
        config.max_tokens,
        config.anthropic_base_url.clone(),
        config.timeout,
    )
    .map_err(AppError::from)?;

    let options = RunOptions::from_cli(&cli);
    let github = if cli.no_issue {
        None
    } else {
        issue_tracker(&config)
    };

    let vcs = GitCli::new();
    let prompter = TerminalPrompter;
    let session = Session {
        vcs: &vcs,
        prompter: &prompter,
        llm: Arc::new(llm),
        tracker: github.as_ref().map(|c| c as &dyn IssueTracker),
        languages: config.languages.clone(),
        style: config.style,
        options,
    };

    Ok(session.run().await?)
}

/// GitHub client for issue context, or `None` when no usable token exists.
fn issue_tracker(config: &Config) -> Option<GitHubClient> {
    let token = match resolve_token(&default_sources(&config.github_host)) {
        Ok(token) => token,
        Err(e) => {
            log::info!("Issue context disabled: {e}");
            return None;
        }
    };

    match GitHubClient::new(token, config.github_api_url.clone(), config.timeout) {
        Ok(client) => Some(client),
        Err(e) => {
            log::warn!("Issue context disabled: {e}");
            None
        }
    }
}
