use crate::cli_args::Cli;
use crate::error::{AppError, AppResult};
use crate::llm::prompt_builder::PromptStyle;
use crate::llm::prompts::PromptVariant;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 90;
const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_GITHUB_HOST: &str = "github.com";

/// Final resolved configuration for gitscribe.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub model: String,
    pub max_tokens: u32,
    /// Primary language first; never empty, no duplicates.
    pub languages: Vec<PromptVariant>,
    pub style: PromptStyle,
    pub timeout: Duration,
    pub anthropic_base_url: String,
    pub github_api_url: String,
    pub github_host: String,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Build the final config from CLI flags, environment, TOML file, and defaults.
    ///
    /// Precedence:
    ///   1. CLI flags (`--model`, `--lang`, ...)
    ///   2. Env vars `GITSCRIBE_MODEL`, `GITSCRIBE_LANGUAGES`, `ANTHROPIC_API_KEY`
    ///   3. TOML `~/.config/gitscribe.toml`
    ///   4. Hardcoded defaults
    pub fn from_sources(cli: &Cli) -> AppResult<Self> {
        let file_cfg = load_file_config()?;
        Self::resolve(cli, file_cfg, |key| env::var(key).ok())
    }

    fn resolve<F>(cli: &Cli, file_cfg: FileConfig, env_var: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model = cli
            .model
            .clone()
            .or_else(|| env_var("GITSCRIBE_MODEL"))
            .or(file_cfg.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let anthropic_api_key = cli
            .api_key
            .clone()
            .or_else(|| env_var("ANTHROPIC_API_KEY"))
            .or(file_cfg.anthropic_api_key)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::Configuration(
                    "ANTHROPIC_API_KEY must be set via env var, --api-key, or the config file"
                        .to_string(),
                )
            })?;

        let language_codes: Vec<String> = cli
            .languages
            .clone()
            .or_else(|| {
                env_var("GITSCRIBE_LANGUAGES")
                    .map(|v| v.split(',').map(str::to_string).collect())
            })
            .or(file_cfg.languages)
            .unwrap_or_else(|| vec!["en".to_string(), "ja".to_string()]);
        let languages = parse_languages(&language_codes)?;

        let style = match cli.style.clone().or(file_cfg.style) {
            Some(s) => s.parse::<PromptStyle>().map_err(AppError::Configuration)?,
            None => PromptStyle::default(),
        };

        let max_tokens = cli
            .max_tokens
            .or(file_cfg.max_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(AppError::Configuration("max_tokens must be positive".into()));
        }

        let timeout_secs = cli
            .timeout
            .or(file_cfg.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Config {
            anthropic_api_key,
            model,
            max_tokens,
            languages,
            style,
            timeout: Duration::from_secs(timeout_secs),
            anthropic_base_url: file_cfg
                .anthropic_base_url
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_URL.to_string()),
            github_api_url: file_cfg
                .github_api_url
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            github_host: file_cfg
                .github_host
                .unwrap_or_else(|| DEFAULT_GITHUB_HOST.to_string()),
            log_file: cli.log_file.clone().or(file_cfg.log_file),
        })
    }

    pub fn primary_language(&self) -> PromptVariant {
        self.languages[0]
    }
}

fn parse_languages(codes: &[String]) -> AppResult<Vec<PromptVariant>> {
    let mut languages = Vec::new();
    for code in codes.iter().filter(|c| !c.trim().is_empty()) {
        let variant = code
            .parse::<PromptVariant>()
            .map_err(AppError::Configuration)?;
        if !languages.contains(&variant) {
            languages.push(variant);
        }
    }
    if languages.is_empty() {
        return Err(AppError::Configuration(
            "at least one language must be configured".into(),
        ));
    }
    Ok(languages)
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    pub model: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub languages: Option<Vec<String>>,
    pub style: Option<String>,
    pub timeout_secs: Option<u64>,
    pub anthropic_base_url: Option<String>,
    pub github_api_url: Option<String>,
    pub github_host: Option<String>,
    pub log_file: Option<PathBuf>,
}

/// Return `~/.config/gitscribe.toml`
fn config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".config").join("gitscribe.toml"))
}

/// A missing file is an empty config; a malformed one is an error.
fn load_file_config() -> AppResult<FileConfig> {
    let Some(path) = config_path() else {
        return Ok(FileConfig::default());
    };
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let data = fs::read_to_string(&path)
        .map_err(|e| AppError::Configuration(format!("reading {}: {e}", path.display())))?;
    toml::from_str::<FileConfig>(&data)
        .map_err(|e| AppError::Configuration(format!("parsing {}: {e}", path.display())))
}
