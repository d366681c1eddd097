use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::IssueTrackerError;

/// What a credential source can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// A bearer token usable against the tracker's HTTP API.
    Token(String),
    /// An SSH identity. Informational only: it cannot authenticate HTTP calls.
    SshIdentity(PathBuf),
}

/// One strategy for finding an issue tracker credential.
pub trait CredentialSource {
    fn name(&self) -> &'static str;
    fn discover(&self) -> Result<Credential, IssueTrackerError>;
}

/// Looks for a default SSH key under `~/.ssh`.
pub struct SshKeySource {
    ssh_dir: Option<PathBuf>,
}

impl SshKeySource {
    pub fn new(ssh_dir: Option<PathBuf>) -> Self {
        Self { ssh_dir }
    }
}

impl CredentialSource for SshKeySource {
    fn name(&self) -> &'static str {
        "ssh-key"
    }

    fn discover(&self) -> Result<Credential, IssueTrackerError> {
        let dir = self.ssh_dir.as_ref().ok_or(IssueTrackerError::NoCredential)?;
        ["id_ed25519", "id_ecdsa", "id_rsa"]
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
            .map(Credential::SshIdentity)
            .ok_or(IssueTrackerError::NoCredential)
    }
}

#[derive(Debug, Deserialize)]
struct GhHost {
    oauth_token: Option<String>,
}

/// Reads the token the `gh` CLI stores in `hosts.yml`.
pub struct GhCliConfigSource {
    hosts_file: Option<PathBuf>,
    host: String,
}

impl GhCliConfigSource {
    pub fn new(hosts_file: Option<PathBuf>, host: impl Into<String>) -> Self {
        Self {
            hosts_file,
            host: host.into(),
        }
    }

    /// `~/.config/gh/hosts.yml`
    pub fn default_hosts_file() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".config").join("gh").join("hosts.yml"))
    }
}

impl CredentialSource for GhCliConfigSource {
    fn name(&self) -> &'static str {
        "gh-cli-config"
    }

    fn discover(&self) -> Result<Credential, IssueTrackerError> {
        let path = self.hosts_file.as_ref().ok_or(IssueTrackerError::NoCredential)?;
        if !path.exists() {
            return Err(IssueTrackerError::NoCredential);
        }

        let data = fs::read_to_string(path).map_err(|e| IssueTrackerError::InvalidCredential {
            source_name: self.name().to_string(),
            reason: e.to_string(),
        })?;
        let hosts: BTreeMap<String, GhHost> =
            serde_yaml::from_str(&data).map_err(|e| IssueTrackerError::InvalidCredential {
                source_name: self.name().to_string(),
                reason: e.to_string(),
            })?;

        hosts
            .get(&self.host)
            .and_then(|h| h.oauth_token.clone())
            .filter(|t| !t.trim().is_empty())
            .map(|t| Credential::Token(t.trim().to_string()))
            .ok_or(IssueTrackerError::NoCredential)
    }
}

/// Reads a token from the first set environment variable.
pub struct EnvTokenSource {
    vars: Vec<&'static str>,
}

impl EnvTokenSource {
    pub fn new(vars: Vec<&'static str>) -> Self {
        Self { vars }
    }
}

impl Default for EnvTokenSource {
    fn default() -> Self {
        Self::new(vec!["GITHUB_TOKEN", "GH_TOKEN"])
    }
}

impl CredentialSource for EnvTokenSource {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn discover(&self) -> Result<Credential, IssueTrackerError> {
        self.vars
            .iter()
            .filter_map(|v| env::var(v).ok())
            .map(|t| t.trim().to_string())
            .find(|t| !t.is_empty())
            .map(Credential::Token)
            .ok_or(IssueTrackerError::NoCredential)
    }
}

/// The default discovery order: SSH key, `gh` config, environment.
pub fn default_sources(host: &str) -> Vec<Box<dyn CredentialSource>> {
    let ssh_dir = dirs::home_dir().map(|h| h.join(".ssh"));
    vec![
        Box::new(SshKeySource::new(ssh_dir)),
        Box::new(GhCliConfigSource::new(
            GhCliConfigSource::default_hosts_file(),
            host,
        )),
        Box::new(EnvTokenSource::default()),
    ]
}

/// Try each source in order and return the first usable token.
pub fn resolve_token(sources: &[Box<dyn CredentialSource>]) -> Result<String, IssueTrackerError> {
    for source in sources {
        match source.discover() {
            Ok(Credential::Token(token)) => {
                log::debug!("Issue tracker token found via {}", source.name());
                return Ok(token);
            }
            Ok(Credential::SshIdentity(path)) => {
                log::info!(
                    "SSH identity {} found, but it cannot authenticate the issue tracker API",
                    path.display()
                );
            }
            Err(IssueTrackerError::NoCredential) => {
                log::trace!("No credential from {}", source.name());
            }
            Err(e) => log::warn!("{e}"),
        }
    }
    Err(IssueTrackerError::NoCredential)
}
