use thiserror::Error;

/// Failures of a single generation request.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The endpoint answered with a non-success HTTP status.
    #[error("model API rejected the request: HTTP {status} - {body}")]
    Rejected { status: u16, body: String },
    /// The request never produced a response (connect, timeout, decode).
    #[error("failed to reach the model API: {0}")]
    Transport(String),
    /// The completion was not plain text (refusal, tool call, empty content).
    #[error("model returned an unexpected response: {0}")]
    UnexpectedResponse(String),
    /// A spawned generation task panicked or was cancelled.
    #[error("generation task for {variant} did not finish: {reason}")]
    Task { variant: String, reason: String },
}

/// Failures while talking to the issue tracker. Never fatal for a run.
#[derive(Debug, Error)]
pub enum IssueTrackerError {
    #[error("no issue tracker credential found")]
    NoCredential,
    #[error("credential source {source_name} is unusable: {reason}")]
    InvalidCredential { source_name: String, reason: String },
    #[error("issue tracker request failed: {0}")]
    Request(String),
    #[error("issue tracker answered HTTP {status} for {url}")]
    Status { status: u16, url: String },
}

/// Top-level error taxonomy of a run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Vcs(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    IssueTracker(#[from] IssueTrackerError),
    #[error("failed to read input: {0}")]
    UserInput(String),
    #[error("{0}")]
    Configuration(String),
}

impl AppError {
    /// Short label shown in front of user-facing error lines.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Vcs(_) => "git",
            AppError::Generation(_) => "generation",
            AppError::IssueTracker(_) => "issue-tracker",
            AppError::UserInput(_) => "input",
            AppError::Configuration(_) => "config",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_match_variants() {
        assert_eq!(AppError::Vcs("boom".into()).kind(), "git");
        assert_eq!(
            AppError::from(GenerationError::Transport("timeout".into())).kind(),
            "generation"
        );
        assert_eq!(AppError::Configuration("x".into()).kind(), "config");
    }

    #[test]
    fn rejected_error_mentions_status() {
        let err = GenerationError::Rejected {
            status: 401,
            body: "invalid x-api-key".into(),
        };
        assert!(err.to_string().contains("HTTP 401"));
    }
}
