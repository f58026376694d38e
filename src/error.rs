use thiserror::Error;

pub type Result<T> = std::result::Result<T, InsightError>;

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl InsightError {
    /// True for the two kinds a caller may collapse into "generation failed".
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, InsightError::Transport(_) | InsightError::Validation(_))
    }
}

impl From<reqwest::Error> for InsightError {
    fn from(err: reqwest::Error) -> Self {
        InsightError::Transport(err.to_string())
    }
}
