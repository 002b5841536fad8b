use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Not enough history or fundamentals to score the ticker; callers skip it.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    pub fn insufficient(msg: impl Into<String>) -> Self {
        AnalysisError::InsufficientData(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        AnalysisError::InvalidConfig(msg.into())
    }

    /// True for the skip-this-ticker class of failures.
    pub fn is_skip(&self) -> bool {
        matches!(self, AnalysisError::InsufficientData(_))
    }
}
