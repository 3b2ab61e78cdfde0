// =============================================================================
// Errors
// =============================================================================

pub type ForestResult<T> = Result<T, ForestError>;

#[derive(thiserror::Error, Debug)]
pub enum ForestError {
    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("ingestion error: {0}")]
    Ingest(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("executor not ready: {0}")]
    NotReady(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("session error: {0}")]
    Session(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ForestError {
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn ingest(msg: impl Into<String>) -> Self {
        Self::Ingest(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(ForestError::empty_input("x").to_string().starts_with("empty input:"));
        assert!(ForestError::config("x").to_string().starts_with("configuration error:"));
        assert!(ForestError::execution("x").to_string().starts_with("execution error:"));
        assert!(ForestError::not_ready("x").to_string().starts_with("executor not ready:"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("disk gone");
        let err = ForestError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("disk gone"));
    }
}
