use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node is not connected to the document: {0}")]
    DetachedNode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTML parse failed: {0}")]
    HtmlParse(String),

    #[error("No action sink registered")]
    SinkUnavailable,

    #[error("Action sink closed: {0}")]
    SinkClosed(String),

    #[error("Reading file '{name}' failed: {source}")]
    FileRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Network request blocked: {0}")]
    NetworkBlocked(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Anyhow error: {0}")]
    Anyhow(String),
}

pub type Result<T> = std::result::Result<T, RecorderError>;

// Convert anyhow::Error to RecorderError
impl From<anyhow::Error> for RecorderError {
    fn from(err: anyhow::Error) -> Self {
        RecorderError::Anyhow(err.to_string())
    }
}

impl RecorderError {
    pub fn invalid_selector<E: std::fmt::Display>(selector: &str, err: E) -> Self {
        RecorderError::InvalidSelector(format!("{}: {}", selector, err))
    }
}
