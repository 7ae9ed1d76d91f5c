use crate::protocol::TabId;

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("Navigation failed: {0}")]
    Navigation(String),
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
    #[error("Tab {0} not found")]
    TabNotFound(TabId),
    #[error("Timeout")]
    Timeout,
    #[error("Not ready")]
    NotReady,
    #[error("Not supported: {0}")]
    NotSupported(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Other: {0}")]
    Other(String),
}
