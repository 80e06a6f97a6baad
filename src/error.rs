use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodepadError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    // Dispatch errors
    #[error("unsupported language: {language}")]
    UnsupportedLanguage { language: String },

    #[error("no code to execute")]
    EmptySource,

    // Runtime errors
    #[error("runtime not ready")]
    RuntimeNotReady,

    #[error("runtime failed to load: {0}")]
    RuntimeUnavailable(String),

    #[error("{0}")]
    Evaluation(String),

    #[error("execution timed out after {millis} ms")]
    Timeout { millis: u64 },

    // Isolated context errors
    #[error("failed to start worker '{program}': {reason}")]
    WorkerStart { program: String, reason: String },

    #[error("Worker protocol error: {0}")]
    WorkerProtocol(String),

    #[error("isolated context terminated")]
    ContextTerminated,

    // Remote service errors
    #[error("Transport error: {0}")]
    Transport(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

}

impl CodepadError {
    /// Whether the failure happened before the remote service produced a result.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, CodepadError>;
