use thiserror::Error;

#[derive(Error, Debug)]
pub enum PilotError {
    #[error("Intent oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Sheet engine not ready: {0}")]
    EngineUnavailable(String),

    #[error("Invalid command parameters: {0}")]
    Validation(String),

    #[error("Spreadsheet operation failed: {0}")]
    Execution(String),

    #[error("Analytics backend error: {0}")]
    Backend(String),

    #[error("Unable to process action '{action}' for intent '{intent}'")]
    UnhandledIntent { intent: String, action: String },

    #[error("A command is already being processed")]
    Busy,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PilotError>;
