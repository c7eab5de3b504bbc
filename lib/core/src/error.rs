use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No valid schools found: {0:?}")]
    SchoolsNotFound(Vec<String>),

    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Invalid value for '{attribute}' in school '{school}': {reason}")]
    InvalidValue {
        school: String,
        attribute: String,
        reason: String,
    },

    #[error("Record table is empty")]
    EmptyTable,

    #[error("School data not loaded")]
    NoData,

    #[error("Model not ready")]
    NotReady,

    #[error("Invalid feature dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Training failed: {0}")]
    Training(#[source] Box<Error>),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Retrain did not finish within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Background worker stopped")]
    WorkerStopped,
}

impl Error {
    /// Wrap a failure raised while building a model.
    ///
    /// Already-wrapped errors are returned unchanged.
    pub fn training(cause: Error) -> Self {
        match cause {
            Error::Training(_) => cause,
            other => Error::Training(Box::new(other)),
        }
    }

    /// True for errors caused by the caller's arguments rather than engine state.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::SchoolsNotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
