use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("invalid alert: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("market data unavailable: {0}")]
    DataUnavailable(String),

    #[error("monitor config error: {0}")]
    Config(String),
}

pub type AlertResult<T> = Result<T, AlertError>;
