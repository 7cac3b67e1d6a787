use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Identity errors
    #[error("Invalid box ID: {0}")]
    InvalidBoxId(i64),

    #[error("Invalid device ID: {0}")]
    InvalidDeviceId(String),

    // Input validation errors
    #[error("Invalid PIN code: {reason}")]
    InvalidPinCode { reason: String },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidConfigValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
