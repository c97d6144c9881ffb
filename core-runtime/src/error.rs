//! Runtime errors raised while configuring the engine or its logging.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A tuning value is out of range.
    #[error("Invalid engine configuration: {0}")]
    Config(String),

    /// A required host bridge was not injected.
    #[error("Host bridge missing: {capability} ({message})")]
    CapabilityMissing { capability: String, message: String },

    /// The tracing subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
