use std::path::PathBuf;

use simple_error::SimpleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] SimpleError),

    #[error("policy error: {0}")]
    Policy(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(SimpleError::new(message.into()))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}
