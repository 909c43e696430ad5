use std::path::PathBuf;

use common::ErrorLocation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Log File Error: {path}: {source} {location}")]
    File {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Logger Init Error: {message} {location}")]
    Init {
        location: ErrorLocation,
        message: String,
    },
}
