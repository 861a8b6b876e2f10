use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = HarvestError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("The Riot API key was rejected.")]
    Authentication,
    #[error("Lookup of {what} failed: {message}")]
    RemoteLookup { what: String, message: String },
    #[error("File at {} has invalid format: {detail}", .path.display())]
    Schema { path: PathBuf, detail: String },
    #[error("Failed to save {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl HarvestError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn lookup(what: impl Into<String>, message: impl ToString) -> Self {
        Self::RemoteLookup {
            what: what.into(),
            message: message.to_string(),
        }
    }

    pub fn schema(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Errors after which a whole loader or crawler run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::Authentication | Self::Schema { .. }
        )
    }
}
