use std::path::PathBuf;

use thiserror::Error;

/// Failures of a single HTTP exchange with GIS Cloud.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("map creation response carried no Location header")]
    MissingLocation,
    #[error("unable to read a map id from Location header '{0}'")]
    MalformedLocation(String),
    #[error("unable to read archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CloudError {
    /// The HTTP status the service answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            CloudError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid upload request: {0}")]
    Validation(String),
    #[error("failed to package {}: {reason}", path.display())]
    Packaging { path: PathBuf, reason: String },
    #[error("failed to upload {}: {source}", path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: CloudError,
    },
    #[error("failed to create map '{name}': {source}")]
    MapCreation {
        name: String,
        #[source]
        source: CloudError,
    },
    #[error("failed to register layer '{name}': {source}")]
    Registration {
        name: String,
        #[source]
        source: CloudError,
    },
    #[error("unable to inspect {}: {reason}", path.display())]
    Inspection { path: PathBuf, reason: String },
    #[error("unsupported geometry type '{geometry}' in {}", path.display())]
    UnsupportedGeometry { path: PathBuf, geometry: String },
}

impl PublishError {
    pub(crate) fn packaging(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PublishError::Packaging {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn inspection(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PublishError::Inspection {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
