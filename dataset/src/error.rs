use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("no radiation field files found at {0:?}")]
    NotFound(PathBuf),
    #[error("failed to decode '{id}': {source}")]
    FileFormat {
        id: String,
        #[source]
        source: io::Error,
    },
    #[error("channel and layer must be set before loading '{0}'")]
    Precondition(String),
    #[error("index {index} is out of range for a dataset of {len} samples")]
    IndexOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),
    #[error("cache serialization failed: {0}")]
    Serialization(#[from] bincode::Error),
}

impl DatasetError {
    pub(crate) fn file_format(id: &str, source: io::Error) -> Self {
        Self::FileFormat {
            id: id.to_string(),
            source,
        }
    }
}
