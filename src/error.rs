use std::path::PathBuf;

use thiserror::Error;

/// Errors produced anywhere in the experiment pipeline.
///
/// None of these are recovered from: the sweep propagates them with `?`
/// and the binary reports them and exits.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed or inconsistent IDX data.
    #[error("dataset: {0}")]
    Dataset(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Loss became NaN or infinite during training.
    #[error("training diverged in epoch {epoch} ({split} split): loss is not finite")]
    Diverged { epoch: usize, split: &'static str },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Error {
        Error::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
