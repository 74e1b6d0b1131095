use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid index encoding: {0}")]
    Json(#[from] serde_json::Error),

    /// The source file has no content, so there is nothing to index
    #[error("source file {0:?} is empty")]
    EmptySource(PathBuf),

    /// Index is not built properly
    #[error("malformed index: {0}")]
    MalformedIndex(String),

    /// The index artifact is missing, unreadable or malformed
    #[error("can't load index artifact {path:?}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// A line contains bytes outside of the ASCII range
    #[error("line {line} contains a non-ASCII byte at position {position}")]
    NonAscii { line: usize, position: usize },

    /// Queried before an index was loaded
    #[error("line service is not ready")]
    NotReady,

    #[error("line service already has an index loaded")]
    AlreadyLoaded,
}

impl Error {
    /// Wraps `self` into an `Error::Artifact` for the artifact at `path`.
    pub(crate) fn artifact<P: Into<PathBuf>>(self, path: P) -> Self {
        Self::Artifact {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Returns `true` if the error is caused by a missing, corrupt or invalid index artifact.
    pub fn is_artifact(&self) -> bool {
        matches!(self, Self::Artifact { .. })
    }
}
