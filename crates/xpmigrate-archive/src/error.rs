//! Error types for archive reading and writing.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// IO failure with the offending path.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document could not be serialized.
    #[error("cannot serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A document in the archive could not be parsed.
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The archive root has no `export.yaml`.
    #[error("archive does not contain an export manifest")]
    MissingManifest,

    /// Something other than the manifest and type directories sits at the
    /// archive root.
    #[error("unexpected file {name} in root directory of exported state")]
    UnexpectedRootFile { name: String },
}

impl ArchiveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;
