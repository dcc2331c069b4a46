//! Error types for the export pipeline.

use thiserror::Error;
use xpmigrate_archive::ArchiveError;
use xpmigrate_core::ClientError;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Pausing managed resources before the export failed.
    #[error("cannot pause managed resources: {0}")]
    Pause(#[source] ClientError),

    /// Listing installed custom type definitions failed.
    #[error("cannot discover custom types: {0}")]
    Discover(#[source] ClientError),

    /// A selected custom type declares no storage version.
    #[error("no storage version for {name}")]
    NoStorageVersion { name: String },

    /// The REST mapper could not resolve a type.
    #[error("cannot get mapping for {name}: {source}")]
    Mapping {
        name: String,
        #[source]
        source: ClientError,
    },

    /// Listing live objects of a type failed.
    #[error("cannot fetch {resource} resources: {source}")]
    Fetch {
        resource: String,
        #[source]
        source: ClientError,
    },

    /// Reading the control plane's own deployment record failed.
    #[error("cannot read control plane info: {0}")]
    Info(#[source] ClientError),

    /// The staging directory could not be created.
    #[error("cannot create staging directory: {0}")]
    Staging(#[source] std::io::Error),

    /// Writing or packaging the exported state failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The export was cancelled before completion.
    #[error("export cancelled")]
    Cancelled,
}

pub type Result<T, E = ExportError> = std::result::Result<T, E>;
