//! Error types for the import pipeline.

use thiserror::Error;
use xpmigrate_archive::ArchiveError;
use xpmigrate_core::ClientError;

#[derive(Debug, Error)]
pub enum ImportError {
    /// Reading or unpacking the input archive failed, or its layout is
    /// invalid.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Reading the target control plane's deployment record failed.
    #[error("cannot read control plane info: {0}")]
    Info(#[source] ClientError),

    /// The REST mapper could not resolve an archived type on the target.
    #[error("cannot get mapping for {name}: {source}")]
    Mapping {
        name: String,
        #[source]
        source: ClientError,
    },

    /// Applying archived objects of a type failed.
    #[error("cannot import {resource} resources: {source}")]
    Import {
        resource: String,
        #[source]
        source: ClientError,
    },

    /// A readiness barrier failed or timed out.
    #[error(transparent)]
    Barrier(#[from] WaitError),

    /// An unpause pass failed.
    #[error("cannot unpause {category} resources: {source}")]
    Unpause {
        category: String,
        #[source]
        source: ClientError,
    },

    /// The import was cancelled before completion.
    #[error("import cancelled")]
    Cancelled,
}

/// Errors from a readiness barrier.
#[derive(Debug, Error)]
pub enum WaitError {
    /// The deadline expired with unmet conditions remaining.
    #[error("timeout waiting for conditions {conditions} to be satisfied for all {kind}")]
    DeadlineExceeded { kind: String, conditions: String },

    /// The barrier's kind could not be resolved to a listable type.
    #[error("cannot resolve {kind}: {source}")]
    Mapping {
        kind: String,
        #[source]
        source: ClientError,
    },

    /// The wait was cancelled.
    #[error("wait cancelled")]
    Cancelled,
}

/// A single preflight incompatibility between the archive and the target.
///
/// Preflight issues are collected rather than failed fast; the caller
/// decides whether to proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreflightError {
    #[error("control plane version {observed:?} does not match exported version {exported:?}")]
    VersionMismatch { observed: String, exported: String },

    #[error(
        "feature flag {flag:?} was set in the exported control plane but is not set in the target"
    )]
    MissingFeatureFlag { flag: String },
}

pub type Result<T, E = ImportError> = std::result::Result<T, E>;
