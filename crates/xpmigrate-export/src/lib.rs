//! State export pipeline.
//!
//! Exporting walks the control plane's dynamically discovered schema,
//! decides which types belong in the export, fetches every in-scope object
//! page by page, and writes the result as a portable gzipped tar archive
//! with enough metadata for a dependency-ordered replay on another control
//! plane.

mod config;
mod error;
mod export;
mod fetch;
mod selector;

pub use config::*;
pub use error::*;
pub use export::*;
pub use fetch::*;
pub use selector::*;
