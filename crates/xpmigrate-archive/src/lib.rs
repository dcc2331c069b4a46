//! Portable on-disk layout and archive packaging for exported control plane
//! state.
//!
//! The exported state is a directory tree with one directory per resource
//! type, a `_type.yaml` descriptor next to each custom type's objects, and a
//! top-level `export.yaml` manifest:
//!
//! ```text
//! <groupResource>/_type.yaml               type descriptor (custom types)
//! <groupResource>/<namespace>/<name>.yaml  namespaced objects
//! <groupResource>/<name>.yaml              cluster-scoped objects
//! export.yaml                              export manifest
//! ```
//!
//! The tree is packaged as a gzipped tar archive. Reading happens through
//! [`ArchiveFs`], an in-memory view discarded at the end of an import run.

mod error;
mod fs;
mod layout;
mod pack;
mod persister;

pub use error::*;
pub use fs::*;
pub use layout::*;
pub use pack::*;
pub use persister::*;
