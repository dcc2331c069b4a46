//! Core types and client seams for control plane state migration.
//!
//! This crate defines the unstructured object model the migrator moves
//! around, the traits the host environment injects (dynamic client,
//! category discovery, REST mapper, deployment reader), the metadata types
//! written into a state archive, and the category-wide annotation passes
//! shared by the exporter and the importer.

mod category;
mod client;
mod error;
mod info;
mod logging;
mod meta;
mod mock;
mod resource;

pub use category::*;
pub use client::*;
pub use error::*;
pub use info::*;
pub use logging::*;
pub use meta::*;
pub use mock::*;
pub use resource::*;
