//! State import pipeline.
//!
//! Importing unpacks a state archive into memory, checks compatibility with
//! the target control plane, and replays the archived objects in an order
//! that respects the control plane's extension mechanics: base types first,
//! then readiness barriers for definitions and packages, then everything
//! else, finishing with a selective unpause.

mod apply;
mod config;
mod error;
mod import;
mod wait;

pub use apply::*;
pub use config::*;
pub use error::*;
pub use import::*;
pub use wait::*;
