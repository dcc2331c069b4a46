//! Importer configuration surface.

use std::path::PathBuf;
use xpmigrate_core::DEFAULT_ARCHIVE_NAME;

/// Options for a state import.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Path of the archive to import.
    pub input_archive: PathBuf,
    /// Also unpause managed resources once the import finishes. When false,
    /// managed resources stay paused and the operator takes over later.
    pub unpause_after_import: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            input_archive: PathBuf::from(DEFAULT_ARCHIVE_NAME),
            unpause_after_import: false,
        }
    }
}
