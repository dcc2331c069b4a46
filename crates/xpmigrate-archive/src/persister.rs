//! Writing exported state into a staging directory.

use crate::error::{ArchiveError, Result};
use crate::layout;
use std::fs;
use std::path::{Path, PathBuf};
use xpmigrate_core::{ExportManifest, GroupResource, Resource, TypeDescriptor};

/// Serializes objects, descriptors and the manifest into the staging
/// directory that later becomes the archive.
pub struct Persister {
    root: PathBuf,
}

impl Persister {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one object under its type directory.
    pub fn persist_resource(&self, gr: &GroupResource, resource: &Resource) -> Result<()> {
        let path = self.root.join(layout::object_path(gr, resource));
        let body = serde_yaml::to_string(resource).map_err(|e| ArchiveError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        write_document(&path, body.as_bytes())
    }

    /// Write the descriptor for a custom type, once per type.
    pub fn persist_descriptor(&self, gr: &GroupResource, descriptor: &TypeDescriptor) -> Result<()> {
        let path = self.root.join(layout::descriptor_path(gr));
        let body = serde_yaml::to_string(descriptor).map_err(|e| ArchiveError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        write_document(&path, body.as_bytes())
    }

    /// Write the top-level manifest at the staging root.
    pub fn persist_manifest(&self, manifest: &ExportManifest) -> Result<()> {
        let path = self.root.join(layout::MANIFEST_FILE);
        let body = serde_yaml::to_string(manifest).map_err(|e| ArchiveError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        write_document(&path, body.as_bytes())
    }
}

fn write_document(path: &Path, body: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
    }
    fs::write(path, body).map_err(|e| ArchiveError::io(path, e))?;
    restrict_permissions(path)?;
    Ok(())
}

fn restrict_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| ArchiveError::io(path, e))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
