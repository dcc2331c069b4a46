//! In-memory view of an unpacked state archive.

use crate::error::{ArchiveError, Result};
use crate::layout::{MANIFEST_FILE, TYPE_DESCRIPTOR_FILE};
use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use xpmigrate_core::{ExportManifest, Resource, TypeDescriptor};

/// A state archive unpacked into memory, owned by a single import run and
/// discarded at its end.
pub struct ArchiveFs {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl ArchiveFs {
    /// Read and unpack an archive file. Accepts gzipped and plain tar,
    /// detected by magic bytes.
    pub async fn open(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| ArchiveError::io(path, e))?;
        Self::from_bytes(&data, path)
    }

    /// Unpack archive bytes. `origin` is only used for error context.
    pub fn from_bytes(data: &[u8], origin: &Path) -> Result<Self> {
        let tar_data = if is_gzip(data) {
            let mut decoder = GzDecoder::new(data);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| ArchiveError::io(origin, e))?;
            decompressed
        } else {
            data.to_vec()
        };

        let mut files = BTreeMap::new();
        let mut archive = Archive::new(&tar_data[..]);
        for entry in archive.entries().map_err(|e| ArchiveError::io(origin, e))? {
            let mut entry = entry.map_err(|e| ArchiveError::io(origin, e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = entry
                .path()
                .map_err(|e| ArchiveError::io(origin, e))?
                .to_path_buf();
            if !is_safe_path(&path) {
                tracing::warn!(path = %path.display(), "skipping unsafe archive entry");
                continue;
            }
            let mut contents = Vec::new();
            entry
                .read_to_end(&mut contents)
                .map_err(|e| ArchiveError::io(origin, e))?;
            files.insert(path, contents);
        }

        Ok(Self { files })
    }

    /// Number of files in the archive.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Parse the top-level manifest.
    pub fn read_manifest(&self) -> Result<ExportManifest> {
        let data = self
            .files
            .get(Path::new(MANIFEST_FILE))
            .ok_or(ArchiveError::MissingManifest)?;
        serde_yaml::from_slice(data).map_err(|e| ArchiveError::Parse {
            path: PathBuf::from(MANIFEST_FILE),
            source: e,
        })
    }

    /// Type directories at the archive root, in listing order.
    ///
    /// Any root-level file other than the manifest makes the archive
    /// invalid.
    pub fn type_directories(&self) -> Result<Vec<String>> {
        let mut dirs = Vec::new();
        for path in self.files.keys() {
            let mut components = path.components();
            let Some(first) = components.next() else {
                continue;
            };
            let name = first.as_os_str().to_string_lossy().to_string();
            if components.next().is_some() {
                if dirs.last() != Some(&name) {
                    dirs.push(name);
                }
            } else if name != MANIFEST_FILE {
                return Err(ArchiveError::UnexpectedRootFile { name });
            }
        }
        Ok(dirs)
    }

    /// Whether the archive holds a file at the exact path.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files.contains_key(path.as_ref())
    }

    /// Whether the archive has a directory for the given type.
    pub fn has_type(&self, group_resource: &str) -> bool {
        let prefix = PathBuf::from(group_resource);
        self.files.keys().any(|p| p.starts_with(&prefix))
    }

    /// Read the descriptor (if the type has one) and every object stored
    /// under a type directory. Object order within the type is unspecified.
    pub fn read_type(
        &self,
        group_resource: &str,
    ) -> Result<(Option<TypeDescriptor>, Vec<Resource>)> {
        let prefix = PathBuf::from(group_resource);
        let descriptor_path = prefix.join(TYPE_DESCRIPTOR_FILE);
        let mut descriptor = None;
        let mut resources = Vec::new();

        for (path, data) in &self.files {
            if !path.starts_with(&prefix) {
                continue;
            }
            if *path == descriptor_path {
                descriptor = Some(serde_yaml::from_slice(data).map_err(|e| {
                    ArchiveError::Parse {
                        path: path.clone(),
                        source: e,
                    }
                })?);
            } else {
                resources.push(serde_yaml::from_slice(data).map_err(|e| {
                    ArchiveError::Parse {
                        path: path.clone(),
                        source: e,
                    }
                })?);
            }
        }

        Ok((descriptor, resources))
    }
}

fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

fn is_safe_path(path: &Path) -> bool {
    !path.is_absolute()
        && !path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
}
