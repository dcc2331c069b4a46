//! Packing the staging directory into a gzipped tar archive.

use crate::error::{ArchiveError, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::Path;
use tar::Builder;

/// Package `dir` into a gzipped tar archive at `output` with owner-only
/// permissions. Entry paths are relative to `dir`.
pub async fn pack(dir: &Path, output: &Path) -> Result<()> {
    let tar_data = {
        let mut builder = Builder::new(Vec::new());
        append_dir(&mut builder, dir, Path::new(""))?;
        builder
            .finish()
            .map_err(|e| ArchiveError::io(output, e))?;
        builder
            .into_inner()
            .map_err(|e| ArchiveError::io(output, e))?
    };

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&tar_data)
        .map_err(|e| ArchiveError::io(output, e))?;
    let compressed = encoder
        .finish()
        .map_err(|e| ArchiveError::io(output, e))?;

    tokio::fs::write(output, &compressed)
        .await
        .map_err(|e| ArchiveError::io(output, e))?;
    restrict_permissions(output)?;

    tracing::debug!(
        output = %output.display(),
        size = compressed.len(),
        "packed state archive"
    );
    Ok(())
}

fn append_dir(builder: &mut Builder<Vec<u8>>, root: &Path, relative: &Path) -> Result<()> {
    let dir = root.join(relative);
    let mut entries: Vec<_> = fs::read_dir(&dir)
        .map_err(|e| ArchiveError::io(&dir, e))?
        .collect::<std::io::Result<_>>()
        .map_err(|e| ArchiveError::io(&dir, e))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let entry_relative = relative.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| ArchiveError::io(entry.path(), e))?;
        if file_type.is_dir() {
            append_dir(builder, root, &entry_relative)?;
        } else if file_type.is_file() {
            let data = fs::read(entry.path()).map_err(|e| ArchiveError::io(entry.path(), e))?;
            append_file(builder, &entry_relative, &data)
                .map_err(|e| ArchiveError::io(entry.path(), e))?;
        }
    }
    Ok(())
}

fn append_file(
    builder: &mut Builder<Vec<u8>>,
    path: &Path,
    data: &[u8],
) -> std::io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_path(path)?;
    header.set_size(data.len() as u64);
    header.set_mode(0o600);
    header.set_mtime(0);
    header.set_cksum();
    builder.append(&header, data)
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
