//! Exporter configuration surface.

use std::collections::BTreeSet;
use std::path::PathBuf;
use xpmigrate_core::{
    ManifestOptions, DEFAULT_ARCHIVE_NAME, DEFAULT_EXCLUDED_NAMESPACES, DEFAULT_NATIVE_RESOURCES,
};

/// Options for a state export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Path of the archive to create.
    pub output_archive: PathBuf,
    /// Namespaces to include. Empty means all namespaces.
    pub include_namespaces: Vec<String>,
    /// Namespaces to exclude. Empty means the default system namespaces.
    pub exclude_namespaces: Vec<String>,
    /// Extra resource types to export. Empty means the default native set.
    pub include_extra_resources: Vec<String>,
    /// Resource types to drop from the extra set.
    pub exclude_resources: Vec<String>,
    /// Pause all managed resources before starting the export.
    pub pause_before_export: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_archive: PathBuf::from(DEFAULT_ARCHIVE_NAME),
            include_namespaces: Vec::new(),
            exclude_namespaces: Vec::new(),
            include_extra_resources: Vec::new(),
            exclude_resources: Vec::new(),
            pause_before_export: false,
        }
    }
}

impl ExportOptions {
    /// Effective namespace exclude set. The system namespaces stay excluded
    /// unless the caller supplies an explicit set.
    pub fn excluded_namespaces(&self) -> BTreeSet<String> {
        if self.exclude_namespaces.is_empty() {
            DEFAULT_EXCLUDED_NAMESPACES
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            self.exclude_namespaces.iter().cloned().collect()
        }
    }

    /// Native resource universe: the include set (defaulted when empty)
    /// minus the exclude set.
    pub fn native_resources(&self) -> BTreeSet<String> {
        let mut set: BTreeSet<String> = if self.include_extra_resources.is_empty() {
            DEFAULT_NATIVE_RESOURCES
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            self.include_extra_resources.iter().cloned().collect()
        };
        for resource in &self.exclude_resources {
            set.remove(resource);
        }
        set
    }

    /// Whether the fully-qualified type name was explicitly asked for.
    pub fn includes_extra_resource(&self, name: &str) -> bool {
        self.native_resources().contains(name)
    }

    /// Snapshot for the export manifest.
    pub fn manifest_options(&self) -> ManifestOptions {
        ManifestOptions {
            include_namespaces: self.include_namespaces.clone(),
            exclude_namespaces: self.exclude_namespaces.clone(),
            include_extra_resources: self.include_extra_resources.clone(),
            exclude_resources: self.exclude_resources.clone(),
            pause_before_export: self.pause_before_export,
        }
    }
}
