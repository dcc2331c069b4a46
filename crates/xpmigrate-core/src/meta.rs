//! Metadata types written into a state archive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Manifest schema version written into `export.yaml`.
pub const MANIFEST_VERSION: &str = "v1alpha1";

/// Default archive filename for both export and import.
pub const DEFAULT_ARCHIVE_NAME: &str = "xp-state.tar.gz";

/// Page size for remote list calls.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Namespaces excluded from an export unless the caller overrides them.
pub const DEFAULT_EXCLUDED_NAMESPACES: &[&str] = &[
    "kube-system",
    "kube-public",
    "kube-node-lease",
    "local-path-storage",
];

/// Native resource types exported when none are specified.
pub const DEFAULT_NATIVE_RESOURCES: &[&str] = &["namespaces", "configmaps", "secrets"];

/// Per-type metadata stored as `_type.yaml` next to the exported objects.
///
/// `categories` drives the pause/unpause protocol on import without
/// re-deriving taxonomy from kind names; `with_status_subresource` tells the
/// importer whether a second write against the status endpoint is required
/// after applying an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescriptor {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub with_status_subresource: bool,
}

impl TypeDescriptor {
    /// Whether the type advertises the given category.
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// Identity of the control plane an export was taken from, read from its own
/// deployment record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub distribution: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_flags: Vec<String>,
}

/// Snapshot of the exporter's scope configuration, embedded in the manifest
/// for inspection and preflight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_extra_resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_resources: Vec<String>,
    #[serde(default)]
    pub pause_before_export: bool,
}

/// Top-level manifest written as `export.yaml` at the archive root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub crossplane: ControlPlaneInfo,
    #[serde(default)]
    pub options: ManifestOptions,
    /// Object counts per native resource, keyed by bare plural.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub native_counts: BTreeMap<String, usize>,
    /// Object counts per custom type, keyed by `plural.group`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_counts: BTreeMap<String, usize>,
}

impl ExportManifest {
    pub fn new(crossplane: ControlPlaneInfo, options: ManifestOptions) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            exported_at: Utc::now(),
            crossplane,
            options,
            native_counts: BTreeMap::new(),
            custom_counts: BTreeMap::new(),
        }
    }

    /// Total number of objects recorded in the manifest.
    pub fn total(&self) -> usize {
        self.native_counts.values().sum::<usize>() + self.custom_counts.values().sum::<usize>()
    }
}
