//! Path mapping inside the exported state tree.

use std::path::PathBuf;
use xpmigrate_core::{GroupResource, Resource};

/// Filename of the per-type descriptor.
pub const TYPE_DESCRIPTOR_FILE: &str = "_type.yaml";

/// Filename of the top-level export manifest.
pub const MANIFEST_FILE: &str = "export.yaml";

/// Extension of every serialized document.
pub const DOCUMENT_EXTENSION: &str = "yaml";

/// Directory holding all objects of a type: `plural.group`, or the bare
/// plural for the core group.
pub fn type_dir(gr: &GroupResource) -> PathBuf {
    PathBuf::from(gr.to_string())
}

/// Path of the descriptor for a type.
pub fn descriptor_path(gr: &GroupResource) -> PathBuf {
    type_dir(gr).join(TYPE_DESCRIPTOR_FILE)
}

/// Deterministic path of a serialized object: namespaced objects get a
/// namespace subdirectory, cluster-scoped objects sit directly in the type
/// directory.
pub fn object_path(gr: &GroupResource, resource: &Resource) -> PathBuf {
    let mut path = type_dir(gr);
    if let Some(namespace) = resource.namespace() {
        path.push(namespace);
    }
    path.push(format!("{}.{}", resource.name(), DOCUMENT_EXTENSION));
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_namespaced_object_path() {
        let gr = GroupResource::new("", "configmaps");
        let r = Resource::new(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "app-config", "namespace": "tenant-a"}
        }));
        assert_eq!(
            object_path(&gr, &r),
            PathBuf::from("configmaps/tenant-a/app-config.yaml")
        );
    }

    #[test]
    fn test_cluster_scoped_object_path() {
        let gr = GroupResource::new("pkg.crossplane.io", "providers");
        let r = Resource::new(json!({
            "apiVersion": "pkg.crossplane.io/v1",
            "kind": "Provider",
            "metadata": {"name": "provider-aws"}
        }));
        assert_eq!(
            object_path(&gr, &r),
            PathBuf::from("providers.pkg.crossplane.io/provider-aws.yaml")
        );
    }

    #[test]
    fn test_descriptor_path() {
        let gr = GroupResource::new("example.org", "widgets");
        assert_eq!(
            descriptor_path(&gr),
            PathBuf::from("widgets.example.org/_type.yaml")
        );
    }
}
