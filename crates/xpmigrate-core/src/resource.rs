//! Unstructured object model and resource type identities.
//!
//! Objects travel through the migrator as opaque map-valued documents. This
//! module wraps `serde_json::Value` with the accessors the pipeline needs
//! and defines the identity types used to address resource types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A resource type without a version: group plus plural resource name.
///
/// The display form matches directory names in a state archive: bare plural
/// for the core group (`secrets`), `plural.group` otherwise
/// (`providers.pkg.crossplane.io`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupResource {
    pub group: String,
    pub resource: String,
}

impl GroupResource {
    pub fn new(group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            resource: resource.into(),
        }
    }

    /// Parse the display form back into its parts. The split is at the first
    /// dot, so `storeconfigs.secrets.crossplane.io` yields resource
    /// `storeconfigs` in group `secrets.crossplane.io`.
    pub fn parse(s: &str) -> Self {
        match s.split_once('.') {
            Some((resource, group)) => Self::new(group, resource),
            None => Self::new("", s),
        }
    }
}

impl fmt::Display for GroupResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

/// Fully-qualified resource type: group, version and plural resource name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    pub fn group_resource(&self) -> GroupResource {
        GroupResource::new(self.group.clone(), self.resource.clone())
    }
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_resource(), self.version)
    }
}

/// A kind within a group, the addressing used by readiness barriers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

/// Owner reference as recorded in an object's metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

/// A live object captured from, or destined for, a control plane.
///
/// The raw server document is preserved verbatim; accessors only read or
/// surgically edit well-known metadata paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(Value);

impl Resource {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Walk a path of object keys, returning the value at the end.
    pub fn field(&self, path: &[&str]) -> Option<&Value> {
        let mut current = &self.0;
        for key in path {
            current = current.get(key)?;
        }
        Some(current)
    }

    /// Like [`Resource::field`] but for string leaves.
    pub fn string_field(&self, path: &[&str]) -> Option<&str> {
        self.field(path).and_then(Value::as_str)
    }

    fn str_or_empty(&self, path: &[&str]) -> &str {
        self.string_field(path).unwrap_or("")
    }

    pub fn api_version(&self) -> &str {
        self.str_or_empty(&["apiVersion"])
    }

    pub fn kind(&self) -> &str {
        self.str_or_empty(&["kind"])
    }

    pub fn name(&self) -> &str {
        self.str_or_empty(&["metadata", "name"])
    }

    /// Namespace, or `None` for cluster-scoped objects.
    pub fn namespace(&self) -> Option<&str> {
        self.string_field(&["metadata", "namespace"])
            .filter(|ns| !ns.is_empty())
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.field(&["metadata", "labels", key]).and_then(Value::as_str)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.field(&["metadata", "annotations", key])
            .and_then(Value::as_str)
    }

    /// Owner references, skipping entries that are not well formed.
    pub fn owner_references(&self) -> Vec<OwnerReference> {
        self.field(&["metadata", "ownerReferences"])
            .and_then(Value::as_array)
            .map(|refs| {
                refs.iter()
                    .filter_map(|r| serde_json::from_value(r.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn status(&self) -> Option<&Value> {
        self.field(&["status"])
    }

    /// Whether `status.conditions` carries the named condition with status
    /// `"True"`.
    pub fn condition_is_true(&self, condition: &str) -> bool {
        self.field(&["status", "conditions"])
            .and_then(Value::as_array)
            .map(|conditions| {
                conditions.iter().any(|c| {
                    c.get("type").and_then(Value::as_str) == Some(condition)
                        && c.get("status").and_then(Value::as_str) == Some("True")
                })
            })
            .unwrap_or(false)
    }

    fn metadata_object_mut(&mut self, key: &str) -> Option<&mut Map<String, Value>> {
        let root = self.0.as_object_mut()?;
        let metadata = root
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        let metadata = metadata.as_object_mut()?;
        let entry = metadata
            .entry(key)
            .or_insert_with(|| Value::Object(Map::new()));
        entry.as_object_mut()
    }

    /// Set an annotation, creating the annotations map if needed.
    pub fn add_annotation(&mut self, key: &str, value: &str) {
        if let Some(annotations) = self.metadata_object_mut("annotations") {
            annotations.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    /// Remove an annotation, dropping the annotations map entirely when it
    /// becomes empty. Returns whether the annotation was present.
    pub fn remove_annotation(&mut self, key: &str) -> bool {
        let Some(metadata) = self
            .0
            .as_object_mut()
            .and_then(|root| root.get_mut("metadata"))
            .and_then(Value::as_object_mut)
        else {
            return false;
        };
        let Some(annotations) = metadata.get_mut("annotations").and_then(Value::as_object_mut)
        else {
            return false;
        };
        let removed = annotations.remove(key).is_some();
        if annotations.is_empty() {
            metadata.remove("annotations");
        }
        removed
    }

    /// Drop server-assigned identity so the object can be applied to another
    /// control plane.
    pub fn strip_server_fields(&mut self) {
        if let Some(metadata) = self
            .0
            .as_object_mut()
            .and_then(|root| root.get_mut("metadata"))
            .and_then(Value::as_object_mut)
        {
            metadata.remove("resourceVersion");
            metadata.remove("uid");
        }
    }
}

impl From<Value> for Resource {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
