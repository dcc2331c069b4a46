//! Discovery and selection of custom types for export.

use crate::config::ExportOptions;
use crate::error::{ExportError, Result};
use serde_json::Value;
use xpmigrate_core::{
    list_all, DynamicClient, GroupVersionResource, Resource, RestMapper, TypeDescriptor,
    DEFAULT_PAGE_SIZE,
};

const PACKAGE_OWNER_API_VERSION: &str = "pkg.crossplane.io/v1";
const XRD_OWNER_API_VERSION: &str = "apiextensions.crossplane.io/v1";
const XRD_KIND: &str = "CompositeResourceDefinition";
const CORE_TYPE_SUFFIX: &str = ".crossplane.io";

/// Type of the custom resource definitions themselves.
pub fn crd_gvr() -> GroupVersionResource {
    GroupVersionResource::new("apiextensions.k8s.io", "v1", "customresourcedefinitions")
}

/// A custom type admitted into the export universe.
#[derive(Debug, Clone)]
pub struct TypeSelection {
    pub gvr: GroupVersionResource,
    pub descriptor: TypeDescriptor,
}

/// Decides which installed custom types belong to an export and resolves
/// each to its storage version and plural resource name.
pub struct SchemaSelector<'a> {
    client: &'a dyn DynamicClient,
    mapper: &'a dyn RestMapper,
    options: &'a ExportOptions,
}

impl<'a> SchemaSelector<'a> {
    pub fn new(
        client: &'a dyn DynamicClient,
        mapper: &'a dyn RestMapper,
        options: &'a ExportOptions,
    ) -> Self {
        Self {
            client,
            mapper,
            options,
        }
    }

    /// List every installed definition and keep the ones in the export
    /// universe, paired with their descriptors.
    pub async fn select_custom_types(&self) -> Result<Vec<TypeSelection>> {
        let definitions = list_all(self.client, &crd_gvr(), DEFAULT_PAGE_SIZE)
            .await
            .map_err(ExportError::Discover)?;

        let mut selections = Vec::new();
        for definition in &definitions {
            if !self.should_export(definition) {
                continue;
            }
            selections.push(self.selection_for(definition).await?);
        }
        tracing::debug!(
            discovered = definitions.len(),
            selected = selections.len(),
            "selected custom types for export"
        );
        Ok(selections)
    }

    /// A definition is in the export universe if it is owned by a package,
    /// owned by a composite resource definition, a built-in core type, or
    /// explicitly asked for.
    pub fn should_export(&self, definition: &Resource) -> bool {
        for owner in definition.owner_references() {
            if owner.api_version == PACKAGE_OWNER_API_VERSION {
                return true;
            }
            if owner.api_version == XRD_OWNER_API_VERSION && owner.kind == XRD_KIND {
                return true;
            }
        }

        if definition.name().ends_with(CORE_TYPE_SUFFIX) {
            return true;
        }

        self.options.includes_extra_resource(definition.name())
    }

    async fn selection_for(&self, definition: &Resource) -> Result<TypeSelection> {
        let group = definition.string_field(&["spec", "group"]).unwrap_or("");
        let kind = definition
            .string_field(&["spec", "names", "kind"])
            .unwrap_or("");
        let storage = storage_version(definition).ok_or_else(|| ExportError::NoStorageVersion {
            name: definition.name().to_string(),
        })?;

        let gvr = self
            .mapper
            .kind_to_resource(group, kind, Some(storage))
            .await
            .map_err(|e| ExportError::Mapping {
                name: definition.name().to_string(),
                source: e,
            })?;

        Ok(TypeSelection {
            gvr,
            descriptor: TypeDescriptor {
                categories: categories(definition),
                with_status_subresource: has_status_subresource(definition),
            },
        })
    }
}

fn versions(definition: &Resource) -> &[Value] {
    definition
        .field(&["spec", "versions"])
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Name of the version the control plane persists, if any.
fn storage_version(definition: &Resource) -> Option<&str> {
    versions(definition)
        .iter()
        .filter(|v| v.get("storage").and_then(Value::as_bool) == Some(true))
        .next_back()?
        .get("name")
        .and_then(Value::as_str)
}

/// Whether the storage version declares a status subresource.
fn has_status_subresource(definition: &Resource) -> bool {
    versions(definition).iter().any(|v| {
        v.get("storage").and_then(Value::as_bool) == Some(true)
            && v.get("subresources")
                .and_then(|s| s.get("status"))
                .map(|s| !s.is_null())
                .unwrap_or(false)
    })
}

/// Category tags declared by the definition, copied verbatim.
fn categories(definition: &Resource) -> Vec<String> {
    definition
        .field(&["spec", "names", "categories"])
        .and_then(Value::as_array)
        .map(|categories| {
            categories
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
