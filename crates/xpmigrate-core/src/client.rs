//! Client seams injected by the host environment.
//!
//! The migrator never talks a concrete wire protocol; it consumes these
//! traits and the host wires in real clients (or [`crate::MockCluster`] in
//! tests).

use crate::error::Result;
use crate::resource::{GroupVersionResource, Resource};
use async_trait::async_trait;

/// Options for a single page of a list call.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Maximum number of items in the page. Zero means no bound.
    pub limit: usize,
    /// Opaque continuation token from the previous page.
    pub continue_token: Option<String>,
}

/// One page of listed objects plus the continuation token, if any.
#[derive(Debug, Clone, Default)]
pub struct ResourcePage {
    pub items: Vec<Resource>,
    /// Empty or absent when the listing is exhausted.
    pub continue_token: Option<String>,
}

/// Dynamic access to objects of any resource type.
#[async_trait]
pub trait DynamicClient: Send + Sync {
    /// List one page of objects of the given type.
    async fn list(&self, gvr: &GroupVersionResource, opts: &ListOptions) -> Result<ResourcePage>;

    /// Create or update an object. Must be idempotent under replay.
    async fn apply(&self, gvr: &GroupVersionResource, resource: &Resource) -> Result<()>;

    /// Write the status block of an already-applied object.
    async fn apply_status(&self, gvr: &GroupVersionResource, resource: &Resource) -> Result<()>;
}

/// Discovery of resource types by advertised category.
#[async_trait]
pub trait CategoryDiscovery: Send + Sync {
    /// Resource types advertising the given category, from live discovery.
    async fn resources_in_category(&self, category: &str) -> Result<Vec<GroupVersionResource>>;
}

/// Mapping between kinds, resource names and fully-qualified types.
#[async_trait]
pub trait RestMapper: Send + Sync {
    /// Resolve a kind (optionally pinned to a version) to its served
    /// resource.
    async fn kind_to_resource(
        &self,
        group: &str,
        kind: &str,
        version: Option<&str>,
    ) -> Result<GroupVersionResource>;

    /// Resolve a possibly group-qualified resource plural (`secrets`,
    /// `providers.pkg.crossplane.io`) to a fully-qualified type.
    async fn resource_to_gvr(&self, group_resource: &str) -> Result<GroupVersionResource>;

    /// Drop cached mappings so types introduced after discovery become
    /// resolvable.
    async fn reset(&self);
}

/// Access to the Deployments of the cluster hosting the control plane.
#[async_trait]
pub trait DeploymentReader: Send + Sync {
    /// All Deployments on the cluster, as unstructured objects.
    async fn list_deployments(&self) -> Result<Vec<Resource>>;
}

/// Drain every page of a list call into a single vector.
pub async fn list_all(
    client: &dyn DynamicClient,
    gvr: &GroupVersionResource,
    page_size: usize,
) -> Result<Vec<Resource>> {
    let mut items = Vec::new();
    let mut continue_token: Option<String> = None;
    loop {
        let page = client
            .list(
                gvr,
                &ListOptions {
                    limit: page_size,
                    continue_token: continue_token.take(),
                },
            )
            .await?;
        items.extend(page.items);
        match page.continue_token {
            Some(token) if !token.is_empty() => continue_token = Some(token),
            _ => break,
        }
    }
    Ok(items)
}
