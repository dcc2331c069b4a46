//! Paginated fetching of live objects with scope filtering.

use crate::config::ExportOptions;
use crate::error::{ExportError, Result};
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;
use xpmigrate_core::{
    DynamicClient, GroupVersionResource, ListOptions, Resource, DEFAULT_PAGE_SIZE,
};

const HELM_MANAGED_BY: &str = "Helm";
const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
const HELM_SECRET_TYPE_PREFIX: &str = "helm.sh/release";
const PACKAGE_API_GROUP_PREFIX: &str = "pkg.crossplane.io";
const ROOT_CA_CONFIGMAP: &str = "kube-root-ca.crt";

/// Fetches every live object of a type that passes the scope filter.
pub struct ResourceFetcher<'a> {
    client: &'a dyn DynamicClient,
    page_size: usize,
    included_namespaces: BTreeSet<String>,
    excluded_namespaces: BTreeSet<String>,
    cancellation: CancellationToken,
}

impl<'a> ResourceFetcher<'a> {
    pub fn new(client: &'a dyn DynamicClient, options: &ExportOptions) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
            included_namespaces: options.include_namespaces.iter().cloned().collect(),
            excluded_namespaces: options.excluded_namespaces(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Honor the given token between pages.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Drive the list endpoint page by page, dropping out-of-scope and
    /// system-managed objects.
    pub async fn fetch_resources(&self, gvr: &GroupVersionResource) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        let mut continue_token: Option<String> = None;

        loop {
            if self.cancellation.is_cancelled() {
                return Err(ExportError::Cancelled);
            }
            let page = self
                .client
                .list(
                    gvr,
                    &ListOptions {
                        limit: self.page_size,
                        continue_token: continue_token.take(),
                    },
                )
                .await
                .map_err(|e| ExportError::Fetch {
                    resource: gvr.group_resource().to_string(),
                    source: e,
                })?;

            resources.extend(page.items.into_iter().filter(|r| !self.should_skip(r)));

            match page.continue_token {
                Some(token) if !token.is_empty() => continue_token = Some(token),
                _ => break,
            }
        }

        Ok(resources)
    }

    fn namespace_in_scope(&self, namespace: &str) -> bool {
        if !self.included_namespaces.is_empty() && !self.included_namespaces.contains(namespace) {
            return false;
        }
        !self.excluded_namespaces.contains(namespace)
    }

    /// Scope filter, evaluated per object.
    pub fn should_skip(&self, resource: &Resource) -> bool {
        // Out-of-scope namespaces, both as Namespace objects and as the
        // namespace of namespaced objects.
        if resource.kind() == "Namespace" && !self.namespace_in_scope(resource.name()) {
            return true;
        }
        if let Some(namespace) = resource.namespace() {
            if !self.namespace_in_scope(namespace) {
                return true;
            }
        }

        // Cluster-specific root trust bundle.
        if resource.kind() == "ConfigMap" && resource.name() == ROOT_CA_CONFIGMAP {
            return true;
        }

        // Helm-managed objects get reinstalled on the target by Helm.
        if resource.label(MANAGED_BY_LABEL) == Some(HELM_MANAGED_BY) {
            return true;
        }
        if resource.kind() == "Secret" {
            let secret_type = resource.string_field(&["type"]).unwrap_or("");
            if secret_type.starts_with(HELM_SECRET_TYPE_PREFIX) {
                return true;
            }
        }

        // Objects owned by the package manager get reinstalled by it.
        if resource
            .owner_references()
            .iter()
            .any(|or| or.api_version.starts_with(PACKAGE_API_GROUP_PREFIX))
        {
            return true;
        }

        // Package manager locks are cluster-local state.
        if resource.kind() == "Lock"
            && resource.api_version().starts_with(PACKAGE_API_GROUP_PREFIX)
        {
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use xpmigrate_core::MockCluster;

    fn fetcher_with<'a>(client: &'a MockCluster, options: &ExportOptions) -> ResourceFetcher<'a> {
        ResourceFetcher::new(client, options)
    }

    fn namespaced(kind: &str, namespace: &str, name: &str) -> Resource {
        Resource::new(json!({
            "apiVersion": "v1",
            "kind": kind,
            "metadata": {"name": name, "namespace": namespace}
        }))
    }

    #[tokio::test]
    async fn test_fetch_joins_pages_and_filters() {
        let cluster = MockCluster::new();
        let gvr = GroupVersionResource::new("", "v1", "configmaps");
        for i in 0..3 {
            cluster
                .insert(&gvr, namespaced("ConfigMap", "default", &format!("cm{i}")))
                .await;
        }
        cluster
            .insert(&gvr, namespaced("ConfigMap", "kube-system", "in-system"))
            .await;

        let options = ExportOptions::default();
        let mut fetcher = fetcher_with(&cluster, &options);
        fetcher.page_size = 2;

        let fetched = fetcher.fetch_resources(&gvr).await.unwrap();
        assert_eq!(fetched.len(), 3);
        assert!(fetched.iter().all(|r| r.namespace() == Some("default")));
    }

    #[test]
    fn test_namespace_scope_include_set() {
        let cluster = MockCluster::new();
        let options = ExportOptions {
            include_namespaces: vec!["tenant-a".to_string()],
            ..Default::default()
        };
        let fetcher = fetcher_with(&cluster, &options);

        assert!(!fetcher.should_skip(&namespaced("ConfigMap", "tenant-a", "cm")));
        assert!(fetcher.should_skip(&namespaced("ConfigMap", "tenant-b", "cm")));
        // Namespace objects are filtered by their own name.
        let ns = Resource::new(json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": {"name": "tenant-b"}
        }));
        assert!(fetcher.should_skip(&ns));
    }

    #[test]
    fn test_default_system_namespaces_excluded() {
        let cluster = MockCluster::new();
        let options = ExportOptions::default();
        let fetcher = fetcher_with(&cluster, &options);
        assert!(fetcher.should_skip(&namespaced("Secret", "kube-system", "s")));
        assert!(!fetcher.should_skip(&namespaced("Secret", "default", "s")));
    }

    #[test]
    fn test_cluster_scoped_objects_always_in_scope() {
        let cluster = MockCluster::new();
        let options = ExportOptions {
            include_namespaces: vec!["tenant-a".to_string()],
            ..Default::default()
        };
        let fetcher = fetcher_with(&cluster, &options);
        let xr = Resource::new(json!({
            "apiVersion": "example.org/v1",
            "kind": "CompositeWidget",
            "metadata": {"name": "cw"}
        }));
        assert!(!fetcher.should_skip(&xr));
    }

    #[test]
    fn test_root_ca_configmap_skipped() {
        let cluster = MockCluster::new();
        let fetcher = fetcher_with(&cluster, &ExportOptions::default());
        assert!(fetcher.should_skip(&namespaced("ConfigMap", "default", "kube-root-ca.crt")));
        // Only ConfigMaps with that exact name.
        assert!(!fetcher.should_skip(&namespaced("Secret", "default", "kube-root-ca.crt")));
    }

    #[test]
    fn test_helm_label_skipped() {
        let cluster = MockCluster::new();
        let fetcher = fetcher_with(&cluster, &ExportOptions::default());
        let helm = Resource::new(json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "crossplane-tls",
                "namespace": "default",
                "labels": {"app.kubernetes.io/managed-by": "Helm"}
            }
        }));
        assert!(fetcher.should_skip(&helm));
    }

    #[test]
    fn test_helm_release_secret_skipped() {
        let cluster = MockCluster::new();
        let fetcher = fetcher_with(&cluster, &ExportOptions::default());
        let release = Resource::new(json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "type": "helm.sh/release.v1",
            "metadata": {"name": "sh.helm.release.v1.crossplane.v1", "namespace": "default"}
        }));
        assert!(fetcher.should_skip(&release));
        let opaque = Resource::new(json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "type": "Opaque",
            "metadata": {"name": "user-secret", "namespace": "default"}
        }));
        assert!(!fetcher.should_skip(&opaque));
    }

    #[test]
    fn test_package_owned_objects_skipped() {
        let cluster = MockCluster::new();
        let fetcher = fetcher_with(&cluster, &ExportOptions::default());
        let owned = Resource::new(json!({
            "apiVersion": "example.org/v1",
            "kind": "Widget",
            "metadata": {
                "name": "w",
                "ownerReferences": [
                    {"apiVersion": "pkg.crossplane.io/v1", "kind": "Provider", "name": "p"}
                ]
            }
        }));
        assert!(fetcher.should_skip(&owned));
    }

    #[test]
    fn test_package_lock_skipped() {
        let cluster = MockCluster::new();
        let fetcher = fetcher_with(&cluster, &ExportOptions::default());
        let lock = Resource::new(json!({
            "apiVersion": "pkg.crossplane.io/v1beta1",
            "kind": "Lock",
            "metadata": {"name": "lock"}
        }));
        assert!(fetcher.should_skip(&lock));
    }

    #[tokio::test]
    async fn test_list_error_is_fatal_with_type_context() {
        let cluster = MockCluster::new();
        let gvr = GroupVersionResource::new("", "v1", "secrets");
        cluster.fail_lists(&gvr, 1).await;

        let options = ExportOptions::default();
        let fetcher = fetcher_with(&cluster, &options);
        let err = fetcher.fetch_resources(&gvr).await.unwrap_err();
        assert!(err.to_string().contains("secrets"));
    }
}
