//! Applying archived objects to the target control plane.

use xpmigrate_core::{
    ClientError, DynamicClient, GroupVersionResource, Resource, TypeDescriptor, CATEGORY_CLAIM,
    CATEGORY_COMPOSITE, CATEGORY_MANAGED, PAUSED_ANNOTATION,
};

/// Categories whose instances are paused while the migration is in flight.
const PAUSABLE_CATEGORIES: &[&str] = &[CATEGORY_CLAIM, CATEGORY_COMPOSITE, CATEGORY_MANAGED];

/// Applies archived objects with create-or-update semantics, pausing
/// reconcilable categories so no controller acts before the migration
/// window closes.
pub struct ResourceApplier<'a> {
    client: &'a dyn DynamicClient,
}

impl<'a> ResourceApplier<'a> {
    pub fn new(client: &'a dyn DynamicClient) -> Self {
        Self { client }
    }

    /// Apply one archived object.
    ///
    /// Server-assigned identity is stripped first. Objects of claim,
    /// composite or managed types get the pause annotation before the
    /// write, so they appear paused from the moment they exist. When the
    /// type replays its status subresource and the object carries a status
    /// block, a second write goes against the status endpoint.
    pub async fn apply(
        &self,
        gvr: &GroupVersionResource,
        mut resource: Resource,
        descriptor: Option<&TypeDescriptor>,
        status_enabled: bool,
    ) -> Result<(), ClientError> {
        resource.strip_server_fields();

        if let Some(descriptor) = descriptor {
            if PAUSABLE_CATEGORIES
                .iter()
                .any(|category| descriptor.has_category(category))
            {
                resource.add_annotation(PAUSED_ANNOTATION, "true");
            }
        }

        self.client.apply(gvr, &resource).await?;

        let with_status = descriptor
            .map(|d| d.with_status_subresource)
            .unwrap_or(false);
        if status_enabled && with_status && resource.status().is_some() {
            self.client.apply_status(gvr, &resource).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use xpmigrate_core::MockCluster;

    fn widget_gvr() -> GroupVersionResource {
        GroupVersionResource::new("example.org", "v1", "widgets")
    }

    fn widget() -> Resource {
        Resource::new(json!({
            "apiVersion": "example.org/v1",
            "kind": "Widget",
            "metadata": {"name": "w1", "resourceVersion": "7", "uid": "u-7"},
            "spec": {"size": 1},
            "status": {"observed": 1}
        }))
    }

    fn managed_descriptor() -> TypeDescriptor {
        TypeDescriptor {
            categories: vec!["crossplane".to_string(), "managed".to_string()],
            with_status_subresource: true,
        }
    }

    #[tokio::test]
    async fn test_apply_strips_server_identity() {
        let cluster = MockCluster::new();
        let applier = ResourceApplier::new(&cluster);
        applier
            .apply(&widget_gvr(), widget(), None, false)
            .await
            .unwrap();

        let stored = cluster.find(&widget_gvr(), None, "w1").await.unwrap();
        assert!(stored.field(&["metadata", "resourceVersion"]).is_none());
        assert!(stored.field(&["metadata", "uid"]).is_none());
    }

    #[tokio::test]
    async fn test_apply_pauses_categorized_types() {
        let cluster = MockCluster::new();
        let applier = ResourceApplier::new(&cluster);
        applier
            .apply(&widget_gvr(), widget(), Some(&managed_descriptor()), false)
            .await
            .unwrap();

        let stored = cluster.find(&widget_gvr(), None, "w1").await.unwrap();
        assert_eq!(stored.annotation(PAUSED_ANNOTATION), Some("true"));
    }

    #[tokio::test]
    async fn test_apply_without_categories_leaves_annotations_alone() {
        let cluster = MockCluster::new();
        let applier = ResourceApplier::new(&cluster);
        let descriptor = TypeDescriptor::default();
        applier
            .apply(&widget_gvr(), widget(), Some(&descriptor), false)
            .await
            .unwrap();

        let stored = cluster.find(&widget_gvr(), None, "w1").await.unwrap();
        assert_eq!(stored.annotation(PAUSED_ANNOTATION), None);
    }

    #[tokio::test]
    async fn test_status_written_only_when_enabled() {
        let cluster = MockCluster::new();
        let applier = ResourceApplier::new(&cluster);
        let descriptor = managed_descriptor();

        applier
            .apply(&widget_gvr(), widget(), Some(&descriptor), false)
            .await
            .unwrap();
        assert!(!cluster
            .events()
            .await
            .iter()
            .any(|e| e.starts_with("status ")));

        applier
            .apply(&widget_gvr(), widget(), Some(&descriptor), true)
            .await
            .unwrap();
        assert!(cluster
            .events()
            .await
            .iter()
            .any(|e| e == "status widgets.example.org/w1"));
    }

    #[tokio::test]
    async fn test_status_skipped_without_status_block() {
        let cluster = MockCluster::new();
        let applier = ResourceApplier::new(&cluster);
        let resource = Resource::new(json!({
            "apiVersion": "example.org/v1",
            "kind": "Widget",
            "metadata": {"name": "w2"},
            "spec": {}
        }));
        applier
            .apply(&widget_gvr(), resource, Some(&managed_descriptor()), true)
            .await
            .unwrap();
        assert!(!cluster
            .events()
            .await
            .iter()
            .any(|e| e.starts_with("status ")));
    }
}
