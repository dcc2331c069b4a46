//! Category-wide annotation passes.
//!
//! The pause/unpause protocol operates on whole categories ("managed",
//! "composite", "claim") rather than known kinds, so newly installed
//! resource kinds classified into the same category are covered without
//! code changes. Membership is discovered live at modify time, never from an
//! archive.

use crate::client::{list_all, CategoryDiscovery, DynamicClient};
use crate::error::{ClientError, Result};
use crate::meta::DEFAULT_PAGE_SIZE;
use crate::resource::Resource;
use tokio_util::sync::CancellationToken;

/// Annotation that tells controllers to take no action on an object.
pub const PAUSED_ANNOTATION: &str = "crossplane.io/paused";

/// Category of resources that touch external systems.
pub const CATEGORY_MANAGED: &str = "managed";
/// Category of composite resources.
pub const CATEGORY_COMPOSITE: &str = "composite";
/// Category of claims.
pub const CATEGORY_CLAIM: &str = "claim";

/// Batch annotation mutation across every type advertising a category.
pub struct CategoryModifier<'a> {
    client: &'a dyn DynamicClient,
    discovery: &'a dyn CategoryDiscovery,
    cancellation: CancellationToken,
}

impl<'a> CategoryModifier<'a> {
    pub fn new(client: &'a dyn DynamicClient, discovery: &'a dyn CategoryDiscovery) -> Self {
        Self {
            client,
            discovery,
            cancellation: CancellationToken::new(),
        }
    }

    /// Honor the given token at every list and write-back.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Apply `mutate` to every instance of every type advertising
    /// `category` and write the result back. Returns the number of objects
    /// written.
    pub async fn modify_resources<F>(&self, category: &str, mutate: F) -> Result<usize>
    where
        F: Fn(&mut Resource),
    {
        let mut count = 0;
        for gvr in self.discovery.resources_in_category(category).await? {
            if self.cancellation.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            let items = list_all(self.client, &gvr, DEFAULT_PAGE_SIZE).await?;
            for mut resource in items {
                if self.cancellation.is_cancelled() {
                    return Err(ClientError::Cancelled);
                }
                mutate(&mut resource);
                self.client.apply(&gvr, &resource).await?;
                count += 1;
            }
            tracing::debug!(category, type_ = %gvr, "modified resources in category");
        }
        Ok(count)
    }

    /// Add the pause annotation to every instance in the category.
    pub async fn pause(&self, category: &str) -> Result<usize> {
        self.modify_resources(category, |r| r.add_annotation(PAUSED_ANNOTATION, "true"))
            .await
    }

    /// Remove the pause annotation from every instance in the category.
    pub async fn unpause(&self, category: &str) -> Result<usize> {
        self.modify_resources(category, |r| {
            r.remove_annotation(PAUSED_ANNOTATION);
        })
        .await
    }
}
