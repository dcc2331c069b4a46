//! In-memory mock cluster for testing and development.
//!
//! Implements every injected client seam over shared state so the export and
//! import pipelines can be exercised end to end without a live control
//! plane. Applies and condition changes are recorded as an ordered event log
//! so tests can assert on replay ordering.

use crate::client::{
    CategoryDiscovery, DeploymentReader, DynamicClient, ListOptions, ResourcePage, RestMapper,
};
use crate::error::{ClientError, Result};
use crate::resource::{GroupVersionResource, Resource};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct ClusterState {
    resources: HashMap<GroupVersionResource, Vec<Resource>>,
    categories: HashMap<String, Vec<GroupVersionResource>>,
    kind_mappings: HashMap<(String, String), GroupVersionResource>,
    resource_mappings: HashMap<String, GroupVersionResource>,
    pending_kind_mappings: HashMap<(String, String), GroupVersionResource>,
    pending_resource_mappings: HashMap<String, GroupVersionResource>,
    deployments: Vec<Resource>,
    list_failures: HashMap<String, usize>,
    events: Vec<String>,
    reset_count: usize,
}

/// Mock cluster backed by in-memory maps.
#[derive(Default)]
pub struct MockCluster {
    state: RwLock<ClusterState>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object of the given type.
    pub async fn insert(&self, gvr: &GroupVersionResource, resource: Resource) {
        let mut state = self.state.write().await;
        state.resources.entry(gvr.clone()).or_default().push(resource);
    }

    /// Make a type resolvable through the mapper, by kind and by resource
    /// plural.
    pub async fn register_type(&self, gvr: &GroupVersionResource, kind: &str) {
        let mut state = self.state.write().await;
        state
            .kind_mappings
            .insert((gvr.group.clone(), kind.to_string()), gvr.clone());
        state
            .resource_mappings
            .insert(gvr.group_resource().to_string(), gvr.clone());
    }

    /// Stage a mapping that only becomes visible after a mapper reset, the
    /// way a type installed by a package or definition would.
    pub async fn register_type_after_reset(&self, gvr: &GroupVersionResource, kind: &str) {
        let mut state = self.state.write().await;
        state
            .pending_kind_mappings
            .insert((gvr.group.clone(), kind.to_string()), gvr.clone());
        state
            .pending_resource_mappings
            .insert(gvr.group_resource().to_string(), gvr.clone());
    }

    /// Advertise a type under a category for live discovery.
    pub async fn register_category(&self, category: &str, gvr: &GroupVersionResource) {
        let mut state = self.state.write().await;
        state
            .categories
            .entry(category.to_string())
            .or_default()
            .push(gvr.clone());
    }

    pub async fn set_deployments(&self, deployments: Vec<Resource>) {
        self.state.write().await.deployments = deployments;
    }

    /// Make the next `times` list calls for the type fail.
    pub async fn fail_lists(&self, gvr: &GroupVersionResource, times: usize) {
        self.state
            .write()
            .await
            .list_failures
            .insert(gvr.group_resource().to_string(), times);
    }

    /// Set a status condition on a stored object and record the transition
    /// in the event log.
    pub async fn set_condition(
        &self,
        gvr: &GroupVersionResource,
        name: &str,
        condition: &str,
        met: bool,
    ) {
        let mut state = self.state.write().await;
        if let Some(items) = state.resources.get_mut(gvr) {
            for item in items.iter_mut() {
                if item.name() != name {
                    continue;
                }
                set_condition_value(item, condition, met);
            }
        }
        state.events.push(format!(
            "condition {}/{} {}={}",
            gvr.group_resource(),
            name,
            condition,
            if met { "True" } else { "False" }
        ));
    }

    /// All stored objects of a type.
    pub async fn resources(&self, gvr: &GroupVersionResource) -> Vec<Resource> {
        self.state
            .read()
            .await
            .resources
            .get(gvr)
            .cloned()
            .unwrap_or_default()
    }

    /// Look up a stored object by namespace and name.
    pub async fn find(
        &self,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<Resource> {
        self.state.read().await.resources.get(gvr).and_then(|items| {
            items
                .iter()
                .find(|r| r.name() == name && r.namespace() == namespace)
                .cloned()
        })
    }

    /// Ordered log of applies, status writes, condition transitions and
    /// mapper resets.
    pub async fn events(&self) -> Vec<String> {
        self.state.read().await.events.clone()
    }

    pub async fn reset_count(&self) -> usize {
        self.state.read().await.reset_count
    }
}

fn set_condition_value(resource: &mut Resource, condition: &str, met: bool) {
    let mut value = resource.clone().into_value();
    if let Some(root) = value.as_object_mut() {
        let status = root
            .entry("status")
            .or_insert_with(|| json!({"conditions": []}));
        if let Some(status) = status.as_object_mut() {
            let conditions = status
                .entry("conditions")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Some(conditions) = conditions.as_array_mut() {
                conditions.retain(|c| c.get("type").and_then(Value::as_str) != Some(condition));
                conditions.push(json!({
                    "type": condition,
                    "status": if met { "True" } else { "False" },
                }));
            }
        }
    }
    *resource = Resource::new(value);
}

#[async_trait]
impl DynamicClient for MockCluster {
    async fn list(&self, gvr: &GroupVersionResource, opts: &ListOptions) -> Result<ResourcePage> {
        let mut state = self.state.write().await;
        let target = gvr.group_resource().to_string();
        if let Some(remaining) = state.list_failures.get_mut(&target) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ClientError::request("list", target, "injected list failure"));
            }
        }

        let items = state.resources.get(gvr).cloned().unwrap_or_default();
        let start = opts
            .continue_token
            .as_deref()
            .and_then(|t| t.parse::<usize>().ok())
            .unwrap_or(0);
        if opts.limit == 0 || start + opts.limit >= items.len() {
            return Ok(ResourcePage {
                items: items.into_iter().skip(start).collect(),
                continue_token: None,
            });
        }
        let end = start + opts.limit;
        Ok(ResourcePage {
            items: items[start..end].to_vec(),
            continue_token: Some(end.to_string()),
        })
    }

    async fn apply(&self, gvr: &GroupVersionResource, resource: &Resource) -> Result<()> {
        let mut state = self.state.write().await;
        let entry = state.resources.entry(gvr.clone()).or_default();
        let key = (
            resource.namespace().map(str::to_string),
            resource.name().to_string(),
        );
        match entry.iter_mut().find(|r| {
            (r.namespace().map(str::to_string), r.name().to_string()) == key
        }) {
            Some(existing) => *existing = resource.clone(),
            None => entry.push(resource.clone()),
        }
        state
            .events
            .push(format!("apply {}/{}", gvr.group_resource(), resource.name()));
        Ok(())
    }

    async fn apply_status(&self, gvr: &GroupVersionResource, resource: &Resource) -> Result<()> {
        let mut state = self.state.write().await;
        let target = gvr.group_resource().to_string();
        let name = resource.name().to_string();
        let namespace = resource.namespace().map(str::to_string);
        let status = resource.status().cloned();
        let Some(items) = state.resources.get_mut(gvr) else {
            return Err(ClientError::request("apply-status", target, "no such type"));
        };
        let existing = items.iter_mut().find(|r| {
            r.name() == name && r.namespace().map(str::to_string) == namespace
        });
        match (existing, status) {
            (Some(existing), Some(status)) => {
                let mut value = existing.clone().into_value();
                if let Some(root) = value.as_object_mut() {
                    root.insert("status".to_string(), status);
                }
                *existing = Resource::new(value);
            }
            (Some(_), None) => {}
            (None, _) => {
                return Err(ClientError::request("apply-status", target, "object not found"));
            }
        }
        state.events.push(format!("status {}/{}", target, name));
        Ok(())
    }
}

#[async_trait]
impl CategoryDiscovery for MockCluster {
    async fn resources_in_category(&self, category: &str) -> Result<Vec<GroupVersionResource>> {
        Ok(self
            .state
            .read()
            .await
            .categories
            .get(category)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl RestMapper for MockCluster {
    async fn kind_to_resource(
        &self,
        group: &str,
        kind: &str,
        _version: Option<&str>,
    ) -> Result<GroupVersionResource> {
        self.state
            .read()
            .await
            .kind_mappings
            .get(&(group.to_string(), kind.to_string()))
            .cloned()
            .ok_or_else(|| ClientError::NoMapping {
                name: format!("{kind}.{group}"),
            })
    }

    async fn resource_to_gvr(&self, group_resource: &str) -> Result<GroupVersionResource> {
        self.state
            .read()
            .await
            .resource_mappings
            .get(group_resource)
            .cloned()
            .ok_or_else(|| ClientError::NoMapping {
                name: group_resource.to_string(),
            })
    }

    async fn reset(&self) {
        let mut state = self.state.write().await;
        let pending_kinds: Vec<_> = state.pending_kind_mappings.drain().collect();
        for (key, gvr) in pending_kinds {
            state.kind_mappings.insert(key, gvr);
        }
        let pending_resources: Vec<_> = state.pending_resource_mappings.drain().collect();
        for (key, gvr) in pending_resources {
            state.resource_mappings.insert(key, gvr);
        }
        state.reset_count += 1;
        state.events.push("mapper-reset".to_string());
    }
}

#[async_trait]
impl DeploymentReader for MockCluster {
    async fn list_deployments(&self) -> Result<Vec<Resource>> {
        Ok(self.state.read().await.deployments.clone())
    }
}
