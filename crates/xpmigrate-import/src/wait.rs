//! Readiness barriers between import tiers.

use crate::error::WaitError;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use xpmigrate_core::{list_all, DynamicClient, GroupKind, RestMapper, DEFAULT_PAGE_SIZE};

/// Deadline for each readiness barrier.
pub const BARRIER_TIMEOUT: Duration = Duration::from_secs(600);

/// Interval between readiness polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls all instances of a kind until every requested condition reports
/// `True` on every instance, or the deadline expires.
///
/// Transient list errors are logged and retried until the deadline. A kind
/// with zero instances satisfies the barrier immediately.
pub struct ConditionWaiter<'a> {
    client: &'a dyn DynamicClient,
    mapper: &'a dyn RestMapper,
    timeout: Duration,
    poll_interval: Duration,
    cancellation: CancellationToken,
}

impl<'a> ConditionWaiter<'a> {
    pub fn new(client: &'a dyn DynamicClient, mapper: &'a dyn RestMapper) -> Self {
        Self {
            client,
            mapper,
            timeout: BARRIER_TIMEOUT,
            poll_interval: POLL_INTERVAL,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Block until every instance of `gk` has all of `conditions` with
    /// status `True`.
    pub async fn wait_for_conditions(
        &self,
        gk: &GroupKind,
        conditions: &[&str],
    ) -> Result<(), WaitError> {
        let gvr = self
            .mapper
            .kind_to_resource(&gk.group, &gk.kind, None)
            .await
            .map_err(|e| WaitError::Mapping {
                kind: gk.to_string(),
                source: e,
            })?;

        let start = Instant::now();
        loop {
            if self.cancellation.is_cancelled() {
                return Err(WaitError::Cancelled);
            }

            match list_all(self.client, &gvr, DEFAULT_PAGE_SIZE).await {
                Ok(instances) => {
                    let unmet = instances
                        .iter()
                        .filter(|instance| {
                            conditions
                                .iter()
                                .any(|condition| !instance.condition_is_true(condition))
                        })
                        .count();
                    if unmet == 0 {
                        tracing::debug!(
                            kind = %gk,
                            instances = instances.len(),
                            elapsed = ?start.elapsed(),
                            "readiness conditions satisfied"
                        );
                        return Ok(());
                    }
                    tracing::debug!(kind = %gk, unmet, "waiting for readiness conditions");
                }
                Err(e) => {
                    tracing::warn!(kind = %gk, error = %e, "cannot list instances, will retry");
                }
            }

            if start.elapsed() >= self.timeout {
                return Err(WaitError::DeadlineExceeded {
                    kind: gk.kind.clone(),
                    conditions: join_conditions(conditions),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn join_conditions(conditions: &[&str]) -> String {
    match conditions {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} and {second}"),
        [head @ .., last] => format!("{}, and {last}", head.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use xpmigrate_core::{GroupVersionResource, MockCluster, Resource};

    fn providers_gvr() -> GroupVersionResource {
        GroupVersionResource::new("pkg.crossplane.io", "v1", "providers")
    }

    fn provider(name: &str) -> Resource {
        Resource::new(json!({
            "apiVersion": "pkg.crossplane.io/v1",
            "kind": "Provider",
            "metadata": {"name": name}
        }))
    }

    async fn cluster_with_provider_type() -> MockCluster {
        let cluster = MockCluster::new();
        cluster.register_type(&providers_gvr(), "Provider").await;
        cluster
    }

    fn fast_waiter<'a>(cluster: &'a MockCluster, timeout: Duration) -> ConditionWaiter<'a> {
        ConditionWaiter::new(cluster, cluster)
            .with_timeout(timeout)
            .with_poll_interval(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_zero_instances_succeed_immediately() {
        let cluster = cluster_with_provider_type().await;
        let waiter = fast_waiter(&cluster, Duration::from_millis(200));
        waiter
            .wait_for_conditions(
                &GroupKind::new("pkg.crossplane.io", "Provider"),
                &["Installed", "Healthy"],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_until_conditions_met() {
        let cluster = Arc::new(cluster_with_provider_type().await);
        cluster.insert(&providers_gvr(), provider("p1")).await;

        let background = Arc::clone(&cluster);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            background
                .set_condition(&providers_gvr(), "p1", "Installed", true)
                .await;
            background
                .set_condition(&providers_gvr(), "p1", "Healthy", true)
                .await;
        });

        let waiter = fast_waiter(&cluster, Duration::from_secs(5));
        waiter
            .wait_for_conditions(
                &GroupKind::new("pkg.crossplane.io", "Provider"),
                &["Installed", "Healthy"],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let cluster = cluster_with_provider_type().await;
        cluster.insert(&providers_gvr(), provider("p1")).await;

        let waiter = fast_waiter(&cluster, Duration::from_millis(100));
        let err = waiter
            .wait_for_conditions(
                &GroupKind::new("pkg.crossplane.io", "Provider"),
                &["Installed", "Healthy"],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::DeadlineExceeded { .. }));
        assert!(err.to_string().contains("Installed and Healthy"));
    }

    #[tokio::test]
    async fn test_transient_list_error_is_retried() {
        let cluster = cluster_with_provider_type().await;
        cluster.insert(&providers_gvr(), provider("p1")).await;
        cluster
            .set_condition(&providers_gvr(), "p1", "Healthy", true)
            .await;
        cluster.fail_lists(&providers_gvr(), 1).await;

        let waiter = fast_waiter(&cluster, Duration::from_secs(5));
        waiter
            .wait_for_conditions(&GroupKind::new("pkg.crossplane.io", "Provider"), &["Healthy"])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_kind_fails_mapping() {
        let cluster = MockCluster::new();
        let waiter = fast_waiter(&cluster, Duration::from_millis(100));
        let err = waiter
            .wait_for_conditions(&GroupKind::new("pkg.crossplane.io", "Provider"), &["Healthy"])
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Mapping { .. }));
    }

    #[test]
    fn test_join_conditions() {
        assert_eq!(join_conditions(&[]), "");
        assert_eq!(join_conditions(&["Established"]), "Established");
        assert_eq!(
            join_conditions(&["Installed", "Healthy"]),
            "Installed and Healthy"
        );
        assert_eq!(
            join_conditions(&["A", "B", "C"]),
            "A, B, and C"
        );
    }
}
