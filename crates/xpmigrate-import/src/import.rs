//! Import orchestration.

use crate::apply::ResourceApplier;
use crate::config::ImportOptions;
use crate::error::{ImportError, PreflightError, Result};
use crate::wait::{ConditionWaiter, BARRIER_TIMEOUT, POLL_INTERVAL};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use xpmigrate_archive::ArchiveFs;
use xpmigrate_core::{
    collect_info, CategoryDiscovery, CategoryModifier, DeploymentReader, DynamicClient, GroupKind,
    RestMapper, CATEGORY_CLAIM, CATEGORY_COMPOSITE, CATEGORY_MANAGED,
};

/// Types imported before everything else, in exactly this order. They are
/// the types nothing else can exist without: core native resources, then
/// the control plane's runtime, composition and package machinery.
pub const BASE_RESOURCES: &[&str] = &[
    // Core native resources
    "namespaces",
    "configmaps",
    "secrets",
    // Runtime configuration
    "controllerconfigs.pkg.crossplane.io",
    "deploymentruntimeconfigs.pkg.crossplane.io",
    "storeconfigs.secrets.crossplane.io",
    // Compositions
    "compositionrevisions.apiextensions.crossplane.io",
    "compositions.apiextensions.crossplane.io",
    "compositeresourcedefinitions.apiextensions.crossplane.io",
    // Packages
    "providers.pkg.crossplane.io",
    "functions.pkg.crossplane.io",
    "configurations.pkg.crossplane.io",
];

/// Whether a type directory belongs to the base tier.
pub fn is_base_resource(group_resource: &str) -> bool {
    BASE_RESOURCES.contains(&group_resource)
}

/// Imports a state archive into a target control plane.
///
/// The replay order is fixed: base tier → readiness barriers for
/// definitions, packages and package revisions → mapper reset → remainder
/// tier → selective unpause. Applies are not transactional across objects;
/// a failure mid-import leaves partial state, but everything applied so far
/// is still paused.
pub struct StateImporter<'a> {
    client: &'a dyn DynamicClient,
    discovery: &'a dyn CategoryDiscovery,
    mapper: &'a dyn RestMapper,
    deployments: &'a dyn DeploymentReader,
    options: ImportOptions,
    barrier_timeout: Duration,
    poll_interval: Duration,
    cancellation: CancellationToken,
}

impl<'a> StateImporter<'a> {
    pub fn new(
        client: &'a dyn DynamicClient,
        discovery: &'a dyn CategoryDiscovery,
        mapper: &'a dyn RestMapper,
        deployments: &'a dyn DeploymentReader,
        options: ImportOptions,
    ) -> Self {
        Self {
            client,
            discovery,
            mapper,
            deployments,
            options,
            barrier_timeout: BARRIER_TIMEOUT,
            poll_interval: POLL_INTERVAL,
            cancellation: CancellationToken::new(),
        }
    }

    /// Override the readiness barrier deadline and poll interval.
    pub fn with_barrier_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.barrier_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Honor the given token at every suspension point.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Unpack the input archive into memory. The returned filesystem feeds
    /// both [`StateImporter::preflight`] and [`StateImporter::import`], so
    /// the archive is read exactly once per run.
    pub async fn open_archive(&self) -> Result<ArchiveFs> {
        let archive = ArchiveFs::open(&self.options.input_archive).await?;
        tracing::debug!(
            archive = %self.options.input_archive.display(),
            files = archive.len(),
            "unpacked state archive"
        );
        Ok(archive)
    }

    /// Check compatibility between the archive and the target control
    /// plane. Every mismatch becomes one entry in the returned collection;
    /// the caller decides whether to proceed.
    pub async fn preflight(&self, archive: &ArchiveFs) -> Result<Vec<PreflightError>> {
        let observed = collect_info(self.deployments)
            .await
            .map_err(ImportError::Info)?;
        let manifest = archive.read_manifest()?;

        let mut issues = Vec::new();
        if observed.version != manifest.crossplane.version {
            issues.push(PreflightError::VersionMismatch {
                observed: observed.version.clone(),
                exported: manifest.crossplane.version.clone(),
            });
        }
        for flag in &manifest.crossplane.feature_flags {
            if !observed.feature_flags.contains(flag) {
                issues.push(PreflightError::MissingFeatureFlag { flag: flag.clone() });
            }
        }
        Ok(issues)
    }

    /// Replay the archived state onto the target control plane.
    pub async fn import(&self, archive: &ArchiveFs) -> Result<()> {
        // Validates the archive root up front: anything other than the
        // manifest and type directories is fatal.
        let directories = archive.type_directories()?;
        let applier = ResourceApplier::new(self.client);

        // Base tier, status subresource replay disabled.
        let mut base_total = 0;
        for group_resource in BASE_RESOURCES {
            self.check_cancelled()?;
            base_total += self
                .import_resources(archive, &applier, group_resource, false)
                .await?;
        }
        tracing::info!(count = base_total, "imported base resources");

        // Definitions must be established and packages installed and
        // healthy before anything that depends on them is applied.
        let waiter = ConditionWaiter::new(self.client, self.mapper)
            .with_timeout(self.barrier_timeout)
            .with_poll_interval(self.poll_interval)
            .with_cancellation(self.cancellation.clone());

        waiter
            .wait_for_conditions(
                &GroupKind::new("apiextensions.crossplane.io", "CompositeResourceDefinition"),
                &["Established"],
            )
            .await?;

        for kind in ["Provider", "Function", "Configuration"] {
            waiter
                .wait_for_conditions(
                    &GroupKind::new("pkg.crossplane.io", kind),
                    &["Installed", "Healthy"],
                )
                .await?;
        }

        // Package conditions alone are insufficient on control planes that
        // predate the revision-health fix; wait for the revisions too.
        for kind in ["ProviderRevision", "FunctionRevision", "ConfigurationRevision"] {
            waiter
                .wait_for_conditions(&GroupKind::new("pkg.crossplane.io", kind), &["Healthy"])
                .await?;
        }

        // Types introduced by the definitions and packages above are only
        // resolvable after dropping cached mappings.
        self.mapper.reset().await;

        // Remainder tier, status subresource replay per descriptor.
        let mut remainder_total = 0;
        for group_resource in &directories {
            if is_base_resource(group_resource) {
                continue;
            }
            self.check_cancelled()?;
            remainder_total += self
                .import_resources(archive, &applier, group_resource, true)
                .await?;
        }
        tracing::info!(count = remainder_total, "imported remaining resources");

        // Unpause the user-facing abstractions. Managed resources stay
        // paused unless the caller asked otherwise.
        let modifier = CategoryModifier::new(self.client, self.discovery)
            .with_cancellation(self.cancellation.clone());
        for category in [CATEGORY_COMPOSITE, CATEGORY_CLAIM] {
            let count = self.unpause(&modifier, category).await?;
            tracing::info!(category, count, "unpaused resources");
        }
        if self.options.unpause_after_import {
            let count = self.unpause(&modifier, CATEGORY_MANAGED).await?;
            tracing::info!(category = CATEGORY_MANAGED, count, "unpaused resources");
        }

        tracing::info!(
            total = base_total + remainder_total,
            "imported control plane state"
        );
        Ok(())
    }

    async fn import_resources(
        &self,
        archive: &ArchiveFs,
        applier: &ResourceApplier<'_>,
        group_resource: &str,
        status_enabled: bool,
    ) -> Result<usize> {
        let (descriptor, resources) = if archive.has_type(group_resource) {
            archive.read_type(group_resource)?
        } else {
            // A base resource with no directory in the archive.
            return Ok(0);
        };
        if resources.is_empty() {
            return Ok(0);
        }

        let gvr = self
            .mapper
            .resource_to_gvr(group_resource)
            .await
            .map_err(|e| ImportError::Mapping {
                name: group_resource.to_string(),
                source: e,
            })?;

        let count = resources.len();
        for resource in resources {
            self.check_cancelled()?;
            applier
                .apply(&gvr, resource, descriptor.as_ref(), status_enabled)
                .await
                .map_err(|e| ImportError::Import {
                    resource: group_resource.to_string(),
                    source: e,
                })?;
        }
        tracing::debug!(type_ = group_resource, count, "imported resources");
        Ok(count)
    }

    async fn unpause(&self, modifier: &CategoryModifier<'_>, category: &str) -> Result<usize> {
        modifier
            .unpause(category)
            .await
            .map_err(|e| ImportError::Unpause {
                category: category.to_string(),
                source: e,
            })
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        Ok(())
    }
}
