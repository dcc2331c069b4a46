//! Export orchestration.

use crate::config::ExportOptions;
use crate::error::{ExportError, Result};
use crate::fetch::ResourceFetcher;
use crate::selector::SchemaSelector;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use xpmigrate_archive::{pack, Persister};
use xpmigrate_core::{
    collect_info, CategoryDiscovery, CategoryModifier, DeploymentReader, DynamicClient,
    ExportManifest, RestMapper, CATEGORY_MANAGED,
};

/// Exports the complete user-defined state of a control plane into a
/// self-contained archive.
///
/// The sequence is fixed: pause (optional) → discover and select types →
/// per-type fetch and persist → native resources → manifest → archive. Any
/// failure aborts without leaving an output archive; the staging directory
/// is removed on every path.
pub struct StateExporter<'a> {
    client: &'a dyn DynamicClient,
    discovery: &'a dyn CategoryDiscovery,
    mapper: &'a dyn RestMapper,
    deployments: &'a dyn DeploymentReader,
    options: ExportOptions,
    cancellation: CancellationToken,
}

impl<'a> StateExporter<'a> {
    pub fn new(
        client: &'a dyn DynamicClient,
        discovery: &'a dyn CategoryDiscovery,
        mapper: &'a dyn RestMapper,
        deployments: &'a dyn DeploymentReader,
        options: ExportOptions,
    ) -> Self {
        Self {
            client,
            discovery,
            mapper,
            deployments,
            options,
            cancellation: CancellationToken::new(),
        }
    }

    /// Honor the given token at every suspension point.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Run the export. Returns the manifest that was written into the
    /// archive.
    pub async fn export(&self) -> Result<ExportManifest> {
        // Staging directory for the state tree; dropped (and removed) on
        // every exit path.
        let staging = tempfile::tempdir().map_err(ExportError::Staging)?;
        let persister = Persister::new(staging.path());

        if self.options.pause_before_export {
            let modifier = CategoryModifier::new(self.client, self.discovery)
                .with_cancellation(self.cancellation.clone());
            let paused = modifier
                .pause(CATEGORY_MANAGED)
                .await
                .map_err(ExportError::Pause)?;
            tracing::info!(count = paused, "paused managed resources");
        }

        let selector = SchemaSelector::new(self.client, self.mapper, &self.options);
        let selections = selector.select_custom_types().await?;

        let fetcher = ResourceFetcher::new(self.client, &self.options)
            .with_cancellation(self.cancellation.clone());

        let mut custom_counts = BTreeMap::new();
        for selection in &selections {
            self.check_cancelled()?;
            let gr = selection.gvr.group_resource();
            let resources = fetcher.fetch_resources(&selection.gvr).await?;
            persister.persist_descriptor(&gr, &selection.descriptor)?;
            for resource in &resources {
                persister.persist_resource(&gr, resource)?;
            }
            tracing::debug!(type_ = %gr, count = resources.len(), "exported custom resources");
            custom_counts.insert(gr.to_string(), resources.len());
        }

        let mut native_counts = BTreeMap::new();
        for name in self.options.native_resources() {
            self.check_cancelled()?;
            let gvr = self
                .mapper
                .resource_to_gvr(&name)
                .await
                .map_err(|e| ExportError::Mapping {
                    name: name.clone(),
                    source: e,
                })?;
            let gr = gvr.group_resource();
            let resources = fetcher.fetch_resources(&gvr).await?;
            for resource in &resources {
                persister.persist_resource(&gr, resource)?;
            }
            tracing::debug!(type_ = %gr, count = resources.len(), "exported native resources");
            native_counts.insert(gvr.resource.clone(), resources.len());
        }

        let info = collect_info(self.deployments)
            .await
            .map_err(ExportError::Info)?;
        let mut manifest = ExportManifest::new(info, self.options.manifest_options());
        manifest.native_counts = native_counts;
        manifest.custom_counts = custom_counts;
        persister.persist_manifest(&manifest)?;

        self.check_cancelled()?;
        pack(staging.path(), &self.options.output_archive).await?;

        tracing::info!(
            archive = %self.options.output_archive.display(),
            total = manifest.total(),
            "exported control plane state"
        );
        Ok(manifest)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        Ok(())
    }
}
