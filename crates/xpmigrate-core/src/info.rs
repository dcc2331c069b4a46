//! Control plane identity collection.
//!
//! The control plane describes itself through its own Deployment: version
//! and distribution come from well-known labels, feature flags from the
//! container arguments.

use crate::client::DeploymentReader;
use crate::error::Result;
use crate::meta::ControlPlaneInfo;
use crate::resource::Resource;
use serde_json::Value;

/// Name of the Deployment that runs the control plane.
pub const CROSSPLANE_DEPLOYMENT: &str = "crossplane";

const CONTAINER_NAMES: &[&str] = &["crossplane", "universal-crossplane"];
const VERSION_LABEL: &str = "app.kubernetes.io/version";
const DISTRIBUTION_LABEL: &str = "app.kubernetes.io/instance";
const FEATURE_FLAG_PREFIX: &str = "--enable";

/// Read version, distribution, namespace and feature flags from the control
/// plane's Deployment, found by name in any namespace.
pub async fn collect_info(reader: &dyn DeploymentReader) -> Result<ControlPlaneInfo> {
    let deployments = reader.list_deployments().await?;
    let mut info = ControlPlaneInfo::default();

    for deployment in &deployments {
        if deployment.name() != CROSSPLANE_DEPLOYMENT {
            continue;
        }
        info.namespace = deployment.namespace().unwrap_or("").to_string();
        info.version = deployment.label(VERSION_LABEL).unwrap_or("").to_string();
        info.distribution = deployment
            .label(DISTRIBUTION_LABEL)
            .unwrap_or("")
            .to_string();
        info.feature_flags = feature_flags(deployment);
        break;
    }

    Ok(info)
}

fn feature_flags(deployment: &Resource) -> Vec<String> {
    let Some(containers) = deployment
        .field(&["spec", "template", "spec", "containers"])
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    for container in containers {
        let name = container.get("name").and_then(Value::as_str).unwrap_or("");
        if !CONTAINER_NAMES.contains(&name) {
            continue;
        }
        return container
            .get("args")
            .and_then(Value::as_array)
            .map(|args| {
                args.iter()
                    .filter_map(Value::as_str)
                    .filter(|a| a.starts_with(FEATURE_FLAG_PREFIX))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
    }

    Vec::new()
}
