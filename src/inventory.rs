use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::storage::v1::StorageClass;
use serde::Serialize;
use tracing::info;

use crate::cluster::ProvisioningClient;
use crate::eligibility::is_default_annotated;
use crate::error::ProbeError;

/* ============================= TYPES ============================= */

/// Snapshot of a StorageClass as far as provisioning eligibility cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageClassInfo {
    pub name: String,
    pub provisioner: String,
    pub is_default: bool,
}

impl StorageClassInfo {
    pub fn new(name: impl Into<String>, provisioner: impl Into<String>, is_default: bool) -> Self {
        Self {
            name: name.into(),
            provisioner: provisioner.into(),
            is_default,
        }
    }
}

impl From<&StorageClass> for StorageClassInfo {
    fn from(sc: &StorageClass) -> Self {
        let is_default = sc
            .metadata
            .annotations
            .as_ref()
            .is_some_and(is_default_annotated);

        Self {
            name: sc.metadata.name.clone().unwrap_or_default(),
            provisioner: sc.provisioner.clone(),
            is_default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub name: String,
    pub schedulable: bool,
}

impl NodeInfo {
    pub fn new(name: impl Into<String>, schedulable: bool) -> Self {
        Self {
            name: name.into(),
            schedulable,
        }
    }
}

impl From<&Node> for NodeInfo {
    fn from(node: &Node) -> Self {
        let unschedulable = node
            .spec
            .as_ref()
            .and_then(|s| s.unschedulable)
            .unwrap_or(false);

        Self {
            name: node.metadata.name.clone().unwrap_or_default(),
            schedulable: !unschedulable,
        }
    }
}

/// Read-only inventory handed to the provisioning check once per run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInventory {
    pub nodes: Vec<NodeInfo>,
    pub storage_classes: Vec<StorageClassInfo>,
}

/* ============================= COLLECTION ============================= */

/// Collect the node and StorageClass snapshot the provisioning check needs.
///
/// Callers that already hold a full inventory should convert it with the
/// `From` impls instead of listing again.
pub async fn collect<C>(client: &C) -> Result<ClusterInventory, ProbeError>
where
    C: ProvisioningClient + ?Sized,
{
    let nodes: Vec<NodeInfo> = client.list_nodes().await?.iter().map(NodeInfo::from).collect();
    let storage_classes = collect_storage_classes(client).await?;

    info!(
        nodes = nodes.len(),
        storage_classes = storage_classes.len(),
        "inventory_collected"
    );

    Ok(ClusterInventory {
        nodes,
        storage_classes,
    })
}

pub async fn collect_storage_classes<C>(client: &C) -> Result<Vec<StorageClassInfo>, ProbeError>
where
    C: ProvisioningClient + ?Sized,
{
    let mut classes: Vec<StorageClassInfo> = client
        .list_storage_classes()
        .await?
        .iter()
        .map(StorageClassInfo::from)
        .collect();
    classes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(classes)
}

/* ============================= TESTS ============================= */
