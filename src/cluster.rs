use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client};

use crate::error::ProbeError;

/* ============================= TRAIT ============================= */

/// Cluster operations the provisioning check needs.
///
/// `get_*` return `Ok(None)` when the object does not exist (yet), so the
/// poller can tell "not created" apart from a real API failure.
#[async_trait]
pub trait ProvisioningClient: Send + Sync {
    async fn create_namespace(&self, namespace: Namespace) -> Result<(), ProbeError>;

    /// Delete a namespace. A namespace that is already gone is not an error.
    async fn delete_namespace(&self, name: &str) -> Result<(), ProbeError>;

    async fn create_claim(&self, namespace: &str, claim: PersistentVolumeClaim) -> Result<(), ProbeError>;

    async fn get_claim(&self, namespace: &str, name: &str) -> Result<Option<PersistentVolumeClaim>, ProbeError>;

    async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<(), ProbeError>;

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ProbeError>;

    async fn get_volume(&self, name: &str) -> Result<Option<PersistentVolume>, ProbeError>;

    async fn list_storage_classes(&self) -> Result<Vec<StorageClass>, ProbeError>;

    async fn list_nodes(&self) -> Result<Vec<Node>, ProbeError>;

    /// An owned handle that can still delete the probe namespace after the
    /// future borrowing `self` has been dropped. `None` means an abandoned
    /// run leaks its namespace.
    fn detached(&self) -> Option<Arc<dyn ProvisioningClient>> {
        None
    }
}

/* ============================= KUBE CLIENT ============================= */

/// `ProvisioningClient` backed by a live `kube::Client`.
#[derive(Clone)]
pub struct KubeProvisioningClient {
    client: Client,
}

impl KubeProvisioningClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build from the local kubeconfig or in-cluster service account.
    pub async fn try_default() -> Result<Self, ProbeError> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ProvisioningClient for KubeProvisioningClient {
    async fn create_namespace(&self, namespace: Namespace) -> Result<(), ProbeError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.create(&PostParams::default(), &namespace).await?;
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), ProbeError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.delete(name, &DeleteParams::background()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_claim(&self, namespace: &str, claim: PersistentVolumeClaim) -> Result<(), ProbeError> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), &claim).await?;
        Ok(())
    }

    async fn get_claim(&self, namespace: &str, name: &str) -> Result<Option<PersistentVolumeClaim>, ProbeError> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<(), ProbeError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), &pod).await?;
        Ok(())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ProbeError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_volume(&self, name: &str) -> Result<Option<PersistentVolume>, ProbeError> {
        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    async fn list_storage_classes(&self) -> Result<Vec<StorageClass>, ProbeError> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ProbeError> {
        let api: Api<Node> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    fn detached(&self) -> Option<Arc<dyn ProvisioningClient>> {
        Some(Arc::new(self.clone()))
    }
}
