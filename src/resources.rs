use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::{
    Capabilities, Container, Namespace, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PersistentVolumeClaimVolumeSource, Pod, PodSpec, ResourceRequirements, SecurityContext,
    Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::{info, warn};

use crate::cluster::ProvisioningClient;
use crate::error::ProbeError;

/* ============================= CONSTANTS ============================= */

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "kube-preflight";
pub const PROBE_CONTAINER_NAME: &str = "pv-check-container";
pub const PROBE_VOLUME_NAME: &str = "pvc-volume";
pub const PROBE_MOUNT_PATH: &str = "/test";

/* ============================= BUILDERS ============================= */

fn managed_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string())])
}

pub fn build_namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(managed_labels()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Single-writer claim with no `storageClassName`, so the cluster default
/// class is the one exercised.
pub fn build_claim(claim_name: &str, size: &str) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(claim_name.to_string()),
            labels: Some(managed_labels()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(ResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(size.to_string()),
                )])),
                ..Default::default()
            }),
            storage_class_name: None,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Minimal unprivileged pod mounting the claim. No node selector or
/// affinity: placement is left to the scheduler.
pub fn build_pod(pod_name: &str, claim_name: &str, image: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(pod_name.to_string()),
            labels: Some(managed_labels()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            restart_policy: Some("Never".to_string()),
            containers: vec![Container {
                name: PROBE_CONTAINER_NAME.to_string(),
                image: Some(image.to_string()),
                security_context: Some(SecurityContext {
                    allow_privilege_escalation: Some(false),
                    privileged: Some(false),
                    capabilities: Some(Capabilities {
                        drop: Some(vec!["ALL".to_string()]),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                volume_mounts: Some(vec![VolumeMount {
                    name: PROBE_VOLUME_NAME.to_string(),
                    mount_path: PROBE_MOUNT_PATH.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            volumes: Some(vec![Volume {
                name: PROBE_VOLUME_NAME.to_string(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: claim_name.to_string(),
                    read_only: None,
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/* ============================= MANAGER ============================= */

/// Creates and removes the throwaway objects used by the active probe.
///
/// Deleting the namespace cascades to the claim and pod, so cleanup is a
/// single call.
pub struct ProvisioningResourceManager<'a, C: ProvisioningClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: ProvisioningClient + ?Sized> ProvisioningResourceManager<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    pub async fn create_probe_environment(&self, namespace: &str) -> Result<(), ProbeError> {
        self.client.create_namespace(build_namespace(namespace)).await?;
        info!(namespace, "probe_namespace_created");
        Ok(())
    }

    pub async fn create_probe_claim(
        &self,
        namespace: &str,
        claim_name: &str,
        size: &str,
    ) -> Result<(), ProbeError> {
        self.client
            .create_claim(namespace, build_claim(claim_name, size))
            .await?;
        info!(namespace, claim = claim_name, size, "probe_claim_created");
        Ok(())
    }

    pub async fn create_probe_pod(
        &self,
        namespace: &str,
        pod_name: &str,
        claim_name: &str,
        image: &str,
    ) -> Result<(), ProbeError> {
        self.client
            .create_pod(namespace, build_pod(pod_name, claim_name, image))
            .await?;
        info!(namespace, pod = pod_name, claim = claim_name, "probe_pod_created");
        Ok(())
    }

    pub async fn delete_probe_environment(&self, namespace: &str) -> Result<(), ProbeError> {
        self.client.delete_namespace(namespace).await?;
        info!(namespace, "probe_namespace_deleted");
        Ok(())
    }
}

/* ============================= GUARD ============================= */

/// Deletes the probe namespace if the run is dropped before its own cleanup
/// completed. Drop cannot await, so the delete is spawned on the current
/// runtime through the client's detached handle.
pub struct ProbeEnvironmentGuard {
    namespace: String,
    client: Option<Arc<dyn ProvisioningClient>>,
    armed: bool,
}

impl ProbeEnvironmentGuard {
    pub fn new<C: ProvisioningClient + ?Sized>(client: &C, namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            client: client.detached(),
            armed: true,
        }
    }

    /// Call once the inline cleanup has run.
    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ProbeEnvironmentGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let namespace = std::mem::take(&mut self.namespace);

        let client = self.client.take();
        let runtime = tokio::runtime::Handle::try_current();
        let (Some(client), Ok(runtime)) = (client, runtime) else {
            warn!(namespace = %namespace, "probe_namespace_leaked");
            return;
        };

        warn!(namespace = %namespace, "probe_run_abandoned");
        runtime.spawn(async move {
            match client.delete_namespace(&namespace).await {
                Ok(()) => info!(namespace = %namespace, "probe_namespace_deleted"),
                Err(e) => warn!(namespace = %namespace, error = %e, "probe_namespace_delete_failed"),
            }
        });
    }
}

/* ============================= TESTS ============================= */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_is_labelled() {
        let ns = build_namespace("kube-preflight-pv-check-1");
        assert_eq!(ns.metadata.name.as_deref(), Some("kube-preflight-pv-check-1"));
        let labels = ns.metadata.labels.unwrap();
        assert_eq!(labels.get(MANAGED_BY_LABEL).map(String::as_str), Some(MANAGED_BY_VALUE));
    }

    #[test]
    fn test_claim_uses_default_storage_class() {
        let claim = build_claim("probe-pvc", "5Gi");
        let spec = claim.spec.unwrap();
        assert!(spec.storage_class_name.is_none());
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteOnce".to_string()]));

        let requests = spec.resources.unwrap().requests.unwrap();
        assert_eq!(requests.get("storage"), Some(&Quantity("5Gi".to_string())));
    }

    #[test]
    fn test_pod_mounts_claim() {
        let pod = build_pod("probe-pod", "probe-pvc", "registry.k8s.io/pause:3.9");
        let spec = pod.spec.unwrap();

        let volumes = spec.volumes.unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(
            volumes[0].persistent_volume_claim.as_ref().unwrap().claim_name,
            "probe-pvc"
        );

        assert_eq!(spec.containers.len(), 1);
        let mounts = spec.containers[0].volume_mounts.as_ref().unwrap();
        assert_eq!(mounts[0].name, PROBE_VOLUME_NAME);
        assert_eq!(mounts[0].mount_path, PROBE_MOUNT_PATH);
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
    }

    #[test]
    fn test_pod_is_unprivileged_and_unpinned() {
        let pod = build_pod("probe-pod", "probe-pvc", "registry.k8s.io/pause:3.9");
        let spec = pod.spec.unwrap();

        assert!(spec.node_name.is_none());
        assert!(spec.node_selector.is_none());
        assert!(spec.affinity.is_none());

        let sc = spec.containers[0].security_context.as_ref().unwrap();
        assert_eq!(sc.allow_privilege_escalation, Some(false));
        assert_eq!(sc.privileged, Some(false));
        assert_eq!(
            sc.capabilities.as_ref().unwrap().drop,
            Some(vec!["ALL".to_string()])
        );
    }
}
