use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Namespace, Node, PersistentVolume, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PersistentVolumeClaimStatus, PersistentVolumeStatus, Pod, PodStatus,
};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube_preflight::cluster::ProvisioningClient;
use kube_preflight::error::ProbeError;
use kube_preflight::inventory::{NodeInfo, StorageClassInfo};

/* ============================= INVENTORY FIXTURES ============================= */

#[allow(dead_code)]
pub fn make_nodes(schedulable: &[bool]) -> Vec<NodeInfo> {
    schedulable
        .iter()
        .enumerate()
        .map(|(i, s)| NodeInfo::new(format!("node-{i}"), *s))
        .collect()
}

/// Three nodes, two schedulable, one default `standard` class on aws-ebs.
#[allow(dead_code)]
pub fn eligible_inventory() -> (Vec<NodeInfo>, Vec<StorageClassInfo>) {
    (
        make_nodes(&[true, true, false]),
        vec![StorageClassInfo::new("standard", "kubernetes.io/aws-ebs", true)],
    )
}

#[allow(dead_code)]
pub fn make_storage_class(name: &str, provisioner: &str, annotations: &[(&str, &str)]) -> StorageClass {
    StorageClass {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            annotations: Some(
                annotations
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        provisioner: provisioner.to_string(),
        ..Default::default()
    }
}

/* ============================= OBJECT FIXTURES ============================= */

#[allow(dead_code)]
pub fn claim(phase: &str, volume_name: Option<&str>) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        spec: Some(PersistentVolumeClaimSpec {
            volume_name: volume_name.map(str::to_string),
            ..Default::default()
        }),
        status: Some(PersistentVolumeClaimStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn pod(phase: &str) -> Pod {
    Pod {
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn volume(phase: &str) -> PersistentVolume {
    PersistentVolume {
        status: Some(PersistentVolumeStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/* ============================= MOCK CLIENT ============================= */

type Reply<T> = Result<Option<T>, ProbeError>;

/// Scripted cluster. Each `get_*` pops the next reply; the last reply
/// repeats forever so a "stuck" object stays stuck.
#[allow(dead_code)]
#[derive(Default)]
pub struct MockCluster {
    pub fail_create_namespace: Option<String>,
    pub fail_create_claim: Option<String>,
    pub fail_create_pod: Option<String>,
    pub fail_delete_namespace: Option<String>,
    pub panic_on_get_pod: bool,
    pub hang_on_get_volume: bool,
    pub hang_on_delete_namespace: bool,

    pub claims: Mutex<VecDeque<Reply<PersistentVolumeClaim>>>,
    pub pods: Mutex<VecDeque<Reply<Pod>>>,
    pub volume: Mutex<Option<Reply<PersistentVolume>>>,
    pub storage_classes: Vec<StorageClass>,
    pub nodes: Vec<Node>,

    pub calls: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim binds to `pv-probe`, pod runs, volume is Bound.
    pub fn healthy() -> Self {
        Self::new()
            .with_claims(vec![
                Ok(None),
                Ok(Some(claim("Pending", None))),
                Ok(Some(claim("Bound", Some("pv-probe")))),
            ])
            .with_pods(vec![Ok(Some(pod("Pending"))), Ok(Some(pod("Running")))])
            .with_volume(Ok(Some(volume("Bound"))))
    }

    pub fn with_claims(self, replies: Vec<Reply<PersistentVolumeClaim>>) -> Self {
        *self.claims.lock().unwrap() = replies.into();
        self
    }

    pub fn with_pods(self, replies: Vec<Reply<Pod>>) -> Self {
        *self.pods.lock().unwrap() = replies.into();
        self
    }

    pub fn with_volume(self, reply: Reply<PersistentVolume>) -> Self {
        *self.volume.lock().unwrap() = Some(reply);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn next<T: Clone>(queue: &Mutex<VecDeque<Reply<T>>>) -> Reply<T> {
        let mut q = queue.lock().unwrap();
        if q.len() > 1 {
            q.pop_front().unwrap()
        } else {
            q.front().cloned().unwrap_or(Ok(None))
        }
    }
}

#[allow(dead_code)]
fn fail_if(reason: &Option<String>) -> Result<(), ProbeError> {
    match reason {
        Some(r) => Err(ProbeError::api(r.clone())),
        None => Ok(()),
    }
}

#[async_trait]
impl ProvisioningClient for MockCluster {
    async fn create_namespace(&self, namespace: Namespace) -> Result<(), ProbeError> {
        self.record(format!("create_namespace {}", namespace.metadata.name.unwrap_or_default()));
        fail_if(&self.fail_create_namespace)
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), ProbeError> {
        self.record(format!("delete_namespace {name}"));
        if self.hang_on_delete_namespace {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        fail_if(&self.fail_delete_namespace)
    }

    async fn create_claim(&self, namespace: &str, claim: PersistentVolumeClaim) -> Result<(), ProbeError> {
        self.record(format!(
            "create_claim {namespace}/{}",
            claim.metadata.name.unwrap_or_default()
        ));
        fail_if(&self.fail_create_claim)
    }

    async fn get_claim(&self, namespace: &str, name: &str) -> Result<Option<PersistentVolumeClaim>, ProbeError> {
        self.record(format!("get_claim {namespace}/{name}"));
        Self::next(&self.claims)
    }

    async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<(), ProbeError> {
        self.record(format!("create_pod {namespace}/{}", pod.metadata.name.unwrap_or_default()));
        fail_if(&self.fail_create_pod)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ProbeError> {
        self.record(format!("get_pod {namespace}/{name}"));
        if self.panic_on_get_pod {
            panic!("simulated client bug");
        }
        Self::next(&self.pods)
    }

    async fn get_volume(&self, name: &str) -> Result<Option<PersistentVolume>, ProbeError> {
        self.record(format!("get_volume {name}"));
        if self.hang_on_get_volume {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.volume.lock().unwrap().clone().unwrap_or(Ok(None))
    }

    async fn list_storage_classes(&self) -> Result<Vec<StorageClass>, ProbeError> {
        self.record("list_storage_classes".to_string());
        Ok(self.storage_classes.clone())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ProbeError> {
        self.record("list_nodes".to_string());
        Ok(self.nodes.clone())
    }

    /// Shares the call log, so deletes issued after the run was dropped
    /// still show up in `calls()`.
    fn detached(&self) -> Option<Arc<dyn ProvisioningClient>> {
        Some(Arc::new(MockCluster {
            fail_delete_namespace: self.fail_delete_namespace.clone(),
            calls: Arc::clone(&self.calls),
            ..MockCluster::default()
        }))
    }
}
