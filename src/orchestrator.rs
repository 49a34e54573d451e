use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cluster::ProvisioningClient;
use crate::config::{CheckMode, ProbeConfig};
use crate::eligibility::basic_eligibility;
use crate::error::ProbeError;
use crate::inventory::{NodeInfo, StorageClassInfo, collect_storage_classes};
use crate::outcome::CheckOutcome;
use crate::poller::wait_for;
use crate::resources::{ProbeEnvironmentGuard, ProvisioningResourceManager};

/* ============================= PHASE PREDICATES ============================= */

fn claim_phase(claim: &PersistentVolumeClaim) -> &str {
    claim
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("Pending")
}

fn pod_phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("Pending")
}

pub fn claim_is_bound(claim: &PersistentVolumeClaim) -> bool {
    claim_phase(claim) == "Bound"
}

/// A claim that lost its volume will not recover within the probe window.
pub fn claim_fatal(claim: &PersistentVolumeClaim) -> Option<String> {
    (claim_phase(claim) == "Lost").then(|| "claim phase is Lost".to_string())
}

pub fn pod_is_ready(pod: &Pod) -> bool {
    matches!(pod_phase(pod), "Running" | "Succeeded")
}

pub fn pod_fatal(pod: &Pod) -> Option<String> {
    if pod_phase(pod) != "Failed" {
        return None;
    }
    let detail = pod
        .status
        .as_ref()
        .and_then(|s| s.reason.clone().or_else(|| s.message.clone()));
    Some(match detail {
        Some(d) => format!("pod phase is Failed ({d})"),
        None => "pod phase is Failed".to_string(),
    })
}

/* ============================= ORCHESTRATOR ============================= */

/// One provisioning verification pass against a cluster.
pub struct ProvisioningCheck<'a, C: ProvisioningClient + ?Sized> {
    client: &'a C,
    config: &'a ProbeConfig,
    cancel: CancellationToken,
}

impl<'a, C: ProvisioningClient + ?Sized> ProvisioningCheck<'a, C> {
    pub fn new(client: &'a C, config: &'a ProbeConfig) -> Self {
        Self {
            client,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling the token aborts any in-progress wait; cleanup still runs.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the check. When `storage_classes` is `None` they are listed from
    /// the cluster. Every path returns an outcome; nothing is propagated.
    pub async fn run(
        &self,
        nodes: &[NodeInfo],
        storage_classes: Option<&[StorageClassInfo]>,
        mode: CheckMode,
    ) -> CheckOutcome {
        let total = nodes.len();

        let listed;
        let storage_classes = match storage_classes {
            Some(classes) => classes,
            None => match collect_storage_classes(self.client).await {
                Ok(classes) => {
                    listed = classes;
                    &listed[..]
                }
                Err(e) => {
                    warn!(error = %e, "storage_class_list_failed");
                    return CheckOutcome::failed(total, format!("Failed to list StorageClasses: {e}"));
                }
            },
        };

        let (eligible, reason) = basic_eligibility(nodes, storage_classes);
        if !eligible {
            info!(reason = %reason, "pv_check_ineligible");
            return CheckOutcome::failed(total, reason);
        }

        match mode {
            CheckMode::StaticOnly => {
                info!(mode = "static", "pv_check_passed");
                CheckOutcome::passed(
                    total,
                    "Dynamic provisioning preconditions satisfied (static check only).",
                )
            }
            CheckMode::Active => self.run_active(total).await,
        }
    }

    async fn run_active(&self, total: usize) -> CheckOutcome {
        let namespace = self.config.namespace_name(chrono::Utc::now());
        let resources = ProvisioningResourceManager::new(self.client);

        if let Err(e) = resources.create_probe_environment(&namespace).await {
            warn!(namespace = %namespace, error = %e, "probe_namespace_create_failed");
            return CheckOutcome::failed(
                total,
                format!("Failed to create temporary namespace {namespace:?}: {e}"),
            );
        }

        // The namespace now exists: release it on every exit, panics included.
        // The guard covers the one exit this function cannot see, a dropped future.
        let mut guard = ProbeEnvironmentGuard::new(self.client, &namespace);

        let probe = AssertUnwindSafe(self.probe(&resources, &namespace, total))
            .catch_unwind()
            .await;

        let cleanup_timeout = self.config.cleanup_timeout();
        let deleted =
            tokio::time::timeout(cleanup_timeout, resources.delete_probe_environment(&namespace)).await;
        match deleted {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(namespace = %namespace, error = %e, "probe_namespace_delete_failed"),
            Err(_) => warn!(
                namespace = %namespace,
                after_secs = cleanup_timeout.as_secs(),
                "probe_namespace_delete_timed_out"
            ),
        }
        guard.disarm();

        match probe {
            Ok(outcome) => {
                info!(
                    namespace = %namespace,
                    status = %outcome.status,
                    message = %outcome.message,
                    "pv_check_finished"
                );
                outcome
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn probe(
        &self,
        resources: &ProvisioningResourceManager<'_, C>,
        namespace: &str,
        total: usize,
    ) -> CheckOutcome {
        let config = self.config;

        if let Err(e) = resources
            .create_probe_claim(namespace, &config.claim_name, &config.claim_size)
            .await
        {
            return CheckOutcome::failed(total, format!("Failed to create PVC: {e}"));
        }

        if let Err(e) = resources
            .create_probe_pod(namespace, &config.pod_name, &config.claim_name, &config.probe_image)
            .await
        {
            return CheckOutcome::failed(total, format!("Failed to create Pod: {e}"));
        }

        // Claim first, then pod: WaitForFirstConsumer classes bind only after
        // the pod above is scheduled.
        let claim = match wait_for(
            "probe PVC",
            config.claim_wait(),
            &self.cancel,
            || self.client.get_claim(namespace, &config.claim_name),
            claim_is_bound,
            claim_fatal,
        )
        .await
        {
            Ok(claim) => claim,
            Err(e) => {
                return classify_wait_error(
                    total,
                    "PVC did not become Bound in time",
                    "PVC did not become Bound",
                    e,
                );
            }
        };

        if let Err(e) = wait_for(
            "probe pod",
            config.pod_wait(),
            &self.cancel,
            || self.client.get_pod(namespace, &config.pod_name),
            pod_is_ready,
            pod_fatal,
        )
        .await
        {
            return classify_wait_error(
                total,
                "Pod did not become Running/Succeeded in time",
                "Pod did not become Running/Succeeded",
                e,
            );
        }

        self.verify_backing_volume(&claim, total).await
    }

    async fn verify_backing_volume(&self, claim: &PersistentVolumeClaim, total: usize) -> CheckOutcome {
        let Some(volume_name) = claim
            .spec
            .as_ref()
            .and_then(|s| s.volume_name.as_deref())
            .filter(|n| !n.is_empty())
        else {
            return CheckOutcome::failed(total, "PVC is Bound but has no volume reference.");
        };

        let lookup = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ProbeError::Cancelled),
            r = tokio::time::timeout(self.config.volume_lookup_timeout(), self.client.get_volume(volume_name)) => {
                r.unwrap_or_else(|_| Err(ProbeError::Timeout {
                    what: format!("PersistentVolume {volume_name}"),
                    after: self.config.volume_lookup_timeout(),
                }))
            }
        };

        match lookup {
            Ok(Some(volume)) => {
                let phase = volume
                    .status
                    .as_ref()
                    .and_then(|s| s.phase.as_deref())
                    .unwrap_or("Unknown");
                if phase == "Bound" {
                    info!(volume = %volume_name, "backing_volume_bound");
                    CheckOutcome::passed(
                        total,
                        format!("Dynamic provisioning works: PersistentVolume {volume_name} is Bound."),
                    )
                } else {
                    CheckOutcome::failed(
                        total,
                        format!("PersistentVolume {volume_name} is present but not Bound (phase {phase})."),
                    )
                }
            }
            Ok(None) => CheckOutcome::failed(
                total,
                format!("PVC references PersistentVolume {volume_name}, which does not exist."),
            ),
            Err(ProbeError::Cancelled) => CheckOutcome::skipped(total, "Provisioning probe cancelled."),
            Err(e @ ProbeError::Timeout { .. }) => {
                warn!(volume = %volume_name, error = %e, "backing_volume_lookup_timed_out");
                CheckOutcome::warning(
                    total,
                    format!("PersistentVolume {volume_name} could not be read in time: {e}"),
                )
            }
            Err(e) => CheckOutcome::failed(
                total,
                format!("Failed to read PersistentVolume {volume_name}: {e}"),
            ),
        }
    }
}

/// Timeout is inconclusive, cancellation is a skip, anything else is a failure.
fn classify_wait_error(
    total: usize,
    timeout_message: &str,
    failure_prefix: &str,
    err: ProbeError,
) -> CheckOutcome {
    match err {
        ProbeError::Timeout { .. } => {
            warn!(error = %err, "probe_wait_timed_out");
            CheckOutcome::warning(total, format!("{timeout_message}: {err}"))
        }
        ProbeError::Cancelled => CheckOutcome::skipped(total, "Provisioning probe cancelled."),
        other => CheckOutcome::failed(total, format!("{failure_prefix}: {other}")),
    }
}

/* ============================= ENTRY ============================= */

/// Convenience wrapper for callers that do not need cancellation.
pub async fn run_provisioning_check<C>(
    client: &C,
    config: &ProbeConfig,
    nodes: &[NodeInfo],
    storage_classes: Option<&[StorageClassInfo]>,
    mode: CheckMode,
) -> CheckOutcome
where
    C: ProvisioningClient + ?Sized,
{
    ProvisioningCheck::new(client, config)
        .run(nodes, storage_classes, mode)
        .await
}

/* ============================= TESTS ============================= */
