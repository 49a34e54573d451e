use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::poller::PollSettings;

/* ============================= MODE ============================= */

/// How far the provisioning check goes.
///
/// `StaticOnly` never touches the cluster and is the default; `Active`
/// creates a throwaway namespace, claim and pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CheckMode {
    #[default]
    StaticOnly,
    Active,
}

impl CheckMode {
    pub fn from_active_flag(active: bool) -> Self {
        if active { CheckMode::Active } else { CheckMode::StaticOnly }
    }
}

/* ============================= PROBE CONFIG ============================= */

/// Names, sizes and wait windows for the active probe.
///
/// Every field has a default, so a YAML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProbeConfig {
    pub namespace_prefix: String,
    pub claim_name: String,
    pub pod_name: String,
    pub claim_size: String,
    pub probe_image: String,
    pub poll_interval_seconds: u64,
    pub claim_bound_timeout_seconds: u64,
    pub pod_ready_timeout_seconds: u64,
    pub volume_lookup_timeout_seconds: u64,
    pub cleanup_timeout_seconds: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: "kube-preflight-pv-check".to_string(),
            claim_name: "kube-preflight-pv-check-pvc".to_string(),
            pod_name: "kube-preflight-pv-check-pod".to_string(),
            claim_size: "5Gi".to_string(),
            probe_image: "registry.k8s.io/pause:3.9".to_string(),
            poll_interval_seconds: 3,
            claim_bound_timeout_seconds: 60,
            pod_ready_timeout_seconds: 60,
            volume_lookup_timeout_seconds: 10,
            cleanup_timeout_seconds: 30,
        }
    }
}

impl ProbeConfig {
    /// Load from a YAML file and validate.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config: ProbeConfig =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse { path: display, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("namespacePrefix", &self.namespace_prefix),
            ("claimName", &self.claim_name),
            ("podName", &self.pod_name),
            ("claimSize", &self.claim_size),
            ("probeImage", &self.probe_image),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }

        for (field, value) in [
            ("pollIntervalSeconds", self.poll_interval_seconds),
            ("claimBoundTimeoutSeconds", self.claim_bound_timeout_seconds),
            ("podReadyTimeoutSeconds", self.pod_ready_timeout_seconds),
            ("volumeLookupTimeoutSeconds", self.volume_lookup_timeout_seconds),
            ("cleanupTimeoutSeconds", self.cleanup_timeout_seconds),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
            }
        }

        let shortest_wait = self.claim_bound_timeout_seconds.min(self.pod_ready_timeout_seconds);
        if self.poll_interval_seconds > shortest_wait {
            return Err(ConfigError::Invalid(format!(
                "pollIntervalSeconds ({}) exceeds the shortest wait timeout ({})",
                self.poll_interval_seconds, shortest_wait
            )));
        }

        Ok(())
    }

    /// Unique namespace name for one run: `<prefix>-<UTC timestamp>`.
    pub fn namespace_name(&self, now: chrono::DateTime<chrono::Utc>) -> String {
        format!("{}-{}", self.namespace_prefix, now.format("%Y%m%d%H%M%S"))
    }

    pub fn claim_wait(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_seconds),
            timeout: Duration::from_secs(self.claim_bound_timeout_seconds),
        }
    }

    pub fn pod_wait(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_seconds),
            timeout: Duration::from_secs(self.pod_ready_timeout_seconds),
        }
    }

    pub fn volume_lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.volume_lookup_timeout_seconds)
    }

    /// Upper bound on the namespace delete issued after the probe.
    pub fn cleanup_timeout(&self) -> Duration {
        Duration::from_secs(self.cleanup_timeout_seconds)
    }
}

/* ============================= TESTS ============================= */
