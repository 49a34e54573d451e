use std::time::Duration;

use thiserror::Error;

/* ============================= PROBE ERRORS ============================= */

/// Errors raised while driving the provisioning probe against a cluster.
///
/// `Timeout` and `Cancelled` are kept apart from `Api` and `Fatal` so the
/// orchestrator can report an inconclusive run differently from a broken one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Kubernetes API error: {message}")]
    Api { message: String },

    #[error("timed out after {}s waiting for {what}", .after.as_secs())]
    Timeout { what: String, after: Duration },

    #[error("{what} failed: {reason}")]
    Fatal { what: String, reason: String },

    #[error("probe cancelled")]
    Cancelled,
}

impl ProbeError {
    pub fn api(message: impl Into<String>) -> Self {
        ProbeError::Api {
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Timeout { .. })
    }
}

impl From<kube::Error> for ProbeError {
    fn from(err: kube::Error) -> Self {
        ProbeError::Api {
            message: err.to_string(),
        }
    }
}

/* ============================= CONFIG ERRORS ============================= */

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/* ============================= TESTS ============================= */
