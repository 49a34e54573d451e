use std::fmt;

use serde::{Deserialize, Serialize};

/* ============================= STATUS ============================= */

/// Four-way verdict handed to the reporting layer.
///
/// `Warning` means the probe was inconclusive (a wait ran out of time),
/// not that provisioning is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Passed,
    Failed,
    Warning,
    Skipped,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Passed => "Passed",
            CheckStatus::Failed => "Failed",
            CheckStatus::Warning => "Warning",
            CheckStatus::Skipped => "Skipped",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ============================= OUTCOME ============================= */

/// Result of one provisioning verification run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub status: CheckStatus,
    pub message: String,
    pub passed_count: usize,
    pub failed_count: usize,
    pub total_nodes: usize,
}

impl CheckOutcome {
    /// Every node counts as passed.
    pub fn passed(total_nodes: usize, message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Passed,
            message: message.into(),
            passed_count: total_nodes,
            failed_count: 0,
            total_nodes,
        }
    }

    /// Every node counts as failed.
    pub fn failed(total_nodes: usize, message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Failed,
            message: message.into(),
            passed_count: 0,
            failed_count: total_nodes,
            total_nodes,
        }
    }

    pub fn warning(total_nodes: usize, message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Warning,
            message: message.into(),
            passed_count: 0,
            failed_count: 0,
            total_nodes,
        }
    }

    pub fn skipped(total_nodes: usize, message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Skipped,
            message: message.into(),
            passed_count: 0,
            failed_count: 0,
            total_nodes,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }
}

/* ============================= TESTS ============================= */
