//! Dynamic volume provisioning verification for Kubernetes clusters.
//!
//! The static path inspects node and StorageClass inventory only. The
//! active path creates a throwaway namespace, claim and pod, waits for
//! them, checks the backing volume, and always deletes the namespace.

pub mod cluster;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod inventory;
pub mod orchestrator;
pub mod outcome;
pub mod poller;
pub mod resources;

pub use config::{CheckMode, ProbeConfig};
pub use eligibility::basic_eligibility;
pub use outcome::{CheckOutcome, CheckStatus};
pub use orchestrator::{ProvisioningCheck, run_provisioning_check};
