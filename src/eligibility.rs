use std::collections::BTreeMap;

use crate::inventory::{NodeInfo, StorageClassInfo};

/* ============================= CONSTANTS ============================= */

pub const ANN_DEFAULT_STORAGE_CLASS: &str = "storageclass.kubernetes.io/is-default-class";
pub const ANN_BETA_DEFAULT_STORAGE_CLASS: &str = "storageclass.beta.kubernetes.io/is-default-class";
pub const NO_PROVISIONER: &str = "kubernetes.io/no-provisioner";

/* ============================= HELPERS ============================= */

/// True if either default-class annotation is set to the literal `"true"`.
pub fn is_default_annotated(annotations: &BTreeMap<String, String>) -> bool {
    [ANN_DEFAULT_STORAGE_CLASS, ANN_BETA_DEFAULT_STORAGE_CLASS]
        .iter()
        .any(|key| annotations.get(*key).map(String::as_str) == Some("true"))
}

/// A class provisions dynamically unless its provisioner is empty or the
/// static `no-provisioner` sentinel.
pub fn is_dynamic(sc: &StorageClassInfo) -> bool {
    !sc.provisioner.is_empty() && sc.provisioner != NO_PROVISIONER
}

/* ============================= ELIGIBILITY ============================= */

/// Static precondition check for dynamic provisioning.
///
/// Pure function over the supplied inventory. Returns `(true, "")` when a
/// schedulable node and a default dynamic StorageClass both exist, otherwise
/// `(false, reason)` naming the first unmet precondition.
pub fn basic_eligibility(nodes: &[NodeInfo], storage_classes: &[StorageClassInfo]) -> (bool, String) {
    if nodes.is_empty() {
        return (false, "No nodes found in cluster.".to_string());
    }

    if !nodes.iter().any(|n| n.schedulable) {
        return (
            false,
            "No schedulable node found (all unschedulable).".to_string(),
        );
    }

    if storage_classes.is_empty() {
        return (
            false,
            "No StorageClasses found; dynamic provisioning not available.".to_string(),
        );
    }

    let dynamic: Vec<&StorageClassInfo> = storage_classes.iter().filter(|sc| is_dynamic(sc)).collect();
    if dynamic.is_empty() {
        return (
            false,
            "All StorageClasses use 'no-provisioner'; no dynamic provisioning.".to_string(),
        );
    }

    if !dynamic.iter().any(|sc| sc.is_default) {
        return (false, "No default dynamic StorageClass found.".to_string());
    }

    (true, String::new())
}

/* ============================= TESTS ============================= */
