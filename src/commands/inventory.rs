use anyhow::Context;
use kube_preflight::cluster::KubeProvisioningClient;
use kube_preflight::eligibility::is_dynamic;
use kube_preflight::inventory;

pub async fn run() -> anyhow::Result<()> {
    let client = KubeProvisioningClient::try_default()
        .await
        .context("Failed to connect to Kubernetes cluster. Is your kubeconfig valid?")?;

    let snapshot = inventory::collect(&client)
        .await
        .context("Failed to collect inventory. Check RBAC permissions.")?;

    println!("{:<50} {:<12}", "NODE", "SCHEDULABLE");
    println!("{}", "-".repeat(62));
    for node in &snapshot.nodes {
        let schedulable = if node.schedulable { "yes" } else { "no" };
        println!("{:<50} {:<12}", node.name, schedulable);
    }
    println!("\nTotal: {} nodes", snapshot.nodes.len());

    println!(
        "\n{:<30} {:<40} {:<8} {:<8}",
        "STORAGECLASS", "PROVISIONER", "DEFAULT", "DYNAMIC"
    );
    println!("{}", "-".repeat(89));
    for sc in &snapshot.storage_classes {
        println!(
            "{:<30} {:<40} {:<8} {:<8}",
            sc.name,
            sc.provisioner,
            if sc.is_default { "yes" } else { "no" },
            if is_dynamic(sc) { "yes" } else { "no" },
        );
    }
    println!("\nTotal: {} StorageClasses", snapshot.storage_classes.len());

    Ok(())
}
