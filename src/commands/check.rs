use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::{info, warn};

pub async fn run() -> anyhow::Result<()> {
    println!("Running cluster connectivity checks...\n");

    // 1. Build Kubernetes client from kubeconfig
    print!("  Kubeconfig .................. ");
    let client = match Client::try_default().await {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAIL");
            anyhow::bail!("Cannot load kubeconfig: {}", e);
        }
    };

    run_with_client(client).await
}

async fn run_with_client(client: Client) -> anyhow::Result<()> {
    // 2. Verify actual cluster connectivity by fetching server version
    print!("  Cluster connection .......... ");
    let version = match client.apiserver_version().await {
        Ok(v) => {
            println!("OK (v{}.{})", v.major, v.minor);
            v
        }
        Err(e) => {
            println!("FAIL");
            println!("\n  Error: {}", e);
            println!("  Hint:  Is the cluster running? Check with: kubectl cluster-info\n");
            warn!(error = %e, "cluster_unreachable");
            anyhow::bail!("Cannot reach the Kubernetes API server: {}", e);
        }
    };

    // 3. List nodes permission (eligibility inventory)
    print!("  List nodes permission ....... ");
    let nodes: Api<Node> = Api::all(client.clone());
    match nodes.list(&ListParams::default()).await {
        Ok(node_list) => println!("OK ({} nodes)", node_list.items.len()),
        Err(e) => println!("FAIL ({})", e),
    }

    // 4. List StorageClasses permission (eligibility inventory)
    print!("  List StorageClasses ......... ");
    let classes: Api<StorageClass> = Api::all(client.clone());
    match classes.list(&ListParams::default()).await {
        Ok(sc_list) => println!("OK ({} classes)", sc_list.items.len()),
        Err(e) => println!("FAIL ({})", e),
    }

    println!("\n  Kubernetes version: {}.{}", version.major, version.minor);
    println!("  Note: pv-check --active-checks also needs create/delete on namespaces,");
    println!("        create/get on PVCs and Pods, and get on PersistentVolumes.");

    info!(major = %version.major, minor = %version.minor, "connectivity_check_completed");
    println!("\nAll checks completed.");
    Ok(())
}

/* ============================= TESTS ============================= */
