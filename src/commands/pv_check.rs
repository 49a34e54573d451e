use anyhow::Context;
use k8s_openapi::api::core::v1::Node;
use kube_preflight::cluster::{KubeProvisioningClient, ProvisioningClient};
use kube_preflight::inventory::NodeInfo;
use kube_preflight::{CheckMode, CheckOutcome, CheckStatus, ProbeConfig, ProvisioningCheck};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{OutputFormat, PvCheckArgs};

/* ============================= CONFIG ============================= */

fn resolve_config(args: &PvCheckArgs) -> anyhow::Result<ProbeConfig> {
    let mut config = match &args.config {
        Some(path) => ProbeConfig::from_file(path)?,
        None => ProbeConfig::default(),
    };

    if let Some(size) = &args.claim_size {
        config.claim_size = size.clone();
    }
    if let Some(image) = &args.image {
        config.probe_image = image.clone();
    }
    if let Some(secs) = args.claim_timeout {
        config.claim_bound_timeout_seconds = secs;
    }
    if let Some(secs) = args.pod_timeout {
        config.pod_ready_timeout_seconds = secs;
    }
    if let Some(secs) = args.poll_interval {
        config.poll_interval_seconds = secs;
    }

    config.validate()?;
    Ok(config)
}

/* ============================= ENTRY ============================= */

pub async fn run(args: PvCheckArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;
    let mode = CheckMode::from_active_flag(args.active_checks);

    let client = KubeProvisioningClient::try_default()
        .await
        .context("Failed to connect to Kubernetes cluster. Is your kubeconfig valid?")?;

    let nodes: Vec<NodeInfo> = client
        .list_nodes()
        .await
        .context("Failed to list nodes. Check RBAC permissions.")?
        .iter()
        .map(|n: &Node| NodeInfo::from(n))
        .collect();

    // First Ctrl-C interrupts the waits and the namespace is still deleted.
    // A second one exits immediately, even mid-cleanup.
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_err() {
            return;
        }
        info!("shutdown_signal_received");
        trigger.cancel();

        if signal::ctrl_c().await.is_ok() {
            warn!("second_shutdown_signal_exiting");
            std::process::exit(130);
        }
    });

    info!(mode = ?mode, nodes = nodes.len(), "pv_check_started");

    let outcome = ProvisioningCheck::new(&client, &config)
        .with_cancellation(cancel)
        .run(&nodes, None, mode)
        .await;

    match args.output {
        OutputFormat::Text => print_summary(&outcome, mode),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }

    if outcome.status == CheckStatus::Failed {
        anyhow::bail!("dynamic PV provisioning check failed: {}", outcome.message);
    }

    Ok(())
}

/* ============================= OUTPUT ============================= */

fn print_summary(outcome: &CheckOutcome, mode: CheckMode) {
    println!("===== PV Provisioning Check =====");
    println!(
        "Mode                       : {}",
        match mode {
            CheckMode::StaticOnly => "static (use --active-checks for an end-to-end probe)",
            CheckMode::Active => "active",
        }
    );
    println!("Result                     : {}", outcome.status);
    println!("Nodes passed               : {}", outcome.passed_count);
    println!("Nodes failed               : {}", outcome.failed_count);
    println!("Total nodes                : {}", outcome.total_nodes);
    println!("Details                    : {}", outcome.message);
    println!("=================================");
}

/* ============================= TESTS ============================= */
