use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "kube-preflight")]
#[command(about = "Kubernetes cluster preflight checks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display application version
    Version,

    /// Check cluster connectivity and the permissions the probes need
    Check,

    /// List the nodes and StorageClasses the provisioning check sees
    Inventory,

    /// Verify that dynamic volume provisioning works
    PvCheck(PvCheckArgs),
}

#[derive(clap::Args, Debug)]
pub struct PvCheckArgs {
    /// Create a temporary namespace, PVC and Pod to test provisioning end to end
    #[arg(long)]
    pub active_checks: bool,

    /// YAML file with probe settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Result output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Requested PVC size (e.g. 1Gi)
    #[arg(long)]
    pub claim_size: Option<String>,

    /// Image for the probe pod
    #[arg(long)]
    pub image: Option<String>,

    /// Seconds to wait for the PVC to become Bound
    #[arg(long)]
    pub claim_timeout: Option<u64>,

    /// Seconds to wait for the Pod to become Running
    #[arg(long)]
    pub pod_timeout: Option<u64>,

    /// Seconds between status polls
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_pv_check_defaults_to_static() {
        let cli = Cli::parse_from(["kube-preflight", "pv-check"]);
        match cli.command {
            Commands::PvCheck(args) => {
                assert!(!args.active_checks);
                assert_eq!(args.output, OutputFormat::Text);
                assert!(args.config.is_none());
            }
            _ => panic!("expected pv-check"),
        }
    }

    #[test]
    fn test_pv_check_overrides() {
        let cli = Cli::parse_from([
            "kube-preflight",
            "--log-format",
            "json",
            "pv-check",
            "--active-checks",
            "--claim-timeout",
            "120",
            "--output",
            "json",
        ]);
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::PvCheck(args) => {
                assert!(args.active_checks);
                assert_eq!(args.claim_timeout, Some(120));
                assert_eq!(args.output, OutputFormat::Json);
            }
            _ => panic!("expected pv-check"),
        }
    }
}
