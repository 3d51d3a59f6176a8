use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};

/// Stack file used when `-f` is not given
pub const DEFAULT_STACK_FILE: &str = "kubemanifest.toml";

#[derive(Parser)]
#[command(name = "kubemanifest")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative Kubernetes manifests reconciled through kubectl", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub stack: StackArgs,

    #[command(flatten)]
    pub provider: ProviderArgs,

    #[command(subcommand)]
    pub command: Command,
}

// ============================================================================
// Global Options
// ============================================================================

/// Where the stack and its state live
#[derive(Args, Clone, Debug)]
pub struct StackArgs {
    /// Stack file declaring the manifests [default: kubemanifest.toml]
    #[arg(short = 'f', long = "file", global = true)]
    pub file: Option<PathBuf>,

    /// State file (defaults to one per stack under the state directory)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,
}

/// Connection settings; each overrides the `[provider]` table of the stack
#[derive(Args, Clone, Debug, Default)]
pub struct ProviderArgs {
    /// Path to a kubeconfig file (kubectl reads `KUBECONFIG` itself when unset)
    #[arg(long, env = "KUBEMANIFEST_KUBECONFIG", global = true)]
    pub kubeconfig: Option<String>,

    /// Inline kubeconfig content
    #[arg(long, env = "KUBECONFIG_CONTENT", global = true, hide_env_values = true)]
    pub kubeconfig_content: Option<String>,

    /// Context to use from the kubeconfig
    #[arg(long = "context", env = "KUBE_CONTEXT", global = true)]
    pub kubeconfig_context: Option<String>,

    /// Path to the kubectl binary
    #[arg(long, env = "KUBECTL_PATH", global = true)]
    pub kubectl_path: Option<String>,

    /// Bearer token for the API server
    #[arg(long = "token", env = "KUBE_TOKEN", global = true, hide_env_values = true)]
    pub kubectl_token: Option<String>,

    /// Validate manifests on apply (true/false)
    #[arg(long = "validate", env = "KUBECTL_VALIDATE", global = true)]
    pub kubectl_validate: Option<bool>,
}

impl StackArgs {
    /// The stack file, falling back to the default name
    pub fn path(&self) -> &Path {
        self.file
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_STACK_FILE))
    }
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Make the cluster match the stack file
    Apply(ApplyArgs),

    /// Re-read every managed object and update state
    Refresh(JobsArgs),

    /// Delete every managed object
    Destroy(DestroyArgs),

    /// Show managed objects recorded in state
    Show {
        /// Only show this manifest
        name: Option<String>,
    },

    /// Forward a local port to a cluster service
    PortForward(PortForwardArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Clone, Copy, Debug)]
pub struct JobsArgs {
    /// Number of manifests reconciled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Only plan this manifest ("name" or "k8s_manifest.name")
    pub target: Option<String>,

    /// Skip re-reading managed objects before planning
    #[arg(long)]
    pub no_refresh: bool,

    #[command(flatten)]
    pub jobs: JobsArgs,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Dry run - show what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Only destroy this manifest
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    #[command(flatten)]
    pub jobs: JobsArgs,
}

#[derive(Args, Debug)]
pub struct PortForwardArgs {
    /// Service name
    pub name: String,

    /// Service port
    pub port: u16,

    /// Service namespace
    #[arg(long)]
    pub namespace: String,

    /// Local port (defaults to the service port)
    #[arg(short, long)]
    pub local_port: Option<u16>,
}
