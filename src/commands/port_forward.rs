//! `port-forward` - run a tunnel to a cluster service in the foreground

use anyhow::{Context as _, Result, bail};
use kubectl::{Attach, Client, ConnectionConfig, PortForwardSpec};
use std::path::Path;

use crate::Context;
use crate::cli::{DEFAULT_STACK_FILE, PortForwardArgs, ProviderArgs, StackArgs};
use crate::config::{Stack, merge_provider};
use crate::ui;

pub fn run(
    ctx: &Context,
    stack_args: &StackArgs,
    provider: &ProviderArgs,
    args: &PortForwardArgs,
) -> Result<()> {
    let base = stack_provider(stack_args.file.as_deref(), Path::new(DEFAULT_STACK_FILE))?;
    let config = merge_provider(base, provider)?;
    let client = Client::new(config).context("determining kubeconfig")?;

    let spec = PortForwardSpec {
        name: args.name.clone(),
        namespace: args.namespace.clone(),
        port: args.port,
        local_port: args.local_port,
    };

    let tunnel = client
        .port_forward(&spec, Attach::Inherit)
        .with_context(|| format!("starting port-forward {}", spec.id()))?;

    if !ctx.quiet {
        ui::info(&format!(
            "Forwarding localhost:{} to service/{} in {} (Ctrl-C to stop)",
            args.local_port.unwrap_or(args.port),
            args.name,
            args.namespace
        ));
    }

    let status = tunnel.wait()?;
    if !status.success() {
        bail!("kubectl port-forward exited with {status}");
    }
    Ok(())
}

/// Connection settings from the stack file
///
/// An explicit `-f` must exist; the default stack file is optional here.
fn stack_provider(explicit: Option<&Path>, default: &Path) -> Result<ConnectionConfig> {
    match explicit {
        Some(path) => Ok(Stack::load(path)?.provider),
        None => Ok(Stack::load_optional(default)?
            .map(|stack| stack.provider)
            .unwrap_or_default()),
    }
}
