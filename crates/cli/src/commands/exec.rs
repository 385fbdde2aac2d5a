//! `exec` command implementation.

use anyhow::{Context, Result};
use system_call::SystemCall;
use tracing::info;

use crate::cli::ExecArgs;

/// Execute the `exec` command
pub async fn run_exec(args: &ExecArgs) -> Result<()> {
    info!(command = %args.command, expect = %args.expect, "Running command");

    let output = SystemCall::new(&args.command, &args.expect)
        .stop_on_match(args.stop_on_match)
        .spawn()
        .wait()
        .await
        .with_context(|| format!("Failed to run '{}'", args.command))?;

    print!("{}", output.output);
    match output.exit_code {
        Some(code) => info!(exit_code = code, matched = output.matched, "Command finished"),
        None => info!(matched = output.matched, "Command stopped"),
    }

    if output.matched {
        Ok(())
    } else {
        anyhow::bail!("Expected response '{}' not found", args.expect)
    }
}
