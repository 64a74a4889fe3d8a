//! CLI command implementations.
//!
//! Each submodule handles one resource noun:
//! - [`tenant`] - Tenants and the current-tenant selection
//! - [`project`] - Projects, quotas and the current-project selection
//! - [`image`] - Image upload and inspection
//! - [`iam`] - IAM policies of images and projects
//! - [`network`] - Physical networks or software-defined subnets
//! - [`cluster`] - Clusters and their VMs
//! - [`host`] - Hosts and host state transitions
//! - [`deployment`] - Deployments and their teardown
//! - [`task`] - Task inspection and monitoring
//! - [`system`] - Control-plane status and deployment from a map file
//! - [`target`] - Endpoint and credentials in the config store

pub mod cluster;
pub mod deployment;
pub mod host;
pub mod iam;
pub mod image;
pub mod network;
pub mod project;
pub mod system;
pub mod target;
pub mod task;
pub mod tenant;

use std::io::Write;

pub use cluster::ClusterCommand;
pub use deployment::DeploymentCommand;
pub use host::HostCommand;
pub use iam::IamCommand;
pub use image::ImageCommand;
pub use network::NetworkCommand;
pub use project::ProjectCommand;
pub use system::SystemCommand;
pub use target::TargetCommand;
pub use task::TaskCommand;
pub use tenant::TenantCommand;

use crate::cli::Commands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{Message, OutputFormat};
use crate::transport::Transport;

/// Fail unless exactly `expected` positional arguments were given.
///
/// # Errors
///
/// Returns [`CliError::ArgumentCount`] on a mismatch.
pub fn check_arg_count(args: &[String], expected: usize) -> Result<(), CliError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(CliError::ArgumentCount {
            expected,
            actual: args.len(),
        })
    }
}

/// Exactly `N` positional arguments, as string slices.
///
/// # Errors
///
/// Returns [`CliError::ArgumentCount`] on a mismatch.
pub fn positional<const N: usize>(args: &[String]) -> Result<[&str; N], CliError> {
    check_arg_count(args, N)?;
    Ok(std::array::from_fn(|i| args[i].as_str()))
}

/// At most one positional argument.
///
/// # Errors
///
/// Returns [`CliError::ArgumentCount`] when more than one was given.
pub fn optional_arg(args: &[String]) -> Result<Option<&str>, CliError> {
    match args {
        [] => Ok(None),
        [only] => Ok(Some(only.as_str())),
        _ => Err(CliError::ArgumentCount {
            expected: 1,
            actual: args.len(),
        }),
    }
}

/// Parse a count typed by the user.
///
/// # Errors
///
/// Returns [`CliError::Validation`] if `value` is not a non-negative integer.
pub(crate) fn parse_count(value: &str, field: &str) -> Result<u32, CliError> {
    value.trim().parse().map_err(|_| {
        CliError::Validation(format!("{field} must be a positive number, got '{value}'"))
    })
}

/// Tell the user a declined confirmation stopped the command.
pub(crate) fn canceled<W: Write>(writer: &mut W, output: &OutputFormat) {
    output.emit(writer, &Message::info("OK, canceled"));
}

/// Run one parsed command against `ctx`.
///
/// # Errors
///
/// Returns whatever the handler returns.
pub async fn dispatch<T: Transport, W: Write>(
    ctx: &Context<T>,
    writer: &mut W,
    command: &Commands,
) -> Result<(), CliError> {
    match command {
        Commands::Tenant { command } => TenantCommand::new(ctx).execute(writer, command).await,
        Commands::Project { command } => ProjectCommand::new(ctx).execute(writer, command).await,
        Commands::Image { command } => ImageCommand::new(ctx).execute(writer, command).await,
        Commands::Network { command } => NetworkCommand::new(ctx).execute(writer, command).await,
        Commands::Cluster { command } => ClusterCommand::new(ctx).execute(writer, command).await,
        Commands::Host { command } => HostCommand::new(ctx).execute(writer, command).await,
        Commands::Deployment { command } => {
            DeploymentCommand::new(ctx).execute(writer, command).await
        }
        Commands::Task { command } => TaskCommand::new(ctx).execute(writer, command).await,
        Commands::System { command } => SystemCommand::new(ctx).execute(writer, command).await,
        Commands::Target { command } => TargetCommand::from_context(ctx).execute(writer, command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn arg_count_mismatch() {
        let err = check_arg_count(&args(&["a", "b"]), 1).unwrap_err();
        assert!(matches!(
            err,
            CliError::ArgumentCount {
                expected: 1,
                actual: 2
            }
        ));
        assert_eq!(
            err.to_string(),
            "wrong number of arguments: expected 1, got 2"
        );
    }

    #[test]
    fn positional_returns_slices() {
        let given = args(&["c-1", "3"]);
        let [id, count] = positional::<2>(&given).unwrap();
        assert_eq!((id, count), ("c-1", "3"));
        assert!(positional::<2>(&args(&["c-1"])).is_err());
    }

    #[test]
    fn counts_parse() {
        assert_eq!(parse_count(" 64 ", "size").unwrap(), 64);
        assert!(matches!(
            parse_count("lots", "size"),
            Err(CliError::Validation(_))
        ));
    }

    #[test]
    fn optional_arg_accepts_zero_or_one() {
        assert_eq!(optional_arg(&[]).unwrap(), None);
        assert_eq!(optional_arg(&args(&["x"])).unwrap(), Some("x"));
        assert!(optional_arg(&args(&["x", "y"])).is_err());
    }
}
