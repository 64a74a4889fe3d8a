//! Host command implementation.

use std::collections::BTreeMap;
use std::io::Write;

use strato_proto::specs::split_list;
use strato_proto::{AvailabilityZoneSpec, HostCreateSpec};
use tracing::info;

use crate::cli::{HostCommands, HostCreateArgs};
use crate::client::HostAction;
use crate::commands::{canceled, positional};
use crate::context::Context;
use crate::error::CliError;
use crate::output::Outcome;
use crate::transport::Transport;

/// Parse `key=value` pairs separated by commas.
fn parse_metadata(value: &str) -> Result<BTreeMap<String, String>, CliError> {
    split_list(value)
        .into_iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(CliError::Validation(format!(
                "invalid metadata '{entry}', expected key=value"
            ))),
        })
        .collect()
}

impl HostAction {
    fn past_tense(self) -> &'static str {
        match self {
            Self::Suspend => "suspended",
            Self::Resume => "resumed",
            Self::EnterMaintenance => "put in maintenance",
            Self::ExitMaintenance => "returned to service",
            Self::Provision => "provisioned",
        }
    }
}

/// Handler for host subcommands.
pub struct HostCommand<'a, T> {
    ctx: &'a Context<T>,
}

impl<'a, T: Transport> HostCommand<'a, T> {
    /// Creates a new host command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context<T>) -> Self {
        Self { ctx }
    }

    /// Executes the host subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        command: &HostCommands,
    ) -> Result<(), CliError> {
        match command {
            HostCommands::Create(args) => self.create(out, args).await,
            HostCommands::Delete { pos } => {
                let [id] = positional(&pos.args)?;
                self.delete(out, id).await
            }
            HostCommands::List => {
                let hosts = self.ctx.walk(self.ctx.client.list_hosts()).await?;
                self.ctx.output.emit(out, &hosts);
                Ok(())
            }
            HostCommands::Show { pos } => {
                let [id] = positional(&pos.args)?;
                let host = self.ctx.client.get_host(id).await?;
                self.ctx.output.emit(out, &host);
                Ok(())
            }
            HostCommands::Tasks { pos, state } => {
                let [id] = positional(&pos.args)?;
                let tasks = self
                    .ctx
                    .walk(self.ctx.client.host_tasks(id, state.as_deref()))
                    .await?;
                self.ctx.output.emit(out, &tasks);
                Ok(())
            }
            HostCommands::SetAvailabilityZone { pos } => {
                let [id, zone] = positional(&pos.args)?;
                let spec = AvailabilityZoneSpec {
                    availability_zone: zone.to_string(),
                };
                let task = self.ctx.client.set_host_availability_zone(id, &spec).await?;
                self.ctx.wait(&task).await?;
                self.report(out, id, "updated").await
            }
            HostCommands::Suspend { pos } => self.action(out, &pos.args, HostAction::Suspend).await,
            HostCommands::Resume { pos } => self.action(out, &pos.args, HostAction::Resume).await,
            HostCommands::EnterMaintenance { pos } => {
                self.action(out, &pos.args, HostAction::EnterMaintenance)
                    .await
            }
            HostCommands::ExitMaintenance { pos } => {
                self.action(out, &pos.args, HostAction::ExitMaintenance)
                    .await
            }
            HostCommands::Provision { pos } => {
                self.action(out, &pos.args, HostAction::Provision).await
            }
            HostCommands::ListVms { pos } => {
                let [id] = positional(&pos.args)?;
                let vms = self.ctx.walk(self.ctx.client.host_vms(id)).await?;
                self.ctx.output.emit(out, &vms);
                Ok(())
            }
        }
    }

    async fn create<W: Write>(&self, out: &mut W, args: &HostCreateArgs) -> Result<(), CliError> {
        let address = self.ctx.require(args.address.as_deref(), "host address")?;
        let username = self.ctx.require(args.username.as_deref(), "username")?;
        let password = self.ctx.require_secret(args.password.as_deref(), "password")?;
        let tags = self.ctx.ask(args.tags.as_deref(), "usage tags", "CLOUD")?;
        let metadata = args
            .metadata
            .as_deref()
            .map(parse_metadata)
            .transpose()?
            .unwrap_or_default();

        let spec = HostCreateSpec {
            username,
            password,
            address,
            availability_zone: args.availability_zone.clone().unwrap_or_default(),
            metadata,
            usage_tags: split_list(&tags)
                .into_iter()
                .map(|t| t.to_ascii_uppercase())
                .collect(),
        };

        let task = self
            .ctx
            .client
            .create_host(args.deployment_id.as_deref(), &spec)
            .await?;
        let id = self.ctx.wait(&task).await?;
        info!(host_id = %id, address = %spec.address, "Registered host");

        self.ctx
            .report(out, "host", "created", id, |id| async move {
                self.ctx.client.get_host(&id).await
            })
            .await
    }

    async fn delete<W: Write>(&self, out: &mut W, id: &str) -> Result<(), CliError> {
        if !self
            .ctx
            .confirm(&format!("Are you sure you want to delete host {id}?"))?
        {
            canceled(out, &self.ctx.output);
            return Ok(());
        }

        let task = self.ctx.client.delete_host(id).await?;
        self.ctx.wait(&task).await?;
        self.ctx
            .output
            .emit(out, &Outcome::new("host", "deleted", id));
        Ok(())
    }

    async fn action<W: Write>(
        &self,
        out: &mut W,
        args: &[String],
        action: HostAction,
    ) -> Result<(), CliError> {
        let [id] = positional(args)?;
        let task = self.ctx.client.host_action(id, action).await?;
        self.ctx.wait(&task).await?;
        info!(host_id = %id, action = action.path_segment(), "Host action completed");
        self.report(out, id, action.past_tense()).await
    }

    async fn report<W: Write>(&self, out: &mut W, id: &str, action: &str) -> Result<(), CliError> {
        self.ctx
            .report(out, "host", action, id.to_string(), |id| async move {
                self.ctx.client.get_host(&id).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_pairs() {
        let metadata = parse_metadata("rack=r1, row = 4").unwrap();
        assert_eq!(metadata.get("rack").map(String::as_str), Some("r1"));
        assert_eq!(metadata.get("row").map(String::as_str), Some("4"));
    }

    #[test]
    fn metadata_without_equals_is_rejected() {
        assert!(matches!(
            parse_metadata("rack"),
            Err(CliError::Validation(_))
        ));
        assert!(parse_metadata("=x").is_err());
    }

    #[test]
    fn action_wording() {
        assert_eq!(HostAction::EnterMaintenance.past_tense(), "put in maintenance");
    }
}
