//! Deployment command implementation.
//!
//! Tearing a deployment down is strictly ordered: every host is deleted
//! (each delete awaited) before the deployment is destroyed, and the
//! deployment record is deleted last.

use std::io::Write;

use tracing::info;

use crate::cli::DeploymentCommands;
use crate::commands::{canceled, positional};
use crate::context::Context;
use crate::error::CliError;
use crate::output::{Message, Outcome};
use crate::transport::Transport;

/// Handler for deployment subcommands.
pub struct DeploymentCommand<'a, T> {
    ctx: &'a Context<T>,
}

impl<'a, T: Transport> DeploymentCommand<'a, T> {
    /// Creates a new deployment command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context<T>) -> Self {
        Self { ctx }
    }

    /// Executes the deployment subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        command: &DeploymentCommands,
    ) -> Result<(), CliError> {
        match command {
            DeploymentCommands::List => {
                let deployments = self.ctx.walk(self.ctx.client.list_deployments()).await?;
                self.ctx.output.emit(out, &deployments);
                Ok(())
            }
            DeploymentCommands::Show { pos } => {
                let [id] = positional(&pos.args)?;
                let deployment = self.ctx.client.get_deployment(id).await?;
                self.ctx.output.emit(out, &deployment);
                Ok(())
            }
            DeploymentCommands::ListHosts { pos } => {
                let [id] = positional(&pos.args)?;
                let hosts = self.ctx.walk(self.ctx.client.deployment_hosts(id)).await?;
                self.ctx.output.emit(out, &hosts);
                Ok(())
            }
            DeploymentCommands::Destroy { pos } => {
                let [id] = positional(&pos.args)?;
                if !self
                    .ctx
                    .confirm(&format!("Are you sure you want to destroy deployment {id}?"))?
                {
                    canceled(out, &self.ctx.output);
                    return Ok(());
                }
                self.teardown(id).await?;
                self.ctx
                    .output
                    .emit(out, &Outcome::new("deployment", "destroyed", id));
                Ok(())
            }
            DeploymentCommands::DestroyAll => {
                if !self
                    .ctx
                    .confirm("Are you sure you want to destroy every deployment?")?
                {
                    canceled(out, &self.ctx.output);
                    return Ok(());
                }
                let deployments = self.ctx.walk(self.ctx.client.list_deployments()).await?;
                for deployment in &deployments {
                    self.teardown(&deployment.id).await?;
                }
                self.ctx.output.emit(
                    out,
                    &Message::success(format!("{} deployment(s) destroyed", deployments.len())),
                );
                Ok(())
            }
        }
    }

    /// Delete every host of `id`, then destroy and delete the deployment.
    async fn teardown(&self, id: &str) -> Result<(), CliError> {
        let hosts = self.ctx.walk(self.ctx.client.deployment_hosts(id)).await?;
        for host in &hosts {
            let task = self.ctx.client.delete_host(&host.id).await?;
            self.ctx.wait(&task).await?;
            info!(deployment_id = %id, host_id = %host.id, "Deleted host");
        }

        let task = self.ctx.client.destroy_deployment(id).await?;
        self.ctx.wait(&task).await?;
        info!(deployment_id = %id, "Destroyed deployment");

        let task = self.ctx.client.delete_deployment(id).await?;
        self.ctx.wait(&task).await?;
        info!(deployment_id = %id, hosts = hosts.len(), "Deleted deployment");
        Ok(())
    }
}
