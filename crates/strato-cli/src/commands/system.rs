//! System command implementation.
//!
//! `system deploy` brings up a deployment from a map file:
//! 1. Create the deployment
//! 2. Create each availability zone the hosts name
//! 3. Register every host of the map inside the deployment
//! 4. Deploy the control plane onto those hosts
//!
//! Each step waits for its task, and the first failure stops the run.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use strato_proto::AvailabilityZoneCreateSpec;
use tracing::info;

use crate::cli::SystemCommands;
use crate::commands::positional;
use crate::context::Context;
use crate::dc_map::DcMap;
use crate::error::CliError;
use crate::transport::Transport;

/// Handler for system subcommands.
pub struct SystemCommand<'a, T> {
    ctx: &'a Context<T>,
}

impl<'a, T: Transport> SystemCommand<'a, T> {
    /// Creates a new system command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context<T>) -> Self {
        Self { ctx }
    }

    /// Executes the system subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        command: &SystemCommands,
    ) -> Result<(), CliError> {
        match command {
            SystemCommands::Status => {
                let status = self.ctx.client.system_status().await?;
                self.ctx.output.emit(out, &status);
                Ok(())
            }
            SystemCommands::Deploy { pos } => {
                let [path] = positional(&pos.args)?;
                self.deploy(out, Path::new(path)).await
            }
        }
    }

    async fn deploy<W: Write>(&self, out: &mut W, path: &Path) -> Result<(), CliError> {
        let map = DcMap::load(path).await?;
        let hosts = map.planned_hosts()?;

        let task = self
            .ctx
            .client
            .create_deployment(&map.deployment_spec())
            .await?;
        let deployment_id = self.ctx.wait(&task).await?;
        info!(deployment_id = %deployment_id, "Created deployment");

        let mut zone_ids = BTreeMap::new();
        for name in map.zone_names() {
            let spec = AvailabilityZoneCreateSpec { name: name.clone() };
            let task = self.ctx.client.create_availability_zone(&spec).await?;
            let zone_id = self.ctx.wait(&task).await?;
            info!(zone = %name, zone_id = %zone_id, "Created availability zone");
            zone_ids.insert(name, zone_id);
        }

        for host in hosts {
            let mut spec = host.spec;
            if let Some(zone) = &host.zone {
                spec.availability_zone = zone_ids.get(zone).cloned().ok_or_else(|| {
                    CliError::Config(format!("availability zone {zone} was not created"))
                })?;
            }
            let task = self
                .ctx
                .client
                .create_host(Some(deployment_id.as_str()), &spec)
                .await?;
            self.ctx.wait(&task).await?;
            info!(address = %spec.address, deployment_id = %deployment_id, "Registered host");
        }

        let task = self.ctx.client.deploy(&deployment_id).await?;
        self.ctx.wait(&task).await?;
        info!(deployment_id = %deployment_id, "Deployed control plane");

        self.ctx
            .report(out, "deployment", "deployed", deployment_id, |id| async move {
                self.ctx.client.get_deployment(&id).await
            })
            .await
    }
}
