//! Network command implementation.
//!
//! The controller runs either physical networks or software-defined
//! subnets. Every verb reads `/info` first and talks to the matching
//! endpoints.

use std::io::Write;

use strato_proto::specs::split_list;
use strato_proto::{NetworkCreateSpec, NetworkType, RoutingType, SubnetCreateSpec};
use tracing::{debug, info};

use crate::cli::NetworkCommands;
use crate::commands::{canceled, parse_count, positional};
use crate::context::Context;
use crate::error::CliError;
use crate::output::Outcome;
use crate::transport::Transport;

/// Default number of private IPs of a new subnet.
const DEFAULT_SUBNET_SIZE: &str = "256";

/// Flags of `network create`.
#[derive(Debug, Clone, Copy, Default)]
struct CreateFlags<'f> {
    name: Option<&'f str>,
    description: Option<&'f str>,
    port_groups: Option<&'f str>,
    routing_type: Option<&'f str>,
    size: Option<u32>,
    static_ip_size: Option<u32>,
    tenant: Option<&'f str>,
    project: Option<&'f str>,
}

/// Handler for network subcommands.
pub struct NetworkCommand<'a, T> {
    ctx: &'a Context<T>,
}

impl<'a, T: Transport> NetworkCommand<'a, T> {
    /// Creates a new network command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context<T>) -> Self {
        Self { ctx }
    }

    /// Executes the network subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        command: &NetworkCommands,
    ) -> Result<(), CliError> {
        match command {
            NetworkCommands::Create {
                name,
                description,
                portgroups,
                routing_type,
                size,
                static_ip_size,
                project,
                tenant,
            } => {
                let flags = CreateFlags {
                    name: name.as_deref(),
                    description: description.as_deref(),
                    port_groups: portgroups.as_deref(),
                    routing_type: routing_type.as_deref(),
                    size: *size,
                    static_ip_size: *static_ip_size,
                    tenant: tenant.as_deref(),
                    project: project.as_deref(),
                };
                self.create(out, flags).await
            }
            NetworkCommands::Delete { pos } => {
                let [id] = positional(&pos.args)?;
                self.delete(out, id).await
            }
            NetworkCommands::List {
                name,
                project,
                tenant,
            } => {
                self.list(out, name.as_deref(), tenant.as_deref(), project.as_deref())
                    .await
            }
            NetworkCommands::Show { pos } => {
                let [id] = positional(&pos.args)?;
                self.show(out, id).await
            }
            NetworkCommands::SetDefault { pos } => {
                let [id] = positional(&pos.args)?;
                self.set_default(out, id).await
            }
        }
    }

    /// Whether the controller runs software-defined networking.
    async fn software_defined(&self) -> Result<bool, CliError> {
        let info = self.ctx.client.system_info().await?;
        debug!(network_type = ?info.network_type, "Read network type");
        match info.network_type {
            NetworkType::SoftwareDefined => Ok(true),
            NetworkType::Physical => Ok(false),
            NetworkType::NotAvailable => {
                Err(CliError::Validation("network type is missing".into()))
            }
        }
    }

    async fn create<W: Write>(&self, out: &mut W, flags: CreateFlags<'_>) -> Result<(), CliError> {
        let sdn = self.software_defined().await?;
        let name = self.ctx.require(flags.name, "network name")?;
        let description = self.ctx.ask(flags.description, "network description", "")?;

        let task = if sdn {
            let routing_type = self
                .ctx
                .ask(flags.routing_type, "routing type", "ROUTED")?
                .parse::<RoutingType>()?;
            let size = match flags.size {
                Some(size) => size,
                None => parse_count(
                    &self.ctx.ask(None, "network size", DEFAULT_SUBNET_SIZE)?,
                    "network size",
                )?,
            };
            let project = self
                .ctx
                .resolve_project(flags.tenant, flags.project)
                .await?;
            let spec = SubnetCreateSpec {
                name,
                description,
                routing_type,
                size,
                reserved_static_ip_size: flags.static_ip_size,
            };
            self.ctx.client.create_subnet(&project.id, &spec).await?
        } else {
            let port_groups = split_list(&self.ctx.require(flags.port_groups, "port groups")?);
            let spec = NetworkCreateSpec {
                name,
                description,
                port_groups,
            };
            self.ctx.client.create_network(&spec).await?
        };

        let id = self.ctx.wait(&task).await?;
        info!(network_id = %id, software_defined = sdn, "Created network");

        if sdn {
            self.ctx
                .report(out, "network", "created", id, |id| async move {
                    self.ctx.client.get_subnet(&id).await
                })
                .await
        } else {
            self.ctx
                .report(out, "network", "created", id, |id| async move {
                    self.ctx.client.get_network(&id).await
                })
                .await
        }
    }

    async fn delete<W: Write>(&self, out: &mut W, id: &str) -> Result<(), CliError> {
        let sdn = self.software_defined().await?;
        if !self
            .ctx
            .confirm(&format!("Are you sure you want to delete network {id}?"))?
        {
            canceled(out, &self.ctx.output);
            return Ok(());
        }

        let task = if sdn {
            self.ctx.client.delete_subnet(id).await?
        } else {
            self.ctx.client.delete_network(id).await?
        };
        self.ctx.wait(&task).await?;
        self.ctx
            .output
            .emit(out, &Outcome::new("network", "deleted", id));
        Ok(())
    }

    async fn list<W: Write>(
        &self,
        out: &mut W,
        name: Option<&str>,
        tenant: Option<&str>,
        project: Option<&str>,
    ) -> Result<(), CliError> {
        if self.software_defined().await? {
            let project = self.ctx.resolve_project(tenant, project).await?;
            let subnets = self
                .ctx
                .walk(self.ctx.client.list_subnets(&project.id, name))
                .await?;
            self.ctx.output.emit(out, &subnets);
        } else {
            let networks = self.ctx.walk(self.ctx.client.list_networks(name)).await?;
            self.ctx.output.emit(out, &networks);
        }
        Ok(())
    }

    async fn show<W: Write>(&self, out: &mut W, id: &str) -> Result<(), CliError> {
        if self.software_defined().await? {
            let subnet = self.ctx.client.get_subnet(id).await?;
            self.ctx.output.emit(out, &subnet);
        } else {
            let network = self.ctx.client.get_network(id).await?;
            self.ctx.output.emit(out, &network);
        }
        Ok(())
    }

    async fn set_default<W: Write>(&self, out: &mut W, id: &str) -> Result<(), CliError> {
        let sdn = self.software_defined().await?;
        if !self
            .ctx
            .confirm(&format!("Are you sure you want to make network {id} the default?"))?
        {
            canceled(out, &self.ctx.output);
            return Ok(());
        }

        let task = if sdn {
            self.ctx.client.set_default_subnet(id).await?
        } else {
            self.ctx.client.set_default_network(id).await?
        };
        self.ctx.wait(&task).await?;

        let id = id.to_string();
        if sdn {
            self.ctx
                .report(out, "network", "set as default", id, |id| async move {
                    self.ctx.client.get_subnet(&id).await
                })
                .await
        } else {
            self.ctx
                .report(out, "network", "set as default", id, |id| async move {
                    self.ctx.client.get_network(&id).await
                })
                .await
        }
    }
}
