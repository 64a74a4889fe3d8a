//! Cluster command implementation.

use std::collections::BTreeMap;
use std::io::Write;

use strato_proto::{ClusterCreateSpec, ClusterResizeSpec, NetworkConnection};
use tracing::{debug, info};

use crate::cli::{ClusterCommands, ClusterCreateArgs};
use crate::commands::{canceled, parse_count, positional};
use crate::context::Context;
use crate::error::CliError;
use crate::output::{ClusterDetail, ClusterSummary, MasterVm, Outcome};
use crate::transport::Transport;

/// Handler for cluster subcommands.
pub struct ClusterCommand<'a, T> {
    ctx: &'a Context<T>,
}

impl<'a, T: Transport> ClusterCommand<'a, T> {
    /// Creates a new cluster command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context<T>) -> Self {
        Self { ctx }
    }

    /// Executes the cluster subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        command: &ClusterCommands,
    ) -> Result<(), CliError> {
        match command {
            ClusterCommands::Create(args) => self.create(out, args).await,
            ClusterCommands::Delete { pos } => {
                let [id] = positional(&pos.args)?;
                self.delete(out, id).await
            }
            ClusterCommands::Show { pos } => {
                let [id] = positional(&pos.args)?;
                self.show(out, id).await
            }
            ClusterCommands::List {
                tenant,
                project,
                summary,
            } => {
                let project = self
                    .ctx
                    .resolve_project(tenant.as_deref(), project.as_deref())
                    .await?;
                let clusters = self
                    .ctx
                    .walk(self.ctx.client.list_clusters(&project.id))
                    .await?;
                if *summary {
                    self.ctx
                        .output
                        .emit(out, &ClusterSummary::from_clusters(&clusters));
                } else {
                    self.ctx.output.emit(out, &clusters);
                }
                Ok(())
            }
            ClusterCommands::Resize { pos } => {
                let [id, count] = positional(&pos.args)?;
                let count = parse_count(count, "worker count")?;
                self.resize(out, id, count).await
            }
            ClusterCommands::ListVms { pos } => {
                let [id] = positional(&pos.args)?;
                let vms = self.ctx.walk(self.ctx.client.cluster_vms(id)).await?;
                self.ctx.output.emit(out, &vms);
                Ok(())
            }
        }
    }

    async fn create<W: Write>(&self, out: &mut W, args: &ClusterCreateArgs) -> Result<(), CliError> {
        let project = self
            .ctx
            .resolve_project(args.tenant.as_deref(), args.project.as_deref())
            .await?;

        let name = self.ctx.require(args.name.as_deref(), "cluster name")?;
        let kind = self
            .ctx
            .require(args.kind.as_deref(), "cluster type")?
            .to_ascii_uppercase();
        let vm_flavor = self.ctx.ask(args.vm_flavor.as_deref(), "VM flavor", "")?;
        let disk_flavor = self.ctx.ask(args.disk_flavor.as_deref(), "disk flavor", "")?;
        let worker_count = match args.worker_count {
            Some(count) => count,
            None => parse_count(&self.ctx.ask(None, "worker count", "1")?, "worker count")?,
        };

        let mut extended_properties = BTreeMap::new();
        for (key, value) in [
            ("dns", &args.dns),
            ("gateway", &args.gateway),
            ("netmask", &args.netmask),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                extended_properties.insert(key.to_string(), value.to_string());
            }
        }

        let spec = ClusterCreateSpec {
            name,
            kind,
            vm_flavor,
            disk_flavor,
            subnet_id: args.network_id.clone().filter(|n| !n.is_empty()),
            worker_count,
            extended_properties,
        };

        if !self.ctx.confirm(&format!(
            "Create {} cluster '{}' with {} worker(s) in project '{}'?",
            spec.kind, spec.name, spec.worker_count, project.name
        ))? {
            canceled(out, &self.ctx.output);
            return Ok(());
        }

        let task = self.ctx.client.create_cluster(&project.id, &spec).await?;
        let id = self.ctx.wait(&task).await?;
        info!(cluster_id = %id, name = %spec.name, "Created cluster");

        self.ctx
            .report(out, "cluster", "created", id, |id| async move {
                self.ctx.client.get_cluster(&id).await
            })
            .await
    }

    async fn delete<W: Write>(&self, out: &mut W, id: &str) -> Result<(), CliError> {
        if !self
            .ctx
            .confirm(&format!("Are you sure you want to delete cluster {id}?"))?
        {
            canceled(out, &self.ctx.output);
            return Ok(());
        }

        let task = self.ctx.client.delete_cluster(id).await?;
        self.ctx.wait(&task).await?;
        self.ctx
            .output
            .emit(out, &Outcome::new("cluster", "deleted", id));
        Ok(())
    }

    async fn show<W: Write>(&self, out: &mut W, id: &str) -> Result<(), CliError> {
        let cluster = self.ctx.client.get_cluster(id).await?;
        let vms = self.ctx.walk(self.ctx.client.cluster_vms(id)).await?;

        let mut masters = Vec::new();
        for vm in vms.into_iter().filter(|vm| vm.is_cluster_master(id)) {
            let task = self.ctx.client.vm_networks(&vm.id).await?;
            let task = self.ctx.wait_task(&task).await?;
            let connections =
                NetworkConnection::from_resource_properties(task.resource_properties.as_ref());
            debug!(vm_id = %vm.id, connections = connections.len(), "Resolved master networks");
            masters.push(MasterVm {
                vm_id: vm.id,
                name: vm.name,
                connections,
            });
        }

        self.ctx
            .output
            .emit(out, &ClusterDetail { cluster, masters });
        Ok(())
    }

    async fn resize<W: Write>(&self, out: &mut W, id: &str, count: u32) -> Result<(), CliError> {
        let spec = ClusterResizeSpec {
            new_worker_count: count,
        };
        let task = self.ctx.client.resize_cluster(id, &spec).await?;
        self.ctx.wait(&task).await?;
        info!(cluster_id = %id, workers = count, "Resized cluster");

        self.ctx
            .report(out, "cluster", "resized", id.to_string(), |id| async move {
                self.ctx.client.get_cluster(&id).await
            })
            .await
    }
}
