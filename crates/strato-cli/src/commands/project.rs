//! Project management command implementation.
//!
//! Projects live inside a tenant. Commands that need a tenant take
//! `--tenant`, falling back to the configured one.

use std::io::Write;

use strato_proto::specs::split_list;
use strato_proto::{ProjectCreateSpec, QuotaLineItem, ResourceQuota, SecurityGroupsSpec};
use tracing::info;

use crate::cli::ProjectCommands;
use crate::client::IamScope;
use crate::commands::{IamCommand, canceled, positional};
use crate::config::NamedRef;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{Message, Outcome, Selection};
use crate::transport::Transport;

/// Private CIDR of a new project's default router when none is given.
pub const DEFAULT_ROUTER_PRIVATE_IP_CIDR: &str = "192.168.0.0/16";

/// How the quota of a new project is chosen.
#[derive(Debug, Clone, PartialEq)]
enum QuotaSource {
    /// No quota.
    Unlimited,
    /// Explicit `key value unit` lines.
    Limits(Vec<QuotaLineItem>),
    /// A fraction of the tenant quota, in `(0, 1]`.
    Share(f64),
}

impl QuotaSource {
    fn from_flags(limits: Option<&str>, percent: Option<f64>) -> Result<Self, CliError> {
        match (limits, percent) {
            (Some(_), Some(_)) => Err(CliError::Validation(
                "can only specify one of '--limits' or '--percent'".into(),
            )),
            (Some(limits), None) => Ok(Self::Limits(QuotaLineItem::parse_list(limits)?)),
            (None, Some(percent)) if percent > 0.0 && percent <= 100.0 => {
                Ok(Self::Share(percent / 100.0))
            }
            (None, Some(percent)) => Err(CliError::Validation(format!(
                "percent must be in (0, 100], got {percent}"
            ))),
            (None, None) => Ok(Self::Unlimited),
        }
    }
}

/// Handler for project subcommands.
pub struct ProjectCommand<'a, T> {
    ctx: &'a Context<T>,
}

impl<'a, T: Transport> ProjectCommand<'a, T> {
    /// Creates a new project command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context<T>) -> Self {
        Self { ctx }
    }

    /// Executes the project subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        command: &ProjectCommands,
    ) -> Result<(), CliError> {
        match command {
            ProjectCommands::Create {
                pos,
                tenant,
                limits,
                percent,
                security_groups,
                default_router_private_ip_cidr,
            } => {
                let [name] = positional(&pos.args)?;
                let quota = QuotaSource::from_flags(limits.as_deref(), *percent)?;
                let spec = ProjectCreateSpec {
                    name: name.to_string(),
                    resource_quota: ResourceQuota::default(),
                    security_groups: security_groups.as_deref().map(split_list).unwrap_or_default(),
                    default_router_private_ip_cidr: default_router_private_ip_cidr
                        .clone()
                        .filter(|c| !c.is_empty())
                        .unwrap_or_else(|| DEFAULT_ROUTER_PRIVATE_IP_CIDR.to_string()),
                };
                self.create(out, tenant.as_deref(), spec, quota).await
            }
            ProjectCommands::Delete { pos } => {
                let [id] = positional(&pos.args)?;
                self.delete(out, id).await
            }
            ProjectCommands::Show { pos } => {
                let [id] = positional(&pos.args)?;
                let project = self.ctx.client.get_project(id).await?;
                self.ctx.output.emit(out, &project);
                Ok(())
            }
            ProjectCommands::Get => {
                let project = self.ctx.config.get().project;
                let selection = Selection {
                    kind: "project",
                    name: project.as_ref().map(|p| p.name.clone()),
                    id: project.map(|p| p.id),
                };
                self.ctx.output.emit(out, &selection);
                Ok(())
            }
            ProjectCommands::Set { pos, tenant } => {
                let [name] = positional(&pos.args)?;
                self.set(out, tenant.as_deref(), name).await
            }
            ProjectCommands::List { tenant } => {
                let tenant = self.ctx.resolve_tenant(tenant.as_deref()).await?;
                let projects = self
                    .ctx
                    .walk(self.ctx.client.list_projects(&tenant.id, None))
                    .await?;
                self.ctx.output.emit(out, &projects);
                Ok(())
            }
            ProjectCommands::Tasks { pos, state, kind } => {
                let [id] = positional(&pos.args)?;
                let tasks = self
                    .ctx
                    .walk(
                        self.ctx
                            .client
                            .project_tasks(id, state.as_deref(), kind.as_deref()),
                    )
                    .await?;
                self.ctx.output.emit(out, &tasks);
                Ok(())
            }
            ProjectCommands::SetSecurityGroups { pos } => {
                let [id, groups] = positional(&pos.args)?;
                self.set_security_groups(out, id, groups).await
            }
            ProjectCommands::Iam { command } => {
                IamCommand::new(self.ctx, IamScope::Project)
                    .execute(out, command)
                    .await
            }
        }
    }

    async fn create<W: Write>(
        &self,
        out: &mut W,
        tenant: Option<&str>,
        mut spec: ProjectCreateSpec,
        mut quota: QuotaSource,
    ) -> Result<(), CliError> {
        let tenant = self.ctx.resolve_tenant(tenant).await?;

        if quota == QuotaSource::Unlimited && !self.ctx.non_interactive {
            let limits = self.ctx.ask(None, "limits (key value unit, ...)", "")?;
            if !limits.is_empty() {
                quota = QuotaSource::Limits(QuotaLineItem::parse_list(&limits)?);
            }
        }

        if !self.ctx.confirm(&format!(
            "Create project '{}' in tenant '{}'?",
            spec.name, tenant.name
        ))? {
            canceled(out, &self.ctx.output);
            return Ok(());
        }

        spec.resource_quota = match quota {
            QuotaSource::Unlimited => ResourceQuota::default(),
            QuotaSource::Limits(items) => ResourceQuota::from_limits(&items),
            QuotaSource::Share(fraction) => self
                .ctx
                .client
                .get_tenant_quota(&tenant.id)
                .await?
                .scaled(fraction),
        };

        let task = self.ctx.client.create_project(&tenant.id, &spec).await?;
        let id = self.ctx.wait(&task).await?;
        info!(project_id = %id, tenant = %tenant.name, "Created project");

        self.ctx
            .report(out, "project", "created", id, |id| async move {
                self.ctx.client.get_project(&id).await
            })
            .await
    }

    async fn delete<W: Write>(&self, out: &mut W, id: &str) -> Result<(), CliError> {
        if !self
            .ctx
            .confirm(&format!("Are you sure you want to delete project {id}?"))?
        {
            canceled(out, &self.ctx.output);
            return Ok(());
        }

        let task = self.ctx.client.delete_project(id).await?;
        self.ctx.wait(&task).await?;

        if self.ctx.config.get().project.is_some_and(|p| p.id == id) {
            self.ctx.config.update(|c| c.project = None)?;
            info!(project_id = %id, "Cleared current project");
        }

        self.ctx
            .output
            .emit(out, &Outcome::new("project", "deleted", id));
        Ok(())
    }

    async fn set<W: Write>(
        &self,
        out: &mut W,
        tenant: Option<&str>,
        name: &str,
    ) -> Result<(), CliError> {
        let tenant = self.ctx.resolve_tenant(tenant).await?;
        let project = self.ctx.find_project(&tenant.id, name).await?;
        let selected = NamedRef::new(&project.name, &project.id);
        self.ctx.config.update(|c| {
            c.tenant = Some(tenant);
            c.project = Some(selected);
        })?;

        self.ctx.output.emit(
            out,
            &Message::success(format!("Project set to '{}'", project.name)),
        );
        Ok(())
    }

    async fn set_security_groups<W: Write>(
        &self,
        out: &mut W,
        id: &str,
        groups: &str,
    ) -> Result<(), CliError> {
        let spec = SecurityGroupsSpec {
            items: split_list(groups),
        };
        let task = self.ctx.client.set_project_security_groups(id, &spec).await?;
        self.ctx.wait(&task).await?;

        self.ctx
            .report(out, "project", "updated", id.to_string(), |id| async move {
                self.ctx.client.get_project(&id).await
            })
            .await
    }
}
