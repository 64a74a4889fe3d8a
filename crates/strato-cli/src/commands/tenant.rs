//! Tenant management command implementation.

use std::io::Write;

use strato_proto::TenantCreateSpec;
use strato_proto::specs::split_list;
use tracing::info;

use crate::cli::TenantCommands;
use crate::commands::{canceled, positional};
use crate::config::NamedRef;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{Message, Outcome, Selection};
use crate::transport::Transport;

/// Handler for tenant subcommands.
pub struct TenantCommand<'a, T> {
    ctx: &'a Context<T>,
}

impl<'a, T: Transport> TenantCommand<'a, T> {
    /// Creates a new tenant command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context<T>) -> Self {
        Self { ctx }
    }

    /// Executes the tenant subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        command: &TenantCommands,
    ) -> Result<(), CliError> {
        match command {
            TenantCommands::List => self.list(out).await,
            TenantCommands::Create {
                pos,
                security_groups,
            } => {
                let [name] = positional(&pos.args)?;
                self.create(out, name, security_groups.as_deref()).await
            }
            TenantCommands::Delete { pos } => {
                let [id] = positional(&pos.args)?;
                self.delete(out, id).await
            }
            TenantCommands::Show { pos } => {
                let [id] = positional(&pos.args)?;
                self.show(out, id).await
            }
            TenantCommands::Set { pos } => {
                let [name] = positional(&pos.args)?;
                self.set(out, name).await
            }
            TenantCommands::Get => self.get(out),
        }
    }

    async fn list<W: Write>(&self, out: &mut W) -> Result<(), CliError> {
        let tenants = self.ctx.walk(self.ctx.client.list_tenants(None)).await?;
        self.ctx.output.emit(out, &tenants);
        Ok(())
    }

    async fn create<W: Write>(
        &self,
        out: &mut W,
        name: &str,
        security_groups: Option<&str>,
    ) -> Result<(), CliError> {
        let spec = TenantCreateSpec {
            name: name.to_string(),
            security_groups: security_groups.map(split_list).unwrap_or_default(),
        };

        let task = self.ctx.client.create_tenant(&spec).await?;
        let id = self.ctx.wait(&task).await?;
        info!(tenant_id = %id, name, "Created tenant");

        self.ctx
            .report(out, "tenant", "created", id, |id| async move {
                self.ctx.client.get_tenant(&id).await
            })
            .await
    }

    async fn delete<W: Write>(&self, out: &mut W, id: &str) -> Result<(), CliError> {
        if !self
            .ctx
            .confirm(&format!("Are you sure you want to delete tenant {id}?"))?
        {
            canceled(out, &self.ctx.output);
            return Ok(());
        }

        let task = self.ctx.client.delete_tenant(id).await?;
        self.ctx.wait(&task).await?;

        if self.ctx.config.get().tenant.is_some_and(|t| t.id == id) {
            self.ctx.config.update(|c| {
                c.tenant = None;
                c.project = None;
            })?;
        }

        self.ctx
            .output
            .emit(out, &Outcome::new("tenant", "deleted", id));
        Ok(())
    }

    async fn show<W: Write>(&self, out: &mut W, id: &str) -> Result<(), CliError> {
        let tenant = self.ctx.client.get_tenant(id).await?;
        self.ctx.output.emit(out, &tenant);
        Ok(())
    }

    async fn set<W: Write>(&self, out: &mut W, name: &str) -> Result<(), CliError> {
        let tenant = self.ctx.find_tenant(name).await?;
        let selected = NamedRef::new(&tenant.name, &tenant.id);
        self.ctx.config.update(|c| {
            if c.tenant.as_ref() != Some(&selected) {
                c.project = None;
            }
            c.tenant = Some(selected);
        })?;

        self.ctx.output.emit(
            out,
            &Message::success(format!("Tenant set to '{}'", tenant.name)),
        );
        Ok(())
    }

    fn get<W: Write>(&self, out: &mut W) -> Result<(), CliError> {
        let tenant = self.ctx.config.get().tenant;
        let selection = Selection {
            kind: "tenant",
            name: tenant.as_ref().map(|t| t.name.clone()),
            id: tenant.map(|t| t.id),
        };
        self.ctx.output.emit(out, &selection);
        Ok(())
    }
}
