//! IAM command implementation, shared by images and projects.

use std::io::Write;

use strato_proto::{PolicyAction, PolicyDelta};
use tracing::info;

use crate::cli::{IamChangeArgs, IamCommands};
use crate::client::IamScope;
use crate::commands::positional;
use crate::context::Context;
use crate::error::CliError;
use crate::transport::Transport;

/// Handler for `image iam` and `project iam`.
pub struct IamCommand<'a, T> {
    ctx: &'a Context<T>,
    scope: IamScope,
}

impl<'a, T: Transport> IamCommand<'a, T> {
    /// Creates an IAM handler for resources of `scope`.
    #[must_use]
    pub const fn new(ctx: &'a Context<T>, scope: IamScope) -> Self {
        Self { ctx, scope }
    }

    /// Executes the IAM subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        command: &IamCommands,
    ) -> Result<(), CliError> {
        match command {
            IamCommands::Show { pos } => {
                let [id] = positional(&pos.args)?;
                let policy = self.ctx.client.get_iam(self.scope, id).await?;
                self.ctx.output.emit(out, &policy);
                Ok(())
            }
            IamCommands::Add(args) => self.modify(out, args, PolicyAction::Add).await,
            IamCommands::Remove(args) => self.modify(out, args, PolicyAction::Remove).await,
        }
    }

    async fn modify<W: Write>(
        &self,
        out: &mut W,
        args: &IamChangeArgs,
        action: PolicyAction,
    ) -> Result<(), CliError> {
        let [id] = positional(&args.pos.args)?;
        let principal = self.ctx.require(args.principal.as_deref(), "principal")?;
        let role = self.ctx.require(args.role.as_deref(), "role")?;

        let delta = PolicyDelta {
            principal,
            action,
            role,
        };
        let task = self.ctx.client.modify_iam(self.scope, id, &delta).await?;
        self.ctx.wait(&task).await?;
        info!(
            resource = self.scope.noun(),
            id,
            %action,
            principal = %delta.principal,
            role = %delta.role,
            "Changed IAM policy"
        );

        let scope = self.scope;
        self.ctx
            .report(
                out,
                scope.noun(),
                "IAM policy updated",
                id.to_string(),
                |id| async move { self.ctx.client.get_iam(scope, &id).await },
            )
            .await
    }
}
