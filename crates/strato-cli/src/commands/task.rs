//! Task inspection command implementation.

use std::io::Write;

use crate::cli::TaskCommands;
use crate::client::TaskFilter;
use crate::commands::positional;
use crate::context::Context;
use crate::error::CliError;
use crate::poller::wait_for_task_completion;
use crate::transport::Transport;

/// Handler for task subcommands.
pub struct TaskCommand<'a, T> {
    ctx: &'a Context<T>,
}

impl<'a, T: Transport> TaskCommand<'a, T> {
    /// Creates a new task command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context<T>) -> Self {
        Self { ctx }
    }

    /// Executes the task subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        command: &TaskCommands,
    ) -> Result<(), CliError> {
        match command {
            TaskCommands::Show { pos } => {
                let [id] = positional(&pos.args)?;
                let task = self.ctx.client.get_task(id).await?;
                self.ctx.output.emit(out, &task);
                Ok(())
            }
            TaskCommands::List {
                entity_id,
                entity_kind,
                state,
            } => {
                let filter = TaskFilter {
                    entity_id: entity_id.clone(),
                    entity_kind: entity_kind.clone(),
                    state: state.clone(),
                };
                let tasks = self.ctx.walk(self.ctx.client.list_tasks(&filter)).await?;
                self.ctx.output.emit(out, &tasks);
                Ok(())
            }
            TaskCommands::Monitor { pos } => {
                let [id] = positional(&pos.args)?;
                // Progress goes to stderr so stdout carries only the result.
                let policy = self.ctx.policy.clone().with_progress(|task| {
                    eprintln!("Task {} is {}", task.id, task.state);
                });
                let task =
                    wait_for_task_completion(&self.ctx.client, id, &policy, &self.ctx.cancel)
                        .await?;
                self.ctx.output.emit(out, &task);
                Ok(())
            }
        }
    }
}
