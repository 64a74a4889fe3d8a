//! Image command implementation.
//!
//! Images are uploaded as multipart files, either into the infrastructure
//! scope or into a project.

use std::io::Write;
use std::path::{Path, PathBuf};

use strato_proto::{ImageCreateOptions, ImageReplication};
use tracing::info;

use crate::cli::ImageCommands;
use crate::client::IamScope;
use crate::commands::{IamCommand, canceled, optional_arg, positional};
use crate::context::Context;
use crate::error::CliError;
use crate::output::Outcome;
use crate::transport::Transport;

/// Where an uploaded image is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageScope {
    Infrastructure,
    Project,
}

impl ImageScope {
    fn parse(value: &str) -> Result<Self, CliError> {
        match value {
            "infrastructure" | "infra" => Ok(Self::Infrastructure),
            "project" => Ok(Self::Project),
            other => Err(CliError::Validation(format!(
                "{other} is not a supported scope, use infrastructure, infra or project"
            ))),
        }
    }
}

/// Flags of `image create`.
#[derive(Debug, Clone, Copy)]
struct UploadFlags<'f> {
    name: Option<&'f str>,
    replication: Option<&'f str>,
    scope: Option<&'f str>,
    tenant: Option<&'f str>,
    project: Option<&'f str>,
}

/// Handler for image subcommands.
pub struct ImageCommand<'a, T> {
    ctx: &'a Context<T>,
}

impl<'a, T: Transport> ImageCommand<'a, T> {
    /// Creates a new image command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context<T>) -> Self {
        Self { ctx }
    }

    /// Executes the image subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        command: &ImageCommands,
    ) -> Result<(), CliError> {
        match command {
            ImageCommands::Create {
                pos,
                name,
                image_replication,
                scope,
                project,
                tenant,
            } => {
                let path = optional_arg(&pos.args)?;
                let flags = UploadFlags {
                    name: name.as_deref(),
                    replication: image_replication.as_deref(),
                    scope: scope.as_deref(),
                    tenant: tenant.as_deref(),
                    project: project.as_deref(),
                };
                self.create(out, path, flags).await
            }
            ImageCommands::Delete { pos } => {
                let [id] = positional(&pos.args)?;
                self.delete(out, id).await
            }
            ImageCommands::List { name } => {
                let images = self
                    .ctx
                    .walk(self.ctx.client.list_images(name.as_deref()))
                    .await?;
                self.ctx.output.emit(out, &images);
                Ok(())
            }
            ImageCommands::Show { pos } => {
                let id = optional_arg(&pos.args)?;
                let id = self.ctx.require(id, "image id")?;
                let image = self.ctx.client.get_image(&id).await?;
                self.ctx.output.emit(out, &image);
                Ok(())
            }
            ImageCommands::Tasks { pos, state } => {
                let [id] = positional(&pos.args)?;
                let tasks = self
                    .ctx
                    .walk(self.ctx.client.image_tasks(id, state.as_deref()))
                    .await?;
                self.ctx.output.emit(out, &tasks);
                Ok(())
            }
            ImageCommands::Iam { command } => {
                IamCommand::new(self.ctx, IamScope::Image)
                    .execute(out, command)
                    .await
            }
        }
    }

    async fn create<W: Write>(
        &self,
        out: &mut W,
        path: Option<&str>,
        flags: UploadFlags<'_>,
    ) -> Result<(), CliError> {
        let path = PathBuf::from(self.ctx.require(path, "image path")?);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(CliError::Validation(format!(
                "no such image file at '{}'",
                path.display()
            )));
        }

        let default_name = file_name(&path);
        let name = self.ctx.ask(flags.name, "image name", &default_name)?;
        let name = if name.is_empty() { default_name } else { name };

        let replication = if self.ctx.non_interactive {
            flags.replication.map(str::to_string)
        } else {
            Some(self.ctx.ask(flags.replication, "image replication type", "EAGER")?)
        };
        let options = ImageCreateOptions {
            replication_type: replication
                .filter(|r| !r.is_empty())
                .map(|r| r.parse::<ImageReplication>())
                .transpose()?,
        };

        let default_scope = if self.ctx.non_interactive && flags.project.is_none() {
            "infrastructure"
        } else {
            "project"
        };
        let scope = ImageScope::parse(&self.ctx.ask(flags.scope, "image scope", default_scope)?)?;
        let project_id = match scope {
            ImageScope::Infrastructure => None,
            ImageScope::Project => Some(
                self.ctx
                    .resolve_project(flags.tenant, flags.project)
                    .await?
                    .id,
            ),
        };

        let task = self
            .ctx
            .client
            .upload_image(project_id.as_deref(), path, &name, &options)
            .await?;
        let id = self.ctx.wait(&task).await?;
        info!(image_id = %id, name = %name, "Uploaded image");

        self.ctx
            .report(out, "image", "created", id, |id| async move {
                self.ctx.client.get_image(&id).await
            })
            .await
    }

    async fn delete<W: Write>(&self, out: &mut W, id: &str) -> Result<(), CliError> {
        if !self
            .ctx
            .confirm(&format!("Are you sure you want to delete image {id}?"))?
        {
            canceled(out, &self.ctx.output);
            return Ok(());
        }

        let task = self.ctx.client.delete_image(id).await?;
        self.ctx.wait(&task).await?;
        self.ctx
            .output
            .emit(out, &Outcome::new("image", "deleted", id));
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("infrastructure", ImageScope::Infrastructure ; "long")]
    #[test_case("infra", ImageScope::Infrastructure ; "short")]
    #[test_case("project", ImageScope::Project ; "project")]
    fn scopes(value: &str, expected: ImageScope) {
        assert_eq!(ImageScope::parse(value).unwrap(), expected);
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let err = ImageScope::parse("tenant").unwrap_err();
        assert!(err.to_string().contains("tenant is not a supported scope"));
    }

    #[test]
    fn file_name_of_path() {
        assert_eq!(file_name(Path::new("/tmp/images/ubuntu.ova")), "ubuntu.ova");
    }
}
