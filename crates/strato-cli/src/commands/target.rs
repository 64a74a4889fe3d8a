//! Target command implementation.
//!
//! These verbs only touch the config store, so they run without an
//! endpoint or a transport.

use std::io::Write;

use crate::cli::TargetCommands;
use crate::commands::positional;
use crate::config::ConfigStore;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{Message, OutputFormat, TargetInfo};
use crate::prompt::Prompter;
use crate::transport::Transport;

/// Handler for target subcommands.
pub struct TargetCommand<'a> {
    config: &'a ConfigStore,
    output: OutputFormat,
    prompter: &'a dyn Prompter,
    non_interactive: bool,
}

impl<'a> TargetCommand<'a> {
    /// Creates a new target command handler.
    #[must_use]
    pub const fn new(
        config: &'a ConfigStore,
        output: OutputFormat,
        prompter: &'a dyn Prompter,
        non_interactive: bool,
    ) -> Self {
        Self {
            config,
            output,
            prompter,
            non_interactive,
        }
    }

    /// Creates a handler sharing the config store of `ctx`.
    #[must_use]
    pub fn from_context<T: Transport>(ctx: &'a Context<T>) -> Self {
        Self::new(
            &ctx.config,
            ctx.output,
            ctx.prompter.as_ref(),
            ctx.non_interactive,
        )
    }

    /// Executes the target subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the config cannot be written or a value is invalid.
    pub fn execute<W: Write>(&self, out: &mut W, command: &TargetCommands) -> Result<(), CliError> {
        match command {
            TargetCommands::Set { pos } => {
                let [endpoint] = positional(&pos.args)?;
                self.set(out, endpoint)
            }
            TargetCommands::Show => {
                let config = self.config.get();
                let info = TargetInfo {
                    endpoint: config.endpoint,
                    logged_in: config.token.is_some(),
                    tenant: config.tenant.map(|t| t.name),
                    project: config.project.map(|p| p.name),
                };
                self.output.emit(out, &info);
                Ok(())
            }
            TargetCommands::Login { access_token } => self.login(out, access_token.as_deref()),
            TargetCommands::Logout => {
                self.config.update(|c| c.token = None)?;
                self.output.emit(out, &Message::success("Logged out"));
                Ok(())
            }
        }
    }

    fn set<W: Write>(&self, out: &mut W, endpoint: &str) -> Result<(), CliError> {
        let endpoint = endpoint.trim_end_matches('/');
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(CliError::Validation(format!(
                "endpoint must start with http:// or https://, got '{endpoint}'"
            )));
        }

        self.config.update(|c| {
            if c.endpoint.as_deref() != Some(endpoint) {
                c.tenant = None;
                c.project = None;
                c.token = None;
            }
            c.endpoint = Some(endpoint.to_string());
        })?;

        self.output
            .emit(out, &Message::success(format!("Target set to '{endpoint}'")));
        Ok(())
    }

    fn login<W: Write>(&self, out: &mut W, access_token: Option<&str>) -> Result<(), CliError> {
        let token = match access_token.filter(|t| !t.is_empty()) {
            Some(token) => token.to_string(),
            None if self.non_interactive => {
                return Err(CliError::Validation("access token is required".into()));
            }
            None => self.prompter.password("Access token")?,
        };
        if token.is_empty() {
            return Err(CliError::Validation("access token is required".into()));
        }

        self.config.update(|c| c.token = Some(token))?;
        self.output.emit(out, &Message::success("Logged in"));
        Ok(())
    }
}
