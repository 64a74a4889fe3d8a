//! Per-invocation command context.
//!
//! A [`Context`] is built once in `main` from the resolved flags and config
//! file, then passed by reference to the command handlers. It bundles
//! everything a handler needs: the REST client, the config store, the output
//! format, the poll policy, the prompter and the cancellation token.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use strato_proto::{Page, Project, Task, Tenant};
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::config::{ConfigStore, NamedRef};
use crate::error::CliError;
use crate::output::{Outcome, OutputFormat, TableDisplay};
use crate::poller::{PollPolicy, wait_for_task, wait_for_task_completion};
use crate::prompt::{Prompter, TerminalPrompter};
use crate::transport::{HttpTransport, Transport};
use crate::walker::{PageFetcher, walk};

/// Everything a command handler needs.
pub struct Context<T = HttpTransport> {
    /// REST client.
    pub client: ApiClient<T>,
    /// Config store.
    pub config: ConfigStore,
    /// Output format.
    pub output: OutputFormat,
    /// Suppress prompts and confirmations.
    pub non_interactive: bool,
    /// How to wait for tasks.
    pub policy: PollPolicy,
    /// Source of answers for missing fields.
    pub prompter: Arc<dyn Prompter>,
    /// Fires when the user interrupts the command.
    pub cancel: CancellationToken,
}

impl<T: Transport> Context<T> {
    /// Create a context with table output, interactive prompts and the
    /// default poll policy.
    #[must_use]
    pub fn new(client: ApiClient<T>, config: ConfigStore) -> Self {
        Self {
            client,
            config,
            output: OutputFormat::default(),
            non_interactive: false,
            policy: PollPolicy::default(),
            prompter: Arc::new(TerminalPrompter),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the output format.
    #[must_use]
    pub const fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    /// Enable or disable non-interactive mode.
    #[must_use]
    pub const fn with_non_interactive(mut self, non_interactive: bool) -> Self {
        self.non_interactive = non_interactive;
        self
    }

    /// Set the poll policy.
    #[must_use]
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the prompter.
    #[must_use]
    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    // ========================================================================
    // Tasks and pages
    // ========================================================================

    /// Wait for `task` to complete and return its entity id.
    pub async fn wait(&self, task: &Task) -> Result<String, CliError> {
        wait_for_task(&self.client, &task.id, &self.policy, &self.cancel).await
    }

    /// Wait for `task` to complete and return the completed task.
    pub async fn wait_task(&self, task: &Task) -> Result<Task, CliError> {
        wait_for_task_completion(&self.client, &task.id, &self.policy, &self.cancel).await
    }

    /// Await the first page and collect the whole collection.
    pub async fn walk<R, Fut>(&self, first: Fut) -> Result<Vec<R>, CliError>
    where
        ApiClient<T>: PageFetcher<R>,
        Fut: Future<Output = Result<Page<R>, CliError>>,
    {
        walk(first, &self.client, &self.cancel).await
    }

    /// Print the result of a mutating command.
    ///
    /// JSON output fetches the entity once by id and prints it; the other
    /// formats print a short outcome line.
    pub async fn report<W, R, F, Fut>(
        &self,
        writer: &mut W,
        resource: &str,
        action: &str,
        id: String,
        fetch: F,
    ) -> Result<(), CliError>
    where
        W: Write,
        R: Serialize + TableDisplay,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<R, CliError>>,
    {
        if self.output.is_json() && !id.is_empty() {
            let entity = fetch(id).await?;
            self.output.emit(writer, &entity);
        } else {
            self.output.emit(writer, &Outcome::new(resource, action, id));
        }
        Ok(())
    }

    // ========================================================================
    // Prompts
    // ========================================================================

    /// Use `value` if set, else ask for it. Non-interactive mode fails
    /// instead of asking.
    pub fn require(&self, value: Option<&str>, field: &str) -> Result<String, CliError> {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            return Ok(value.to_string());
        }
        if self.non_interactive {
            return Err(CliError::Validation(format!("{field} is required")));
        }
        let answer = self.prompter.input(&capitalize_field(field), None)?;
        if answer.trim().is_empty() {
            return Err(CliError::Validation(format!("{field} is required")));
        }
        Ok(answer.trim().to_string())
    }

    /// Use `value` if set, else ask with `default` offered. Non-interactive
    /// mode takes the default.
    pub fn ask(&self, value: Option<&str>, field: &str, default: &str) -> Result<String, CliError> {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            return Ok(value.to_string());
        }
        if self.non_interactive {
            return Ok(default.to_string());
        }
        let answer = self.prompter.input(&capitalize_field(field), Some(default))?;
        Ok(answer.trim().to_string())
    }

    /// Use `value` if set, else ask for a secret.
    pub fn require_secret(&self, value: Option<&str>, field: &str) -> Result<String, CliError> {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            return Ok(value.to_string());
        }
        if self.non_interactive {
            return Err(CliError::Validation(format!("{field} is required")));
        }
        let answer = self.prompter.password(&capitalize_field(field))?;
        if answer.is_empty() {
            return Err(CliError::Validation(format!("{field} is required")));
        }
        Ok(answer)
    }

    /// Ask for confirmation. Non-interactive mode counts as confirmed.
    pub fn confirm(&self, prompt: &str) -> Result<bool, CliError> {
        if self.non_interactive {
            return Ok(true);
        }
        self.prompter.confirm(prompt)
    }

    // ========================================================================
    // Tenant and project resolution
    // ========================================================================

    /// Find a tenant by exact name.
    pub async fn find_tenant(&self, name: &str) -> Result<Tenant, CliError> {
        let tenants = self.walk(self.client.list_tenants(Some(name))).await?;
        single_named(tenants, name, "tenant", |t| &t.name)
    }

    /// Find a project of `tenant_id` by exact name.
    pub async fn find_project(&self, tenant_id: &str, name: &str) -> Result<Project, CliError> {
        let projects = self
            .walk(self.client.list_projects(tenant_id, Some(name)))
            .await?;
        single_named(projects, name, "project", |p| &p.name)
    }

    /// The tenant named by `explicit`, else the configured one, else the one
    /// the user names at the prompt.
    pub async fn resolve_tenant(&self, explicit: Option<&str>) -> Result<NamedRef, CliError> {
        if let Some(name) = explicit.filter(|n| !n.is_empty()) {
            let tenant = self.find_tenant(name).await?;
            return Ok(NamedRef::new(tenant.name, tenant.id));
        }
        if let Some(tenant) = self.config.get().tenant {
            return Ok(tenant);
        }
        if self.non_interactive {
            return Err(CliError::Validation(
                "no tenant selected, use --tenant or 'strato tenant set <name>'".into(),
            ));
        }
        let name = self.require(None, "tenant name")?;
        let tenant = self.find_tenant(&name).await?;
        Ok(NamedRef::new(tenant.name, tenant.id))
    }

    /// The project named by `explicit` inside the resolved tenant, else the
    /// configured one, else the one the user names at the prompt.
    pub async fn resolve_project(
        &self,
        tenant: Option<&str>,
        explicit: Option<&str>,
    ) -> Result<NamedRef, CliError> {
        if let Some(name) = explicit.filter(|n| !n.is_empty()) {
            let tenant = self.resolve_tenant(tenant).await?;
            let project = self.find_project(&tenant.id, name).await?;
            return Ok(NamedRef::new(project.name, project.id));
        }
        if tenant.is_none() {
            if let Some(project) = self.config.get().project {
                return Ok(project);
            }
        }
        if self.non_interactive {
            return Err(CliError::Validation(
                "no project selected, use --project or 'strato project set <name>'".into(),
            ));
        }
        let tenant = self.resolve_tenant(tenant).await?;
        let name = self.require(None, "project name")?;
        let project = self.find_project(&tenant.id, &name).await?;
        Ok(NamedRef::new(project.name, project.id))
    }
}

fn single_named<R>(
    items: Vec<R>,
    name: &str,
    kind: &str,
    name_of: impl Fn(&R) -> &String,
) -> Result<R, CliError> {
    let mut matches: Vec<R> = items.into_iter().filter(|r| name_of(r) == name).collect();
    match matches.len() {
        0 => Err(CliError::NotFound(format!("{kind} named '{name}'"))),
        1 => Ok(matches.remove(0)),
        n => Err(CliError::Validation(format!(
            "{n} {kind}s are named '{name}', use the id instead"
        ))),
    }
}

fn capitalize_field(field: &str) -> String {
    let mut chars = field.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
