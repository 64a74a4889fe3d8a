//! Strato CLI binary entrypoint.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use strato_cli::cli::{Cli, Commands};
use strato_cli::client::ApiClient;
use strato_cli::commands::{TargetCommand, dispatch};
use strato_cli::config::ConfigStore;
use strato_cli::context::Context;
use strato_cli::output::OutputFormat;
use strato_cli::poller::PollPolicy;
use strato_cli::prompt::TerminalPrompter;
use strato_cli::transport::HttpTransport;
use strato_cli::CliError;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<ConfigStore, CliError> {
    let path = cli
        .config
        .clone()
        .or_else(ConfigStore::default_path)
        .ok_or_else(|| CliError::Config("cannot determine the config directory".into()))?;
    debug!(path = %path.display(), "Loading config");
    ConfigStore::load(path)
}

fn poll_policy(cli: &Cli) -> PollPolicy {
    let policy = PollPolicy::default().with_interval(Duration::from_millis(cli.poll_interval));
    match cli.timeout {
        Some(seconds) => policy.with_timeout(Duration::from_secs(seconds)),
        None => policy,
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;
    let output = OutputFormat::resolve(cli.format, cli.non_interactive);
    let mut stdout = io::stdout().lock();

    // Target verbs configure the endpoint, so they must work without one.
    if let Commands::Target { command } = &cli.command {
        return TargetCommand::new(&config, output, &TerminalPrompter, cli.non_interactive)
            .execute(&mut stdout, command);
    }

    let stored = config.get();
    let endpoint = cli.endpoint.clone().or(stored.endpoint).ok_or_else(|| {
        CliError::Config("no endpoint, use --endpoint or 'strato target set <endpoint>'".into())
    })?;
    let token = cli.token.clone().or(stored.token);
    let transport = HttpTransport::new(&endpoint, token)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let ctx = Context::new(ApiClient::new(transport), config)
        .with_output(output)
        .with_non_interactive(cli.non_interactive)
        .with_policy(poll_policy(&cli))
        .with_prompter(Arc::new(TerminalPrompter))
        .with_cancel(cancel);

    dispatch(&ctx, &mut stdout, &cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_from_flags() {
        let cli = Cli::parse_from([
            "strato",
            "--poll-interval",
            "250",
            "--timeout",
            "60",
            "system",
            "status",
        ]);
        let policy = poll_policy(&cli);
        assert_eq!(policy.interval, Duration::from_millis(250));
        assert_eq!(policy.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn policy_without_timeout_waits_forever() {
        let cli = Cli::parse_from(["strato", "system", "status"]);
        assert!(poll_policy(&cli).timeout.is_none());
    }

    #[test]
    fn explicit_config_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strato.toml");
        let cli = Cli::parse_from([
            "strato",
            "--config",
            path.to_str().unwrap(),
            "system",
            "status",
        ]);
        let store = load_config(&cli).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn missing_endpoint_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strato.toml");
        let mut cli = Cli::parse_from([
            "strato",
            "--config",
            path.to_str().unwrap(),
            "system",
            "status",
        ]);
        cli.endpoint = None;
        let err = run(cli).await.unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
