//! # strato-cli
//!
//! Command-line client for the Strato control plane.
//!
//! Provides commands for:
//! - Tenants, projects and the current selection
//! - Images, networks and clusters
//! - Hosts, deployments and their teardown
//! - Task inspection, control-plane status and deployment from a map file
//!
//! # Architecture
//!
//! Mutating REST calls return a server-side task. The CLI waits for it with
//! the [`poller`], and collects paged listings with the [`walker`]. Handlers
//! in [`commands`] get everything else from a per-invocation
//! [`context::Context`].
//!
//! ```text
//! ┌───────────┐   REST (JSON, tasks)   ┌──────────────┐
//! │  strato   │◄──────────────────────►│  controller  │
//! └───────────┘        HTTPS           └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod context;
pub mod dc_map;
pub mod error;
pub mod output;
pub mod poller;
pub mod prompt;
pub mod transport;
pub mod walker;

pub use cli::{Cli, Commands, Format};
pub use client::ApiClient;
pub use config::{Config, ConfigStore};
pub use context::Context;
pub use error::CliError;
pub use output::OutputFormat;
pub use poller::{PollPolicy, wait_for_task, wait_for_task_completion};
pub use transport::{HttpTransport, Transport};
#[cfg(any(test, feature = "test-util"))]
pub use transport::MockTransport;
pub use walker::{collect_all, walk};
