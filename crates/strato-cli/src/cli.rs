//! Command-line argument parsing with clap.
//!
//! Positional arguments are collected as plain lists and their count is
//! checked by each handler, so a wrong count surfaces as
//! [`crate::CliError::ArgumentCount`] instead of a usage error.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Strato CLI - manage a cloud control plane.
#[derive(Parser, Debug, Clone)]
#[command(name = "strato")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Controller endpoint, overriding the configured target.
    #[arg(short, long, global = true, env = "STRATO_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Never prompt; confirmations count as accepted.
    #[arg(short, long, global = true)]
    pub non_interactive: bool,

    /// Output format. Defaults to script lines when non-interactive, tables otherwise.
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<Format>,

    /// Delay between task polls, in milliseconds.
    #[arg(long, global = true, value_name = "MS", default_value_t = 1000)]
    pub poll_interval: u64,

    /// Give up waiting for a task after this many seconds.
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Bearer token, overriding the stored one.
    #[arg(long, global = true, env = "STRATO_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Config file location.
    #[arg(long, global = true, env = "STRATO_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// Tab-separated lines without headers.
    Script,
    /// JSON output for tooling.
    Json,
}

/// Positional arguments of a verb.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct Positional {
    /// Positional arguments.
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Tenant management.
    Tenant {
        /// Tenant subcommand to execute.
        #[command(subcommand)]
        command: TenantCommands,
    },

    /// Project management.
    Project {
        /// Project subcommand to execute.
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Image management.
    Image {
        /// Image subcommand to execute.
        #[command(subcommand)]
        command: ImageCommands,
    },

    /// Network management.
    Network {
        /// Network subcommand to execute.
        #[command(subcommand)]
        command: NetworkCommands,
    },

    /// Cluster management.
    Cluster {
        /// Cluster subcommand to execute.
        #[command(subcommand)]
        command: ClusterCommands,
    },

    /// Host management.
    Host {
        /// Host subcommand to execute.
        #[command(subcommand)]
        command: HostCommands,
    },

    /// Deployment management.
    Deployment {
        /// Deployment subcommand to execute.
        #[command(subcommand)]
        command: DeploymentCommands,
    },

    /// Task inspection.
    Task {
        /// Task subcommand to execute.
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Control-plane status.
    System {
        /// System subcommand to execute.
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Target endpoint and credentials.
    Target {
        /// Target subcommand to execute.
        #[command(subcommand)]
        command: TargetCommands,
    },
}

/// Tenant subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum TenantCommands {
    /// List all tenants.
    List,

    /// Create a tenant: `tenant create <name>`.
    Create {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
        /// Comma-separated security groups.
        #[arg(long)]
        security_groups: Option<String>,
    },

    /// Delete a tenant: `tenant delete <id>`.
    Delete {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Show a tenant: `tenant show <id>`.
    Show {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Select the current tenant: `tenant set <name>`.
    Set {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Show the current tenant.
    Get,
}

/// Project subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ProjectCommands {
    /// Create a project: `project create <name>`.
    Create {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
        /// Tenant name, defaults to the current tenant.
        #[arg(long)]
        tenant: Option<String>,
        /// Limits as comma-separated `key value unit` triples.
        #[arg(long)]
        limits: Option<String>,
        /// Share of the tenant quota, 0 to 100.
        #[arg(long)]
        percent: Option<f64>,
        /// Comma-separated security groups.
        #[arg(long)]
        security_groups: Option<String>,
        /// Private CIDR of the project's default router.
        #[arg(long)]
        default_router_private_ip_cidr: Option<String>,
    },

    /// Delete a project: `project delete <id>`.
    Delete {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Show a project: `project show <id>`.
    Show {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Show the current project.
    Get,

    /// Select the current project: `project set <name>`.
    Set {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
        /// Tenant name, defaults to the current tenant.
        #[arg(long)]
        tenant: Option<String>,
    },

    /// List the projects of a tenant.
    List {
        /// Tenant name, defaults to the current tenant.
        #[arg(long)]
        tenant: Option<String>,
    },

    /// List the tasks of a project: `project tasks <id>`.
    Tasks {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
        /// Only tasks in this state.
        #[arg(long)]
        state: Option<String>,
        /// Only tasks on this entity kind.
        #[arg(long)]
        kind: Option<String>,
    },

    /// Replace security groups: `project set-security-groups <id> <groups>`.
    SetSecurityGroups {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Identity and access management of a project.
    Iam {
        /// IAM subcommand to execute.
        #[command(subcommand)]
        command: IamCommands,
    },
}

/// Image subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ImageCommands {
    /// Upload an image: `image create <path>`.
    Create {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
        /// Image name, defaults to the file name.
        #[arg(long)]
        name: Option<String>,
        /// `EAGER` or `ON_DEMAND`.
        #[arg(long)]
        image_replication: Option<String>,
        /// `infrastructure` or `project`.
        #[arg(long)]
        scope: Option<String>,
        /// Project name for project-scoped images.
        #[arg(long)]
        project: Option<String>,
        /// Tenant of `--project`.
        #[arg(long)]
        tenant: Option<String>,
    },

    /// Delete an image: `image delete <id>`.
    Delete {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// List images.
    List {
        /// Only images with this name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Show an image: `image show <id>`.
    Show {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// List the tasks of an image: `image tasks <id>`.
    Tasks {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
        /// Only tasks in this state.
        #[arg(long)]
        state: Option<String>,
    },

    /// Identity and access management of an image.
    Iam {
        /// IAM subcommand to execute.
        #[command(subcommand)]
        command: IamCommands,
    },
}

/// IAM subcommands, shared by images and projects.
#[derive(Subcommand, Debug, Clone)]
pub enum IamCommands {
    /// Show the IAM policy: `iam show <id>`.
    Show {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Grant a role to a user or group: `iam add <id> -p <principal> -r <role>`.
    Add(IamChangeArgs),

    /// Revoke a role from a user or group: `iam remove <id> -p <principal> -r <role>`.
    Remove(IamChangeArgs),
}

/// Arguments of `iam add` and `iam remove`.
#[derive(Args, Debug, Clone, Default)]
pub struct IamChangeArgs {
    /// Positional arguments.
    #[command(flatten)]
    pub pos: Positional,
    /// User (`user@domain`) or group (`domain\group`).
    #[arg(short, long)]
    pub principal: Option<String>,
    /// `owner`, `contributor` or `viewer`. `*` with remove revokes every role.
    #[arg(short, long)]
    pub role: Option<String>,
}

/// Network subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum NetworkCommands {
    /// Create a network (physical) or subnet (software-defined).
    Create {
        /// Network name.
        #[arg(long)]
        name: Option<String>,
        /// Description.
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated port groups (physical networks).
        #[arg(long)]
        portgroups: Option<String>,
        /// `ROUTED` or `ISOLATED` (software-defined).
        #[arg(long)]
        routing_type: Option<String>,
        /// Number of private IPs (software-defined).
        #[arg(long)]
        size: Option<u32>,
        /// Number of reserved static IPs (software-defined).
        #[arg(long)]
        static_ip_size: Option<u32>,
        /// Project name (software-defined).
        #[arg(long)]
        project: Option<String>,
        /// Tenant of `--project`.
        #[arg(long)]
        tenant: Option<String>,
    },

    /// Delete a network: `network delete <id>`.
    Delete {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// List networks.
    List {
        /// Only networks with this name.
        #[arg(long)]
        name: Option<String>,
        /// Project name (software-defined).
        #[arg(long)]
        project: Option<String>,
        /// Tenant of `--project`.
        #[arg(long)]
        tenant: Option<String>,
    },

    /// Show a network: `network show <id>`.
    Show {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Make a network the default: `network set-default <id>`.
    SetDefault {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },
}

/// Arguments for creating a cluster.
#[derive(Args, Debug, Clone, Default)]
pub struct ClusterCreateArgs {
    /// Tenant name, defaults to the current tenant.
    #[arg(long)]
    pub tenant: Option<String>,
    /// Project name, defaults to the current project.
    #[arg(long)]
    pub project: Option<String>,
    /// Cluster name.
    #[arg(long)]
    pub name: Option<String>,
    /// Cluster type, e.g. `KUBERNETES`.
    #[arg(long = "type")]
    pub kind: Option<String>,
    /// VM flavor of cluster nodes.
    #[arg(long)]
    pub vm_flavor: Option<String>,
    /// Disk flavor of cluster nodes.
    #[arg(long)]
    pub disk_flavor: Option<String>,
    /// Network to attach nodes to.
    #[arg(long)]
    pub network_id: Option<String>,
    /// Number of workers.
    #[arg(long)]
    pub worker_count: Option<u32>,
    /// DNS server.
    #[arg(long)]
    pub dns: Option<String>,
    /// Gateway.
    #[arg(long)]
    pub gateway: Option<String>,
    /// Netmask.
    #[arg(long)]
    pub netmask: Option<String>,
}

/// Cluster subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ClusterCommands {
    /// Create a cluster.
    Create(ClusterCreateArgs),

    /// Delete a cluster: `cluster delete <id>`.
    Delete {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Show a cluster and its master IPs: `cluster show <id>`.
    Show {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// List the clusters of a project.
    List {
        /// Tenant name, defaults to the current tenant.
        #[arg(long)]
        tenant: Option<String>,
        /// Project name, defaults to the current project.
        #[arg(long)]
        project: Option<String>,
        /// Show counts by type and state only.
        #[arg(long)]
        summary: bool,
    },

    /// Change the worker count: `cluster resize <id> <count>`.
    Resize {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// List the VMs of a cluster: `cluster list-vms <id>`.
    ListVms {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },
}

/// Arguments for registering a host.
#[derive(Args, Debug, Clone, Default)]
pub struct HostCreateArgs {
    /// Management address.
    #[arg(long)]
    pub address: Option<String>,
    /// Login user.
    #[arg(long)]
    pub username: Option<String>,
    /// Login password.
    #[arg(long)]
    pub password: Option<String>,
    /// Comma-separated usage tags (`CLOUD`, `MGMT`).
    #[arg(long)]
    pub tags: Option<String>,
    /// Comma-separated `key=value` metadata.
    #[arg(long)]
    pub metadata: Option<String>,
    /// Availability zone id.
    #[arg(long)]
    pub availability_zone: Option<String>,
    /// Deployment to register the host in.
    #[arg(long)]
    pub deployment_id: Option<String>,
}

/// Host subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum HostCommands {
    /// Register a host.
    Create(HostCreateArgs),

    /// Delete a host: `host delete <id>`.
    Delete {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// List all hosts.
    List,

    /// Show a host: `host show <id>`.
    Show {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// List the tasks of a host: `host tasks <id>`.
    Tasks {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
        /// Only tasks in this state.
        #[arg(long)]
        state: Option<String>,
    },

    /// Move a host: `host set-availability-zone <id> <zone>`.
    SetAvailabilityZone {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Suspend a host: `host suspend <id>`.
    Suspend {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Resume a host: `host resume <id>`.
    Resume {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Put a host in maintenance: `host enter-maintenance <id>`.
    EnterMaintenance {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Return a host to service: `host exit-maintenance <id>`.
    ExitMaintenance {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Reinstall agents on a host: `host provision <id>`.
    Provision {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// List the VMs on a host: `host list-vms <id>`.
    ListVms {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },
}

/// Deployment subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum DeploymentCommands {
    /// List deployments.
    List,

    /// Show a deployment: `deployment show <id>`.
    Show {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// List the hosts of a deployment: `deployment list-hosts <id>`.
    ListHosts {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Delete every host, then destroy and delete the deployment:
    /// `deployment destroy <id>`.
    Destroy {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Destroy every deployment, one after the other.
    DestroyAll,
}

/// Task subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommands {
    /// Show a task: `task show <id>`.
    Show {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// List tasks.
    List {
        /// Only tasks on this entity id.
        #[arg(long)]
        entity_id: Option<String>,
        /// Only tasks on this entity kind.
        #[arg(long)]
        entity_kind: Option<String>,
        /// Only tasks in this state.
        #[arg(long)]
        state: Option<String>,
    },

    /// Wait for a task, printing each state change: `task monitor <id>`.
    Monitor {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },
}

/// System subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum SystemCommands {
    /// Show control-plane component status.
    Status,

    /// Create a deployment from a YAML map and install it: `system deploy <dc-map.yaml>`.
    Deploy {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },
}

/// Target subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum TargetCommands {
    /// Set the controller endpoint: `target set <endpoint>`.
    Set {
        /// Positional arguments.
        #[command(flatten)]
        pos: Positional,
    },

    /// Show the configured target.
    Show,

    /// Store a bearer token.
    Login {
        /// The token; prompted for when absent.
        #[arg(long)]
        access_token: Option<String>,
    },

    /// Forget the stored token.
    Logout,
}
