//! # strato-proto
//!
//! Wire types for the Strato control-plane REST API.
//!
//! - [`task`] - asynchronous task objects and their closed state set
//! - [`page`] - paginated collections
//! - [`resources`] - read-only resource records
//! - [`specs`] - request bodies for mutating calls

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod page;
pub mod resources;
pub mod specs;
pub mod task;

pub use error::ProtoError;
pub use page::Page;
pub use resources::{
    ApiErrorBody, Cluster, ComponentStatus, Deployment, Host, Image, Network, NetworkConnection,
    NetworkType, PolicyEntry, Project, ResourceQuota, Subnet, SystemInfo, SystemStatus, Tenant,
    Vm,
};
pub use specs::{
    AuthSpec, AvailabilityZoneCreateSpec, AvailabilityZoneSpec, ClusterCreateSpec,
    ClusterResizeSpec, DeploymentCreateSpec, HostCreateSpec, ImageCreateOptions,
    ImageReplication, NetworkCreateSpec, PolicyAction, PolicyDelta, ProjectCreateSpec,
    QuotaLineItem, RoutingType, SecurityGroupsSpec, SubnetCreateSpec, TenantCreateSpec,
};
pub use task::{Entity, Task, TaskState, TaskStep};
