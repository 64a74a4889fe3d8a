//! Request bodies for mutating calls.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;
use crate::resources::{QuotaStatusLineItem, ResourceQuota};

/// Split a comma-separated flag value, trimming whitespace and dropping empty entries.
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Unit of a quota line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaUnit {
    /// Gigabytes.
    #[serde(rename = "GB")]
    Gb,
    /// Megabytes.
    #[serde(rename = "MB")]
    Mb,
    /// Kilobytes.
    #[serde(rename = "KB")]
    Kb,
    /// Bytes.
    #[serde(rename = "B")]
    B,
    /// A plain count.
    #[serde(rename = "COUNT")]
    Count,
}

impl fmt::Display for QuotaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Gb => "GB",
            Self::Mb => "MB",
            Self::Kb => "KB",
            Self::B => "B",
            Self::Count => "COUNT",
        };
        f.write_str(s)
    }
}

impl FromStr for QuotaUnit {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GB" => Ok(Self::Gb),
            "MB" => Ok(Self::Mb),
            "KB" => Ok(Self::Kb),
            "B" => Ok(Self::B),
            "COUNT" => Ok(Self::Count),
            other => Err(ProtoError::Validation(format!(
                "unknown quota unit '{other}', expected GB, MB, KB, B or COUNT"
            ))),
        }
    }
}

/// One requested quota limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaLineItem {
    /// Cost key, e.g. `vm.memory`.
    pub key: String,
    /// Limit value.
    pub value: f64,
    /// Unit.
    pub unit: QuotaUnit,
}

impl QuotaLineItem {
    /// Parse a `--limits` value: comma-separated `key value unit` triples.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry does not have exactly three fields, the
    /// value is not a number, or the unit is unknown.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, ProtoError> {
        split_list(value)
            .iter()
            .map(|entry| Self::parse(entry))
            .collect()
    }

    fn parse(entry: &str) -> Result<Self, ProtoError> {
        let fields: Vec<&str> = entry.split_whitespace().collect();
        let [key, value, unit] = fields.as_slice() else {
            return Err(ProtoError::Validation(format!(
                "invalid limit '{entry}', expected '<key> <value> <unit>'"
            )));
        };
        let value = value.parse::<f64>().map_err(|e| {
            ProtoError::Validation(format!("invalid limit value '{value}' for {key}: {e}"))
        })?;
        Ok(Self {
            key: (*key).to_string(),
            value,
            unit: unit.parse()?,
        })
    }
}

impl ResourceQuota {
    /// Build a quota from requested limits, with zero usage.
    #[must_use]
    pub fn from_limits(limits: &[QuotaLineItem]) -> Self {
        let quota_line_items = limits
            .iter()
            .map(|l| {
                (
                    l.key.clone(),
                    QuotaStatusLineItem {
                        limit: l.value,
                        usage: 0.0,
                        unit: l.unit.to_string(),
                    },
                )
            })
            .collect();
        Self { quota_line_items }
    }
}

/// Body for creating a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantCreateSpec {
    /// Tenant name.
    pub name: String,
    /// Security groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
}

/// Body for creating a project.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreateSpec {
    /// Project name.
    pub name: String,
    /// Quota assigned to the project.
    #[serde(default)]
    pub resource_quota: ResourceQuota,
    /// Security groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
    /// Private CIDR of the project's default router.
    pub default_router_private_ip_cidr: String,
}

/// Body for replacing security groups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityGroupsSpec {
    /// Group names.
    pub items: Vec<String>,
}

/// Image replication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageReplication {
    /// Copy to every allowed datastore up front.
    #[default]
    Eager,
    /// Copy to image datastores, seed on demand.
    OnDemand,
}

impl fmt::Display for ImageReplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eager => f.write_str("EAGER"),
            Self::OnDemand => f.write_str("ON_DEMAND"),
        }
    }
}

impl FromStr for ImageReplication {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EAGER" => Ok(Self::Eager),
            "ON_DEMAND" => Ok(Self::OnDemand),
            other => Err(ProtoError::Validation(format!(
                "unknown image replication type '{other}', expected EAGER or ON_DEMAND"
            ))),
        }
    }
}

/// Optional parameters of an image upload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCreateOptions {
    /// Replication mode, server default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_type: Option<ImageReplication>,
}

/// Body for creating a physical network.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCreateSpec {
    /// Network name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Backing port groups.
    pub port_groups: Vec<String>,
}

/// Routing mode of a software-defined subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingType {
    /// Routed to the outside world.
    #[default]
    Routed,
    /// Isolated.
    Isolated,
}

impl FromStr for RoutingType {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ROUTED" => Ok(Self::Routed),
            "ISOLATED" => Ok(Self::Isolated),
            other => Err(ProtoError::Validation(format!(
                "unknown routing type '{other}', expected ROUTED or ISOLATED"
            ))),
        }
    }
}

/// Body for creating a software-defined subnet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetCreateSpec {
    /// Subnet name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Routing mode.
    pub routing_type: RoutingType,
    /// Number of private IP addresses.
    pub size: u32,
    /// Number of reserved static IP addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_static_ip_size: Option<u32>,
}

/// Body for creating a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCreateSpec {
    /// Cluster name.
    pub name: String,
    /// Cluster type, e.g. `KUBERNETES`.
    #[serde(rename = "type")]
    pub kind: String,
    /// VM flavor for cluster nodes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vm_flavor: String,
    /// Disk flavor for cluster nodes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub disk_flavor: String,
    /// Network to attach nodes to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    /// Number of workers.
    pub worker_count: u32,
    /// Type-specific properties.
    #[serde(default)]
    pub extended_properties: BTreeMap<String, String>,
}

/// Body for resizing a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResizeSpec {
    /// Target number of workers.
    pub new_worker_count: u32,
}

/// Body for registering a host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostCreateSpec {
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Management address.
    pub address: String,
    /// Availability zone id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub availability_zone: String,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Usage tags.
    pub usage_tags: Vec<String>,
}

/// Body for moving a host to an availability zone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityZoneSpec {
    /// Availability zone id.
    pub availability_zone: String,
}

/// Whether a policy change grants or revokes a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyAction {
    /// Grant the role.
    Add,
    /// Revoke the role. The role `*` revokes every role of the principal.
    Remove,
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("ADD"),
            Self::Remove => f.write_str("REMOVE"),
        }
    }
}

/// Body for changing the IAM policy of an image or project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDelta {
    /// User (`user@domain`) or group (`domain\group`).
    pub principal: String,
    /// Grant or revoke.
    pub action: PolicyAction,
    /// `owner`, `contributor` or `viewer`.
    pub role: String,
}

/// Authentication settings of a new deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSpec {
    /// Whether authentication is enabled.
    pub enabled: bool,
    /// Auth service address.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    /// Auth service port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Auth tenant.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenant: String,
    /// Administrator user.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// Administrator password.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Groups granted administrator rights.
    #[serde(default)]
    pub security_groups: Vec<String>,
}

/// Body for creating a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentCreateSpec {
    /// Datastores holding images.
    pub image_datastores: Vec<String>,
    /// Syslog endpoint.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub syslog_endpoint: String,
    /// NTP endpoint.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ntp_endpoint: String,
    /// Whether VMs may be placed on the image datastore.
    pub use_image_datastore_for_vms: bool,
    /// Authentication settings.
    pub auth: AuthSpec,
}

/// Body for creating an availability zone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvailabilityZoneCreateSpec {
    /// Zone name.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn split_list_trims_and_drops_empty() {
        assert_eq!(split_list(" a , b,, c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn parse_limits() {
        let limits =
            QuotaLineItem::parse_list("vm.count 100 COUNT, vm.memory 1000 GB,vm.cpu 500 count")
                .unwrap();
        assert_eq!(limits.len(), 3);
        assert_eq!(limits[0].key, "vm.count");
        assert!((limits[1].value - 1000.0).abs() < f64::EPSILON);
        assert_eq!(limits[1].unit, QuotaUnit::Gb);
        assert_eq!(limits[2].unit, QuotaUnit::Count);
    }

    #[test_case("vm.count 100" ; "missing unit")]
    #[test_case("vm.count lots COUNT" ; "non numeric value")]
    #[test_case("vm.count 1 PB" ; "unknown unit")]
    #[test_case("vm.count 1 COUNT extra" ; "too many fields")]
    fn parse_limits_rejects(input: &str) {
        assert!(matches!(
            QuotaLineItem::parse_list(input),
            Err(ProtoError::Validation(_))
        ));
    }

    #[test]
    fn quota_from_limits() {
        let limits = QuotaLineItem::parse_list("vm.count 10 COUNT").unwrap();
        let quota = ResourceQuota::from_limits(&limits);
        let item = &quota.quota_line_items["vm.count"];
        assert_eq!(item.unit, "COUNT");
        assert!((item.limit - 10.0).abs() < f64::EPSILON);
    }

    #[test_case("eager", ImageReplication::Eager)]
    #[test_case("ON_DEMAND", ImageReplication::OnDemand)]
    fn replication_parses(input: &str, expected: ImageReplication) {
        assert_eq!(input.parse::<ImageReplication>().unwrap(), expected);
    }

    #[test]
    fn policy_delta_serializes_uppercase_action() {
        let delta = PolicyDelta {
            principal: "user1@example.local".into(),
            action: PolicyAction::Remove,
            role: "*".into(),
        };
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(json["action"], "REMOVE");
        assert_eq!(json["role"], "*");
        assert_eq!(PolicyAction::Add.to_string(), "ADD");
    }

    #[test]
    fn deployment_spec_omits_disabled_auth_fields() {
        let spec = DeploymentCreateSpec {
            image_datastores: vec!["datastore1".into()],
            ..DeploymentCreateSpec::default()
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["imageDatastores"][0], "datastore1");
        assert_eq!(json["auth"]["enabled"], false);
        assert!(json["auth"].get("port").is_none());
        assert!(json.get("syslogEndpoint").is_none());
    }

    #[test]
    fn cluster_spec_serializes_type() {
        let spec = ClusterCreateSpec {
            name: "k8s".into(),
            kind: "KUBERNETES".into(),
            worker_count: 3,
            ..ClusterCreateSpec::default()
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "KUBERNETES");
        assert_eq!(json["workerCount"], 3);
        assert!(json.get("subnetId").is_none());
    }
}
