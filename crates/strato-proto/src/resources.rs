//! Resource records returned by the control plane.
//!
//! These are flat read-only views. Each carries a `state` string whose
//! lifecycle is owned by the server; the client only displays it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Error body returned by the server on non-2xx responses and inside task steps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable error code.
    #[serde(default)]
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Extra details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
}

/// Security group attached to a tenant or project.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityGroup {
    /// Group name, e.g. `domain\group`.
    #[serde(default)]
    pub name: String,
    /// Whether the group was inherited from the parent.
    #[serde(default)]
    pub inherited: bool,
}

/// One quota line: limit, usage and unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuotaStatusLineItem {
    /// Upper bound.
    #[serde(default)]
    pub limit: f64,
    /// Current consumption.
    #[serde(default)]
    pub usage: f64,
    /// Unit (`GB`, `MB`, `KB`, `B` or `COUNT`).
    #[serde(default)]
    pub unit: String,
}

/// A resource quota keyed by cost name (e.g. `vm.count`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuota {
    /// Quota lines, ordered by key.
    #[serde(default)]
    pub quota_line_items: BTreeMap<String, QuotaStatusLineItem>,
}

impl ResourceQuota {
    /// Returns true when no lines are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quota_line_items.is_empty()
    }

    /// Copy of this quota with each limit multiplied by `fraction` and usage reset.
    #[must_use]
    pub fn scaled(&self, fraction: f64) -> Self {
        let quota_line_items = self
            .quota_line_items
            .iter()
            .map(|(key, item)| {
                (
                    key.clone(),
                    QuotaStatusLineItem {
                        limit: item.limit * fraction,
                        usage: 0.0,
                        unit: item.unit.clone(),
                    },
                )
            })
            .collect();
        Self { quota_line_items }
    }

    /// Script-friendly rendering: `key:limit:usage:unit` joined by commas.
    #[must_use]
    pub fn to_script_string(&self) -> String {
        self.quota_line_items
            .iter()
            .map(|(k, v)| format!("{k}:{}:{}:{}", v.limit, v.usage, v.unit))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A tenant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Tenant id.
    pub id: String,
    /// Tenant name.
    #[serde(default)]
    pub name: String,
    /// Security groups.
    #[serde(default)]
    pub security_groups: Vec<SecurityGroup>,
}

/// A project inside a tenant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project id.
    pub id: String,
    /// Project name.
    #[serde(default)]
    pub name: String,
    /// Quota assigned to the project.
    #[serde(default)]
    pub resource_quota: ResourceQuota,
    /// Security groups.
    #[serde(default)]
    pub security_groups: Vec<SecurityGroup>,
}

/// Where an image is visible.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageScope {
    /// `deployment` for infrastructure images, `project` otherwise.
    #[serde(default)]
    pub kind: String,
    /// Owning entity id.
    #[serde(default)]
    pub id: String,
}

/// Default image setting.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSetting {
    /// Setting name.
    #[serde(default)]
    pub name: String,
    /// Default value.
    #[serde(default)]
    pub default_value: String,
}

/// A VM image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Image id.
    pub id: String,
    /// Image name.
    #[serde(default)]
    pub name: String,
    /// Lifecycle state.
    #[serde(default)]
    pub state: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: i64,
    /// `EAGER` or `ON_DEMAND`.
    #[serde(default)]
    pub replication_type: String,
    /// Replication progress, e.g. `50%`.
    #[serde(default)]
    pub replication_progress: String,
    /// Seeding progress.
    #[serde(default)]
    pub seeding_progress: String,
    /// Visibility scope.
    #[serde(default)]
    pub scope: ImageScope,
    /// Default settings.
    #[serde(default)]
    pub settings: Vec<ImageSetting>,
}

impl Image {
    /// Display label for the image scope.
    #[must_use]
    pub fn scope_label(&self) -> String {
        match self.scope.kind.as_str() {
            "" => String::new(),
            "deployment" => "infrastructure".to_string(),
            kind => format!("{kind}: {}", self.scope.id),
        }
    }
}

/// How networks are provided by this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkType {
    /// Port-group backed networks.
    Physical,
    /// Software-defined subnets.
    SoftwareDefined,
    /// The server did not report a network type.
    #[default]
    #[serde(other)]
    NotAvailable,
}

/// Deployment-wide information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    /// Network provisioning mode.
    #[serde(default)]
    pub network_type: NetworkType,
    /// Server build version.
    #[serde(default)]
    pub base_version: String,
}

/// A physical network.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    /// Network id.
    pub id: String,
    /// Network name.
    #[serde(default)]
    pub name: String,
    /// Lifecycle state.
    #[serde(default)]
    pub state: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Backing port groups.
    #[serde(default)]
    pub port_groups: Vec<String>,
    /// Whether this is the default network.
    #[serde(default)]
    pub is_default: bool,
}

/// A software-defined subnet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    /// Subnet id.
    pub id: String,
    /// Subnet name.
    #[serde(default)]
    pub name: String,
    /// Lifecycle state.
    #[serde(default)]
    pub state: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// `ROUTED` or `ISOLATED`.
    #[serde(default)]
    pub routing_type: String,
    /// Private IP range.
    #[serde(default)]
    pub private_ip_cidr: String,
    /// Whether this is the project's default subnet.
    #[serde(default)]
    pub is_default: bool,
}

/// A container cluster.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Cluster id.
    pub id: String,
    /// Cluster name.
    #[serde(default)]
    pub name: String,
    /// Cluster type, e.g. `KUBERNETES`.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Lifecycle state (`CREATING`, `READY`, `RESIZING`, `ERROR`, ...).
    #[serde(default)]
    pub state: String,
    /// Number of worker VMs.
    #[serde(default)]
    pub worker_count: u32,
    /// Type-specific properties (dns, gateway, netmask, ...).
    #[serde(default)]
    pub extended_properties: BTreeMap<String, String>,
}

/// Disk attached to a VM.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    /// Disk name.
    #[serde(default)]
    pub name: String,
    /// `ephemeral-disk` or `persistent-disk`.
    #[serde(default)]
    pub kind: String,
    /// Disk flavor.
    #[serde(default)]
    pub flavor: String,
    /// Capacity in GB.
    #[serde(default)]
    pub capacity_gb: u32,
    /// Whether this is the boot disk.
    #[serde(default)]
    pub boot_disk: bool,
}

/// A virtual machine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vm {
    /// VM id.
    pub id: String,
    /// VM name.
    #[serde(default)]
    pub name: String,
    /// Flavor name.
    #[serde(default)]
    pub flavor: String,
    /// Lifecycle state.
    #[serde(default)]
    pub state: String,
    /// Image the VM booted from.
    #[serde(default)]
    pub source_image_id: String,
    /// Host address.
    #[serde(default)]
    pub host: String,
    /// Datastore id.
    #[serde(default)]
    pub datastore: String,
    /// Tags, e.g. `cluster:<id>:master`.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Attached disks.
    #[serde(default)]
    pub attached_disks: Vec<AttachedDisk>,
}

impl Vm {
    /// Returns true when the VM carries a `cluster:<id>:master` tag.
    #[must_use]
    pub fn is_cluster_master(&self, cluster_id: &str) -> bool {
        let tag = format!("cluster:{cluster_id}:master");
        self.tags.iter().any(|t| *t == tag)
    }
}

/// A VM network connection, reported through a task's resource properties.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConnection {
    /// Network name.
    #[serde(default)]
    pub network: String,
    /// MAC address.
    #[serde(default)]
    pub mac_address: String,
    /// IP address.
    #[serde(default)]
    pub ip_address: String,
    /// Netmask.
    #[serde(default)]
    pub netmask: String,
}

impl NetworkConnection {
    /// Extract `networkConnections` from a task's resource properties.
    ///
    /// Returns an empty list when the payload has no such field.
    #[must_use]
    pub fn from_resource_properties(props: Option<&serde_json::Value>) -> Vec<Self> {
        props
            .and_then(|p| p.get("networkConnections"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

/// A physical host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    /// Host id.
    pub id: String,
    /// Management address.
    #[serde(default)]
    pub address: String,
    /// Login user.
    #[serde(default)]
    pub username: String,
    /// Lifecycle state (`CREATING`, `READY`, `MAINTENANCE`, `SUSPENDED`, ...).
    #[serde(default)]
    pub state: String,
    /// Usage tags (`CLOUD`, `MGMT`).
    #[serde(default)]
    pub usage_tags: Vec<String>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Availability zone id.
    #[serde(default)]
    pub availability_zone: String,
    /// Hypervisor version.
    #[serde(default)]
    pub esx_version: String,
}

/// Authentication settings of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfo {
    /// Whether authentication is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Auth service endpoint.
    #[serde(default)]
    pub endpoint: String,
    /// Auth tenant.
    #[serde(default)]
    pub tenant: String,
}

/// A deployment: the set of hosts and services managed by one controller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Deployment id.
    pub id: String,
    /// Lifecycle state.
    #[serde(default)]
    pub state: String,
    /// Datastores holding images.
    #[serde(default)]
    pub image_datastores: Vec<String>,
    /// Syslog endpoint.
    #[serde(default)]
    pub syslog_endpoint: String,
    /// NTP endpoint.
    #[serde(default)]
    pub ntp_endpoint: String,
    /// Whether VMs may be placed on the image datastore.
    #[serde(default)]
    pub use_image_datastore_for_vms: bool,
    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthInfo,
}

/// One line of an IAM policy: a principal and the roles it holds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyEntry {
    /// User or group.
    #[serde(default)]
    pub principal: String,
    /// Roles held on the resource.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Health of one control-plane component.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// Component name.
    #[serde(default)]
    pub component: String,
    /// Status message.
    #[serde(default)]
    pub message: String,
    /// `READY`, `ERROR`, ...
    #[serde(default)]
    pub status: String,
}

/// Overall control-plane health.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Aggregate status.
    #[serde(default)]
    pub status: String,
    /// Per-component status.
    #[serde(default)]
    pub components: Vec<ComponentStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_scope_label() {
        let mut image = Image::default();
        assert_eq!(image.scope_label(), "");

        image.scope = ImageScope {
            kind: "deployment".into(),
            id: "d-1".into(),
        };
        assert_eq!(image.scope_label(), "infrastructure");

        image.scope = ImageScope {
            kind: "project".into(),
            id: "p-1".into(),
        };
        assert_eq!(image.scope_label(), "project: p-1");
    }

    #[test]
    fn quota_scaled_resets_usage() {
        let mut quota = ResourceQuota::default();
        quota.quota_line_items.insert(
            "vm.count".into(),
            QuotaStatusLineItem {
                limit: 100.0,
                usage: 40.0,
                unit: "COUNT".into(),
            },
        );
        let scaled = quota.scaled(0.3);
        let item = &scaled.quota_line_items["vm.count"];
        assert!((item.limit - 30.0).abs() < f64::EPSILON);
        assert!(item.usage.abs() < f64::EPSILON);
        assert_eq!(item.unit, "COUNT");
    }

    #[test]
    fn network_type_decodes_with_fallback() {
        let info: SystemInfo = serde_json::from_str(r#"{"networkType": "SOFTWARE_DEFINED"}"#).unwrap();
        assert_eq!(info.network_type, NetworkType::SoftwareDefined);

        let info: SystemInfo = serde_json::from_str(r#"{"networkType": "SOMETHING_NEW"}"#).unwrap();
        assert_eq!(info.network_type, NetworkType::NotAvailable);
    }

    #[test]
    fn cluster_type_field_is_renamed() {
        let cluster: Cluster = serde_json::from_str(
            r#"{"id": "c-1", "name": "k8s", "type": "KUBERNETES", "state": "READY", "workerCount": 3}"#,
        )
        .unwrap();
        assert_eq!(cluster.kind, "KUBERNETES");
        assert_eq!(cluster.worker_count, 3);
    }

    #[test]
    fn vm_master_tag() {
        let vm = Vm {
            id: "vm-1".into(),
            tags: vec!["cluster:c-1:master".into()],
            ..Vm::default()
        };
        assert!(vm.is_cluster_master("c-1"));
        assert!(!vm.is_cluster_master("c-2"));
    }

    #[test]
    fn network_connections_from_properties() {
        let props = serde_json::json!({
            "networkConnections": [
                {"network": "mgmt", "macAddress": "00:0c:29:7a:b4:d5", "ipAddress": "10.0.0.12", "netmask": "255.255.252.0", "isConnected": "true"}
            ]
        });
        let conns = NetworkConnection::from_resource_properties(Some(&props));
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].ip_address, "10.0.0.12");

        assert!(NetworkConnection::from_resource_properties(None).is_empty());
    }
}
