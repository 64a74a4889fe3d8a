//! Deployment map files for `system deploy`.
//!
//! A map is a YAML document with a `deployment` section and a list of
//! `hosts`:
//!
//! ```yaml
//! deployment:
//!   image_datastores: datastore1
//!   ntp_endpoint: 10.20.144.1
//!   auth_enabled: true
//!   oauth_endpoint: 10.0.0.5
//!   oauth_port: 443
//!   oauth_security_groups:
//!   - 'example\admins'
//!
//! hosts:
//!   - address_ranges: 10.146.38.92-10.146.38.93,10.146.38.94
//!     username: root
//!     password: secret
//!     availability_zone: zone1
//!     usage_tags: [CLOUD, MGMT]
//!     metadata:
//!       MANAGEMENT_DATASTORE: datastore1
//! ```
//!
//! Each host entry stands for every address its `address_ranges` expands
//! to. Everything is parsed and expanded before the first request.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::Path;

use serde::Deserialize;
use strato_proto::specs::split_list;
use strato_proto::{AuthSpec, DeploymentCreateSpec, HostCreateSpec};

use crate::error::CliError;

/// Largest number of addresses one `a-b` range may expand to.
pub const MAX_RANGE_ADDRESSES: u32 = 4096;

/// A whole map file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DcMap {
    /// Deployment settings.
    pub deployment: DeploymentSection,
    /// Host groups.
    #[serde(default)]
    pub hosts: Vec<HostSection>,
}

/// A string or a list of strings; a string is split on commas.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    /// Comma-separated values.
    Joined(String),
    /// Explicit list.
    List(Vec<String>),
}

impl StringList {
    fn values(&self) -> Vec<String> {
        match self {
            Self::Joined(joined) => split_list(joined),
            Self::List(list) => list.clone(),
        }
    }
}

impl Default for StringList {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// The `deployment` section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DeploymentSection {
    /// Datastores holding images.
    #[serde(default)]
    pub image_datastores: StringList,
    /// Syslog endpoint.
    #[serde(default)]
    pub syslog_endpoint: String,
    /// NTP endpoint.
    #[serde(default)]
    pub ntp_endpoint: String,
    /// Whether VMs may be placed on the image datastore.
    #[serde(default)]
    pub use_image_datastore_for_vms: bool,
    /// Whether authentication is enabled.
    #[serde(default)]
    pub auth_enabled: bool,
    /// Auth service address.
    #[serde(default)]
    pub oauth_endpoint: String,
    /// Auth service port.
    #[serde(default)]
    pub oauth_port: Option<u16>,
    /// Auth tenant.
    #[serde(default)]
    pub oauth_tenant: String,
    /// Administrator user.
    #[serde(default)]
    pub oauth_username: String,
    /// Administrator password.
    #[serde(default)]
    pub oauth_password: String,
    /// Groups granted administrator rights.
    #[serde(default)]
    pub oauth_security_groups: Vec<String>,
}

/// One entry of `hosts`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostSection {
    /// Comma-separated addresses and `first-last` IPv4 ranges.
    pub address_ranges: String,
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Availability zone name.
    #[serde(default)]
    pub availability_zone: Option<String>,
    /// Usage tags.
    #[serde(default)]
    pub usage_tags: Vec<String>,
    /// Free-form metadata. Scalars of any type are kept as text.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_yaml::Value>,
}

/// A host to register, with the name of its availability zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedHost {
    /// Zone name, resolved to an id once the zone exists.
    pub zone: Option<String>,
    /// Registration body, without the zone id.
    pub spec: HostCreateSpec,
}

impl DcMap {
    /// Parse a map from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] for malformed YAML or missing fields.
    pub fn parse(content: &str) -> Result<Self, CliError> {
        serde_yaml::from_str(content)
            .map_err(|e| CliError::Config(format!("invalid deployment map: {e}")))
    }

    /// Read and parse the map at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, else as [`Self::parse`].
    pub async fn load(path: &Path) -> Result<Self, CliError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Body of the deployment create call.
    #[must_use]
    pub fn deployment_spec(&self) -> DeploymentCreateSpec {
        let d = &self.deployment;
        DeploymentCreateSpec {
            image_datastores: d.image_datastores.values(),
            syslog_endpoint: d.syslog_endpoint.clone(),
            ntp_endpoint: d.ntp_endpoint.clone(),
            use_image_datastore_for_vms: d.use_image_datastore_for_vms,
            auth: AuthSpec {
                enabled: d.auth_enabled,
                endpoint: d.oauth_endpoint.clone(),
                port: d.oauth_port,
                tenant: d.oauth_tenant.clone(),
                username: d.oauth_username.clone(),
                password: d.oauth_password.clone(),
                security_groups: d.oauth_security_groups.clone(),
            },
        }
    }

    /// Availability zone names, in order of first use.
    #[must_use]
    pub fn zone_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for zone in self.hosts.iter().filter_map(|h| h.availability_zone.as_deref()) {
            let zone = zone.trim();
            if !zone.is_empty() && !names.iter().any(|n| n == zone) {
                names.push(zone.to_string());
            }
        }
        names
    }

    /// One host per expanded address, in file order.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] for a bad address range or metadata value.
    pub fn planned_hosts(&self) -> Result<Vec<PlannedHost>, CliError> {
        let mut planned = Vec::new();
        for host in &self.hosts {
            let metadata = metadata_text(&host.metadata)?;
            let zone = host
                .availability_zone
                .as_deref()
                .map(str::trim)
                .filter(|z| !z.is_empty())
                .map(ToString::to_string);
            for address in expand_address_ranges(&host.address_ranges)? {
                planned.push(PlannedHost {
                    zone: zone.clone(),
                    spec: HostCreateSpec {
                        username: host.username.clone(),
                        password: host.password.clone(),
                        address,
                        availability_zone: String::new(),
                        metadata: metadata.clone(),
                        usage_tags: host.usage_tags.clone(),
                    },
                });
            }
        }
        Ok(planned)
    }
}

fn metadata_text(
    metadata: &BTreeMap<String, serde_yaml::Value>,
) -> Result<BTreeMap<String, String>, CliError> {
    metadata
        .iter()
        .map(|(key, value)| {
            let text = match value {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(CliError::Config(format!(
                        "metadata {key} must be a single value"
                    )));
                }
            };
            Ok((key.clone(), text))
        })
        .collect()
}

/// Expand `10.0.0.1,10.0.0.5-10.0.0.7` into one address per host.
///
/// An entry is a range when the part before its dash is an IPv4 address;
/// other entries, such as host names, are taken as they are. Ranges are
/// inclusive.
///
/// # Errors
///
/// Returns [`CliError::Config`] for an empty list, an unparsable or reversed
/// range, or a range larger than [`MAX_RANGE_ADDRESSES`].
pub fn expand_address_ranges(ranges: &str) -> Result<Vec<String>, CliError> {
    let mut addresses = Vec::new();
    for entry in split_list(ranges) {
        let range = entry
            .split_once('-')
            .and_then(|(first, last)| Some((first.trim().parse::<Ipv4Addr>().ok()?, last)));
        let Some((first, last)) = range else {
            addresses.push(entry);
            continue;
        };
        let first = u32::from(first);
        let last = parse_ipv4(last, &entry)?;
        if first > last {
            return Err(CliError::Config(format!(
                "address range {entry} ends before it starts"
            )));
        }
        if last - first >= MAX_RANGE_ADDRESSES {
            return Err(CliError::Config(format!(
                "address range {entry} spans more than {MAX_RANGE_ADDRESSES} addresses"
            )));
        }
        addresses.extend((first..=last).map(|n| Ipv4Addr::from(n).to_string()));
    }
    if addresses.is_empty() {
        return Err(CliError::Config("address_ranges is empty".into()));
    }
    Ok(addresses)
}

fn parse_ipv4(value: &str, entry: &str) -> Result<u32, CliError> {
    value
        .trim()
        .parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| CliError::Config(format!("invalid address range {entry}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const MAP: &str = r#"
deployment:
  image_datastores: datastore1
  syslog_endpoint: 10.146.64.230
  ntp_endpoint: 10.20.144.1
  use_image_datastore_for_vms: true
  auth_enabled: true
  oauth_endpoint: 10.0.0.5
  oauth_port: 443
  oauth_tenant: "example"
  oauth_username: "Administrator"
  oauth_password: "secret"
  oauth_security_groups:
  -  "example\\admins"

hosts:
  - address_ranges: 10.146.38.91
    username: root
    password: secret
    usage_tags:
    - CLOUD
    - MGMT
    metadata:
       MANAGEMENT_DATASTORE: datastore1
       MANAGEMENT_NETWORK_DNS_SERVER : 10.142.17.124
       MANAGEMENT_VM_COUNT: 2
  - address_ranges: 10.146.38.92-10.146.38.93,10.146.38.94
    username: root
    password: secret
    availability_zone: zone1
    usage_tags:
    - CLOUD
"#;

    #[test]
    fn parses_deployment_section() {
        let map = DcMap::parse(MAP).unwrap();
        let spec = map.deployment_spec();
        assert_eq!(spec.image_datastores, vec!["datastore1"]);
        assert_eq!(spec.ntp_endpoint, "10.20.144.1");
        assert!(spec.use_image_datastore_for_vms);
        assert!(spec.auth.enabled);
        assert_eq!(spec.auth.port, Some(443));
        assert_eq!(spec.auth.security_groups, vec!["example\\admins"]);
    }

    #[test]
    fn expands_hosts_in_file_order() {
        let map = DcMap::parse(MAP).unwrap();
        let hosts = map.planned_hosts().unwrap();
        let addresses: Vec<&str> = hosts.iter().map(|h| h.spec.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec!["10.146.38.91", "10.146.38.92", "10.146.38.93", "10.146.38.94"]
        );
        assert_eq!(hosts[0].zone, None);
        assert_eq!(hosts[3].zone.as_deref(), Some("zone1"));
        assert_eq!(hosts[0].spec.metadata["MANAGEMENT_VM_COUNT"], "2");
        assert_eq!(
            hosts[0].spec.metadata["MANAGEMENT_NETWORK_DNS_SERVER"],
            "10.142.17.124"
        );
        assert_eq!(map.zone_names(), vec!["zone1"]);
    }

    #[test]
    fn datastores_may_be_a_list() {
        let map = DcMap::parse("deployment:\n  image_datastores: [ds1, ds2]\n").unwrap();
        assert_eq!(map.deployment_spec().image_datastores, vec!["ds1", "ds2"]);
        assert!(map.hosts.is_empty());
    }

    #[test]
    fn missing_deployment_section_is_rejected() {
        let err = DcMap::parse("hosts: []\n").unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn nested_metadata_is_rejected() {
        let map = DcMap::parse(
            "deployment: {}\nhosts:\n  - address_ranges: 10.0.0.1\n    username: u\n    password: p\n    metadata:\n      NESTED: [a, b]\n",
        )
        .unwrap();
        assert!(matches!(map.planned_hosts(), Err(CliError::Config(_))));
    }

    #[test_case("10.0.0.1", &["10.0.0.1"] ; "single")]
    #[test_case("10.0.0.254-10.0.1.1", &["10.0.0.254", "10.0.0.255", "10.0.1.0", "10.0.1.1"] ; "crosses octet")]
    #[test_case(" 10.0.0.1 , 10.0.0.3-10.0.0.3 ", &["10.0.0.1", "10.0.0.3"] ; "trimmed")]
    #[test_case("esx-01.example.local", &["esx-01.example.local"] ; "hostname with dash")]
    fn expands(ranges: &str, expected: &[&str]) {
        assert_eq!(expand_address_ranges(ranges).unwrap(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("10.0.0.5-10.0.0.1" ; "reversed")]
    #[test_case("10.0.0.1-10.1.0.0" ; "too large")]
    #[test_case("10.0.0.1-host" ; "bad end")]
    fn rejects(ranges: &str) {
        assert!(matches!(expand_address_ranges(ranges), Err(CliError::Config(_))));
    }
}
