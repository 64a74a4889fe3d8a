//! Output formatting for CLI commands.
//!
//! Supports table (human-readable), script (tab-separated, no headers) and
//! JSON output formats.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strato_proto::resources::{NetworkConnection, SecurityGroup};
use strato_proto::{
    Cluster, Deployment, Host, Image, Network, PolicyEntry, Project, Subnet, SystemStatus, Task,
    Tenant, Vm,
};
use tracing::warn;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter for tables, script lines and JSON.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Pick the format: an explicit choice wins, then non-interactive mode
    /// selects script lines, else tables.
    #[must_use]
    pub const fn resolve(explicit: Option<Format>, non_interactive: bool) -> Self {
        match explicit {
            Some(format) => Self::new(format),
            None if non_interactive => Self::new(Format::Script),
            None => Self::new(Format::Table),
        }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a value in the selected format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay + ?Sized,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
            Format::Script => value.write_script(writer)?,
        }
        Ok(())
    }

    /// Write a value, logging instead of failing when rendering breaks.
    pub fn emit<W, T>(&self, writer: &mut W, value: &T)
    where
        W: Write,
        T: Serialize + TableDisplay + ?Sized,
    {
        if let Err(e) = self.write(writer, value) {
            warn!(error = %e, "Failed to render output");
        }
    }

    /// Write a value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay + ?Sized,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that render as tables and as script lines.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;

    /// Write the value as tab-separated lines without headers.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

fn security_groups(groups: &[SecurityGroup]) -> String {
    groups
        .iter()
        .map(|g| {
            if g.inherited {
                format!("{} (inherited)", g.name)
            } else {
                g.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn total<W: Write>(writer: &mut W, count: usize, noun: &str) -> Result<(), CliError> {
    writeln!(writer)?;
    writeln!(writer, "Total: {count} {noun}(s)")?;
    Ok(())
}

// ============================================================================
// Tenants and projects
// ============================================================================

impl TableDisplay for Vec<Tenant> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No tenants")?;
            return Ok(());
        }
        writeln!(writer, "{:<36}  {:<24}", "ID", "NAME")?;
        writeln!(writer, "{}", "─".repeat(62))?;
        for tenant in self {
            writeln!(writer, "{:<36}  {:<24}", tenant.id, truncate(&tenant.name, 24))?;
        }
        total(writer, self.len(), "tenant")
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for tenant in self {
            writeln!(writer, "{}\t{}", tenant.id, tenant.name)?;
        }
        Ok(())
    }
}

impl TableDisplay for Tenant {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Tenant: {}", self.id)?;
        writeln!(writer, "  Name:            {}", self.name)?;
        writeln!(
            writer,
            "  Security Groups: {}",
            security_groups(&self.security_groups)
        )?;
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let groups: Vec<&str> = self.security_groups.iter().map(|g| g.name.as_str()).collect();
        writeln!(writer, "{}\t{}\t{}", self.id, self.name, groups.join(","))?;
        Ok(())
    }
}

impl TableDisplay for Vec<Project> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No projects")?;
            return Ok(());
        }
        writeln!(writer, "{:<36}  {:<24}  {}", "ID", "NAME", "LIMITS")?;
        writeln!(writer, "{}", "─".repeat(90))?;
        for project in self {
            let limits = project
                .resource_quota
                .quota_line_items
                .iter()
                .map(|(k, v)| format!("{k}:{}{}", v.limit, v.unit))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                writer,
                "{:<36}  {:<24}  {}",
                project.id,
                truncate(&project.name, 24),
                limits
            )?;
        }
        total(writer, self.len(), "project")
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for project in self {
            writeln!(
                writer,
                "{}\t{}\t{}",
                project.id,
                project.name,
                project.resource_quota.to_script_string()
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for Project {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Project: {}", self.id)?;
        writeln!(writer, "  Name:            {}", self.name)?;
        writeln!(
            writer,
            "  Security Groups: {}",
            security_groups(&self.security_groups)
        )?;
        if self.resource_quota.is_empty() {
            writeln!(writer, "  Quota:           none")?;
        } else {
            writeln!(writer, "  Quota:")?;
            writeln!(writer, "    {:<24}  {:>12}  {:>12}  {}", "KEY", "LIMIT", "USAGE", "UNIT")?;
            for (key, item) in &self.resource_quota.quota_line_items {
                writeln!(
                    writer,
                    "    {:<24}  {:>12}  {:>12}  {}",
                    key, item.limit, item.usage, item.unit
                )?;
            }
        }
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(
            writer,
            "{}\t{}\t{}",
            self.id,
            self.name,
            self.resource_quota.to_script_string()
        )?;
        Ok(())
    }
}

impl TableDisplay for Vec<PolicyEntry> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No policy entries")?;
            return Ok(());
        }
        writeln!(writer, "{:<40}  {}", "PRINCIPAL", "ROLES")?;
        writeln!(writer, "{}", "─".repeat(62))?;
        for entry in self {
            writeln!(
                writer,
                "{:<40}  {}",
                truncate(&entry.principal, 40),
                entry.roles.join(", ")
            )?;
        }
        total(writer, self.len(), "principal")
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for entry in self {
            writeln!(writer, "{}\t{}", entry.principal, entry.roles.join(","))?;
        }
        Ok(())
    }
}

// ============================================================================
// Images
// ============================================================================

impl TableDisplay for Vec<Image> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No images")?;
            return Ok(());
        }
        writeln!(
            writer,
            "{:<36}  {:<20}  {:<10}  {:>12}  {:<10}  {:<8}  {:<8}  {}",
            "ID", "NAME", "STATE", "SIZE", "REPLICATE", "REPL %", "SEED %", "SCOPE"
        )?;
        writeln!(writer, "{}", "─".repeat(130))?;
        for image in self {
            writeln!(
                writer,
                "{:<36}  {:<20}  {:<10}  {:>12}  {:<10}  {:<8}  {:<8}  {}",
                image.id,
                truncate(&image.name, 20),
                image.state,
                image.size,
                image.replication_type,
                image.replication_progress,
                image.seeding_progress,
                image.scope_label()
            )?;
        }
        total(writer, self.len(), "image")
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for image in self {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                image.id,
                image.name,
                image.state,
                image.size,
                image.replication_type,
                image.replication_progress,
                image.seeding_progress
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for Image {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Image: {}", self.id)?;
        writeln!(writer, "  Name:                 {}", self.name)?;
        writeln!(writer, "  State:                {}", self.state)?;
        writeln!(writer, "  Size:                 {} Byte(s)", self.size)?;
        writeln!(writer, "  Replication Type:     {}", self.replication_type)?;
        writeln!(writer, "  Replication Progress: {}", self.replication_progress)?;
        writeln!(writer, "  Seeding Progress:     {}", self.seeding_progress)?;
        writeln!(writer, "  Scope:                {}", self.scope_label())?;
        if !self.settings.is_empty() {
            writeln!(writer, "  Settings:")?;
            for setting in &self.settings {
                writeln!(writer, "    {}: {}", setting.name, setting.default_value)?;
            }
        }
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let settings: Vec<String> = self
            .settings
            .iter()
            .map(|s| format!("{}:{}", s.name, s.default_value))
            .collect();
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.id,
            self.name,
            self.state,
            self.size,
            self.replication_type,
            self.replication_progress,
            self.seeding_progress,
            settings.join(",")
        )?;
        Ok(())
    }
}

// ============================================================================
// Networks
// ============================================================================

impl TableDisplay for Vec<Network> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No networks")?;
            return Ok(());
        }
        writeln!(
            writer,
            "{:<36}  {:<20}  {:<10}  {:<24}  {:<7}  {}",
            "ID", "NAME", "STATE", "PORT GROUPS", "DEFAULT", "DESCRIPTION"
        )?;
        writeln!(writer, "{}", "─".repeat(120))?;
        for network in self {
            writeln!(
                writer,
                "{:<36}  {:<20}  {:<10}  {:<24}  {:<7}  {}",
                network.id,
                truncate(&network.name, 20),
                network.state,
                truncate(&network.port_groups.join(","), 24),
                network.is_default,
                network.description
            )?;
        }
        total(writer, self.len(), "network")
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for network in self {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}",
                network.id,
                network.name,
                network.state,
                network.port_groups.join(","),
                network.description,
                network.is_default
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for Network {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Network: {}", self.id)?;
        writeln!(writer, "  Name:        {}", self.name)?;
        writeln!(writer, "  State:       {}", self.state)?;
        writeln!(writer, "  Description: {}", self.description)?;
        writeln!(writer, "  Port Groups: {}", self.port_groups.join(", "))?;
        writeln!(writer, "  Default:     {}", self.is_default)?;
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        std::slice::from_ref(self).to_vec().write_script(writer)
    }
}

impl TableDisplay for Vec<Subnet> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No subnets")?;
            return Ok(());
        }
        writeln!(
            writer,
            "{:<36}  {:<20}  {:<10}  {:<8}  {:<18}  {:<7}  {}",
            "ID", "NAME", "STATE", "ROUTING", "CIDR", "DEFAULT", "DESCRIPTION"
        )?;
        writeln!(writer, "{}", "─".repeat(120))?;
        for subnet in self {
            writeln!(
                writer,
                "{:<36}  {:<20}  {:<10}  {:<8}  {:<18}  {:<7}  {}",
                subnet.id,
                truncate(&subnet.name, 20),
                subnet.state,
                subnet.routing_type,
                subnet.private_ip_cidr,
                subnet.is_default,
                subnet.description
            )?;
        }
        total(writer, self.len(), "subnet")
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for subnet in self {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                subnet.id,
                subnet.name,
                subnet.state,
                subnet.routing_type,
                subnet.private_ip_cidr,
                subnet.description,
                subnet.is_default
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for Subnet {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Subnet: {}", self.id)?;
        writeln!(writer, "  Name:         {}", self.name)?;
        writeln!(writer, "  State:        {}", self.state)?;
        writeln!(writer, "  Description:  {}", self.description)?;
        writeln!(writer, "  Routing Type: {}", self.routing_type)?;
        writeln!(writer, "  Private CIDR: {}", self.private_ip_cidr)?;
        writeln!(writer, "  Default:      {}", self.is_default)?;
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        std::slice::from_ref(self).to_vec().write_script(writer)
    }
}

// ============================================================================
// Clusters and VMs
// ============================================================================

impl TableDisplay for Vec<Cluster> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No clusters")?;
            return Ok(());
        }
        writeln!(
            writer,
            "{:<36}  {:<20}  {:<12}  {:<10}  {:>7}",
            "ID", "NAME", "TYPE", "STATE", "WORKERS"
        )?;
        writeln!(writer, "{}", "─".repeat(92))?;
        for cluster in self {
            writeln!(
                writer,
                "{:<36}  {:<20}  {:<12}  {:<10}  {:>7}",
                cluster.id,
                truncate(&cluster.name, 20),
                cluster.kind,
                cluster.state,
                cluster.worker_count
            )?;
        }
        total(writer, self.len(), "cluster")
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for cluster in self {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}",
                cluster.id, cluster.name, cluster.kind, cluster.state, cluster.worker_count
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for Cluster {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Cluster: {}", self.id)?;
        writeln!(writer, "  Name:         {}", self.name)?;
        writeln!(writer, "  Type:         {}", self.kind)?;
        writeln!(writer, "  State:        {}", self.state)?;
        writeln!(writer, "  Worker count: {}", self.worker_count)?;
        for (key, value) in &self.extended_properties {
            writeln!(writer, "  {key}: {value}")?;
        }
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        std::slice::from_ref(self).to_vec().write_script(writer)
    }
}

/// Cluster counts by state, for `cluster list --summary`.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
    /// `(type, state, count)` rows.
    pub rows: Vec<(String, String, usize)>,
    /// Total number of clusters.
    pub total: usize,
}

impl ClusterSummary {
    /// Count clusters by type and state.
    #[must_use]
    pub fn from_clusters(clusters: &[Cluster]) -> Self {
        let mut counts: std::collections::BTreeMap<(String, String), usize> =
            std::collections::BTreeMap::new();
        for cluster in clusters {
            *counts
                .entry((cluster.kind.clone(), cluster.state.clone()))
                .or_default() += 1;
        }
        Self {
            rows: counts.into_iter().map(|((k, s), n)| (k, s, n)).collect(),
            total: clusters.len(),
        }
    }
}

impl TableDisplay for ClusterSummary {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{:<12}  {:<10}  {:>5}", "TYPE", "STATE", "COUNT")?;
        for (kind, state, count) in &self.rows {
            writeln!(writer, "{kind:<12}  {state:<10}  {count:>5}")?;
        }
        total(writer, self.total, "cluster")
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for (kind, state, count) in &self.rows {
            writeln!(writer, "{kind}\t{state}\t{count}")?;
        }
        Ok(())
    }
}

/// A cluster master and its addresses.
#[derive(Debug, Clone, Serialize)]
pub struct MasterVm {
    /// VM id.
    pub vm_id: String,
    /// VM name.
    pub name: String,
    /// Network connections reported for the VM.
    pub connections: Vec<NetworkConnection>,
}

/// A cluster with its master VMs.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterDetail {
    /// The cluster record.
    #[serde(flatten)]
    pub cluster: Cluster,
    /// Master VMs with their IPs.
    pub masters: Vec<MasterVm>,
}

impl TableDisplay for ClusterDetail {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let c = &self.cluster;
        writeln!(writer, "Cluster: {}", c.id)?;
        writeln!(writer, "  Name:         {}", c.name)?;
        writeln!(writer, "  Type:         {}", c.kind)?;
        writeln!(writer, "  State:        {}", c.state)?;
        writeln!(writer, "  Worker count: {}", c.worker_count)?;
        if !c.extended_properties.is_empty() {
            writeln!(writer, "  Extended Properties:")?;
            for (key, value) in &c.extended_properties {
                writeln!(writer, "    {key}: {value}")?;
            }
        }
        if !self.masters.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "  {:<36}  {:<20}  {}", "VM ID", "VM NAME", "VM IP")?;
            for master in &self.masters {
                let ips: Vec<&str> = master
                    .connections
                    .iter()
                    .map(|n| n.ip_address.as_str())
                    .filter(|ip| !ip.is_empty())
                    .collect();
                writeln!(
                    writer,
                    "  {:<36}  {:<20}  {}",
                    master.vm_id,
                    truncate(&master.name, 20),
                    ips.join(", ")
                )?;
            }
        }
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let c = &self.cluster;
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            c.id, c.name, c.state, c.kind, c.worker_count
        )?;
        for master in &self.masters {
            for conn in master.connections.iter().filter(|n| !n.ip_address.is_empty()) {
                writeln!(writer, "{}\t{}", master.vm_id, conn.ip_address)?;
            }
        }
        Ok(())
    }
}

impl TableDisplay for Vec<Vm> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No VMs")?;
            return Ok(());
        }
        writeln!(
            writer,
            "{:<36}  {:<24}  {:<10}  {:<16}",
            "ID", "NAME", "STATE", "FLAVOR"
        )?;
        writeln!(writer, "{}", "─".repeat(92))?;
        for vm in self {
            writeln!(
                writer,
                "{:<36}  {:<24}  {:<10}  {:<16}",
                vm.id,
                truncate(&vm.name, 24),
                vm.state,
                truncate(&vm.flavor, 16)
            )?;
        }
        total(writer, self.len(), "VM")
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for vm in self {
            writeln!(writer, "{}\t{}\t{}", vm.id, vm.name, vm.state)?;
        }
        Ok(())
    }
}

// ============================================================================
// Hosts and deployments
// ============================================================================

impl TableDisplay for Vec<Host> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No hosts")?;
            return Ok(());
        }
        writeln!(
            writer,
            "{:<36}  {:<12}  {:<16}  {}",
            "ID", "STATE", "IP", "TAGS"
        )?;
        writeln!(writer, "{}", "─".repeat(80))?;
        for host in self {
            writeln!(
                writer,
                "{:<36}  {:<12}  {:<16}  {}",
                host.id,
                host.state,
                host.address,
                host.usage_tags.join(", ")
            )?;
        }
        total(writer, self.len(), "host")
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for host in self {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}",
                host.id,
                host.state,
                host.address,
                host.usage_tags.join(",")
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for Host {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Host: {}", self.id)?;
        writeln!(writer, "  IP:                {}", self.address)?;
        writeln!(writer, "  Username:          {}", self.username)?;
        writeln!(writer, "  State:             {}", self.state)?;
        writeln!(writer, "  Tags:              {}", self.usage_tags.join(", "))?;
        writeln!(writer, "  Availability Zone: {}", self.availability_zone)?;
        writeln!(writer, "  Version:           {}", self.esx_version)?;
        if !self.metadata.is_empty() {
            writeln!(writer, "  Metadata:")?;
            for (key, value) in &self.metadata {
                writeln!(writer, "    {key}: {value}")?;
            }
        }
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let metadata: Vec<String> = self
            .metadata
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect();
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.id,
            self.username,
            self.address,
            self.usage_tags.join(","),
            self.state,
            metadata.join(","),
            self.availability_zone
        )?;
        Ok(())
    }
}

impl TableDisplay for Vec<Deployment> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No deployments")?;
            return Ok(());
        }
        writeln!(writer, "{:<36}  {:<12}", "ID", "STATE")?;
        writeln!(writer, "{}", "─".repeat(50))?;
        for deployment in self {
            writeln!(writer, "{:<36}  {:<12}", deployment.id, deployment.state)?;
        }
        total(writer, self.len(), "deployment")
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for deployment in self {
            writeln!(writer, "{}\t{}", deployment.id, deployment.state)?;
        }
        Ok(())
    }
}

impl TableDisplay for Deployment {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Deployment: {}", self.id)?;
        writeln!(writer, "  State:            {}", self.state)?;
        writeln!(writer, "  Image Datastores: {}", self.image_datastores.join(", "))?;
        writeln!(
            writer,
            "  Use for VMs:      {}",
            self.use_image_datastore_for_vms
        )?;
        writeln!(writer, "  Syslog Endpoint:  {}", self.syslog_endpoint)?;
        writeln!(writer, "  NTP Endpoint:     {}", self.ntp_endpoint)?;
        writeln!(writer, "  Auth Enabled:     {}", self.auth.enabled)?;
        if self.auth.enabled {
            writeln!(writer, "  Auth Endpoint:    {}", self.auth.endpoint)?;
            writeln!(writer, "  Auth Tenant:      {}", self.auth.tenant)?;
        }
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.id,
            self.state,
            self.image_datastores.join(","),
            self.use_image_datastore_for_vms,
            self.syslog_endpoint,
            self.ntp_endpoint
        )?;
        Ok(())
    }
}

// ============================================================================
// Tasks and system
// ============================================================================

impl TableDisplay for Vec<Task> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No tasks")?;
            return Ok(());
        }
        writeln!(
            writer,
            "{:<36}  {:<12}  {:<24}  {:<10}  {:<36}  {}",
            "ID", "STATE", "OPERATION", "KIND", "ENTITY", "STARTED"
        )?;
        writeln!(writer, "{}", "─".repeat(140))?;
        for task in self {
            writeln!(
                writer,
                "{:<36}  {:<12}  {:<24}  {:<10}  {:<36}  {}",
                task.id,
                task.state,
                truncate(&task.operation, 24),
                task.entity.kind,
                task.entity.id,
                timestamp(task.started_at())
            )?;
        }
        total(writer, self.len(), "task")
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for task in self {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                task.id,
                task.state,
                task.entity.id,
                task.entity.kind,
                task.operation,
                task.started_time,
                task.end_time
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for Task {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Task: {}", self.id)?;
        writeln!(writer, "  State:     {}", self.state)?;
        writeln!(writer, "  Operation: {}", self.operation)?;
        writeln!(writer, "  Entity:    {} {}", self.entity.kind, self.entity.id)?;
        writeln!(writer, "  Started:   {}", timestamp(self.started_at()))?;
        writeln!(writer, "  Ended:     {}", timestamp(self.ended_at()))?;
        if matches!(self.state, strato_proto::TaskState::Error) {
            writeln!(writer, "  Error:     {}", self.error_message())?;
        }
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        std::slice::from_ref(self).to_vec().write_script(writer)
    }
}

impl TableDisplay for SystemStatus {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Overall status: {}", self.status)?;
        writeln!(writer)?;
        writeln!(writer, "{:<24}  {:<10}  {}", "COMPONENT", "STATUS", "MESSAGE")?;
        writeln!(writer, "{}", "─".repeat(60))?;
        for component in &self.components {
            writeln!(
                writer,
                "{:<24}  {:<10}  {}",
                component.component, component.status, component.message
            )?;
        }
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.status)?;
        for component in &self.components {
            writeln!(writer, "{}\t{}", component.component, component.status)?;
        }
        Ok(())
    }
}

// ============================================================================
// Local state
// ============================================================================

/// The resource currently selected in the config store.
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    /// `tenant` or `project`.
    pub kind: &'static str,
    /// Selected name, if any.
    pub name: Option<String>,
    /// Selected id, if any.
    pub id: Option<String>,
}

impl TableDisplay for Selection {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match (&self.name, &self.id) {
            (Some(name), Some(id)) => writeln!(writer, "Current {} is '{name}' ({id})", self.kind)?,
            _ => writeln!(writer, "No {} selected", self.kind)?,
        }
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if let (Some(name), Some(id)) = (&self.name, &self.id) {
            writeln!(writer, "{id}\t{name}")?;
        }
        Ok(())
    }
}

/// The configured target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetInfo {
    /// Controller endpoint.
    pub endpoint: Option<String>,
    /// Whether a token is stored.
    pub logged_in: bool,
    /// Current tenant name.
    pub tenant: Option<String>,
    /// Current project name.
    pub project: Option<String>,
}

impl TableDisplay for TargetInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let none = || "-".to_string();
        writeln!(writer, "Target")?;
        writeln!(writer, "  Endpoint:  {}", self.endpoint.clone().unwrap_or_else(none))?;
        writeln!(writer, "  Logged in: {}", self.logged_in)?;
        writeln!(writer, "  Tenant:    {}", self.tenant.clone().unwrap_or_else(none))?;
        writeln!(writer, "  Project:   {}", self.project.clone().unwrap_or_else(none))?;
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            self.endpoint.as_deref().unwrap_or_default(),
            self.logged_in,
            self.tenant.as_deref().unwrap_or_default(),
            self.project.as_deref().unwrap_or_default()
        )?;
        Ok(())
    }
}

/// Result of a mutating command, when the entity is not fetched back.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// Resource kind, e.g. `cluster`.
    pub resource: String,
    /// What happened, e.g. `created`.
    pub action: String,
    /// Entity id.
    pub id: String,
}

impl Outcome {
    /// Create an outcome.
    #[must_use]
    pub fn new(resource: &str, action: &str, id: impl Into<String>) -> Self {
        Self {
            resource: resource.to_string(),
            action: action.to_string(),
            id: id.into(),
        }
    }
}

impl TableDisplay for Outcome {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.id.is_empty() {
            writeln!(writer, "✓ {} {}", capitalize(&self.resource), self.action)?;
        } else {
            writeln!(
                writer,
                "✓ {} {} {}",
                capitalize(&self.resource),
                self.id,
                self.action
            )?;
        }
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.id)?;
        Ok(())
    }
}

/// Simple message output.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message text.
    pub message: String,
    /// Whether this is a success message.
    pub success: bool,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    /// Create an info message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.success {
            writeln!(writer, "✓ {}", self.message)?;
        } else {
            writeln!(writer, "{}", self.message)?;
        }
        Ok(())
    }

    fn write_script<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.message)?;
        Ok(())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Truncate a string to a maximum length, adding "..." if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_proto::TaskState;
    use strato_proto::resources::QuotaStatusLineItem;

    fn tenants() -> Vec<Tenant> {
        vec![
            Tenant {
                id: "t-1".into(),
                name: "acme".into(),
                security_groups: vec![],
            },
            Tenant {
                id: "t-2".into(),
                name: "globex".into(),
                security_groups: vec![],
            },
        ]
    }

    #[test]
    fn resolve_prefers_explicit_format() {
        assert_eq!(OutputFormat::resolve(Some(Format::Json), true).format(), Format::Json);
        assert_eq!(OutputFormat::resolve(None, true).format(), Format::Script);
        assert_eq!(OutputFormat::resolve(None, false).format(), Format::Table);
    }

    #[test]
    fn tenant_list_table() {
        let output = OutputFormat::new(Format::Table).to_string(&tenants()).unwrap();
        assert!(output.contains("NAME"));
        assert!(output.contains("globex"));
        assert!(output.contains("Total: 2 tenant(s)"));
    }

    #[test]
    fn tenant_list_script_is_tab_separated() {
        let output = OutputFormat::new(Format::Script).to_string(&tenants()).unwrap();
        assert_eq!(output, "t-1\tacme\nt-2\tglobex\n");
    }

    #[test]
    fn tenant_list_json_is_array() {
        let output = OutputFormat::new(Format::Json).to_string(&tenants()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[1]["name"], "globex");
    }

    #[test]
    fn empty_lists_say_so() {
        let output = OutputFormat::new(Format::Table)
            .to_string(&Vec::<Cluster>::new())
            .unwrap();
        assert_eq!(output, "No clusters\n");
        let output = OutputFormat::new(Format::Script)
            .to_string(&Vec::<Cluster>::new())
            .unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn policy_rows_join_roles() {
        let policy = vec![
            PolicyEntry {
                principal: "ops@example.local".into(),
                roles: vec!["owner".into(), "viewer".into()],
            },
            PolicyEntry {
                principal: "example.local\\auditors".into(),
                roles: vec!["viewer".into()],
            },
        ];
        let script = OutputFormat::new(Format::Script).to_string(&policy).unwrap();
        assert_eq!(
            script,
            "ops@example.local\towner,viewer\nexample.local\\auditors\tviewer\n"
        );
        let table = OutputFormat::new(Format::Table).to_string(&policy).unwrap();
        assert!(table.contains("owner, viewer"));
        assert!(table.contains("Total: 2 principal(s)"));
    }

    #[test]
    fn single_cluster_renders_detail_and_row() {
        let cluster: Cluster = serde_json::from_value(serde_json::json!({
            "id": "c-1",
            "name": "k8s",
            "type": "KUBERNETES",
            "state": "READY",
            "workerCount": 3,
            "extendedProperties": {"dns": "10.0.0.2"}
        }))
        .unwrap();

        let table = OutputFormat::new(Format::Table).to_string(&cluster).unwrap();
        assert!(table.starts_with("Cluster: c-1\n"));
        assert!(table.contains("Worker count: 3"));
        assert!(table.contains("dns: 10.0.0.2"));

        let script = OutputFormat::new(Format::Script).to_string(&cluster).unwrap();
        assert_eq!(script, "c-1\tk8s\tKUBERNETES\tREADY\t3\n");
    }

    #[test]
    fn project_shows_quota() {
        let mut project = Project {
            id: "p-1".into(),
            name: "web".into(),
            ..Project::default()
        };
        project.resource_quota.quota_line_items.insert(
            "vm.count".into(),
            QuotaStatusLineItem {
                limit: 10.0,
                usage: 2.0,
                unit: "COUNT".into(),
            },
        );
        let table = OutputFormat::new(Format::Table).to_string(&project).unwrap();
        assert!(table.contains("vm.count"));
        let script = OutputFormat::new(Format::Script).to_string(&project).unwrap();
        assert_eq!(script, "p-1\tweb\tvm.count:10:2:COUNT\n");
    }

    #[test]
    fn cluster_detail_lists_master_ips() {
        let detail = ClusterDetail {
            cluster: Cluster {
                id: "c-1".into(),
                name: "k8s".into(),
                kind: "KUBERNETES".into(),
                state: "READY".into(),
                worker_count: 2,
                ..Cluster::default()
            },
            masters: vec![MasterVm {
                vm_id: "vm-1".into(),
                name: "master-1".into(),
                connections: vec![NetworkConnection {
                    ip_address: "10.0.0.12".into(),
                    ..NetworkConnection::default()
                }],
            }],
        };
        let table = OutputFormat::new(Format::Table).to_string(&detail).unwrap();
        assert!(table.contains("10.0.0.12"));
        let script = OutputFormat::new(Format::Script).to_string(&detail).unwrap();
        assert_eq!(script, "c-1\tk8s\tREADY\tKUBERNETES\t2\nvm-1\t10.0.0.12\n");
        let json = OutputFormat::new(Format::Json).to_string(&detail).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "KUBERNETES");
        assert_eq!(parsed["masters"][0]["vm_id"], "vm-1");
    }

    #[test]
    fn cluster_summary_counts() {
        let clusters = vec![
            Cluster {
                id: "a".into(),
                kind: "KUBERNETES".into(),
                state: "READY".into(),
                ..Cluster::default()
            },
            Cluster {
                id: "b".into(),
                kind: "KUBERNETES".into(),
                state: "READY".into(),
                ..Cluster::default()
            },
            Cluster {
                id: "c".into(),
                kind: "KUBERNETES".into(),
                state: "ERROR".into(),
                ..Cluster::default()
            },
        ];
        let summary = ClusterSummary::from_clusters(&clusters);
        assert_eq!(summary.total, 3);
        assert_eq!(
            summary.rows,
            vec![
                ("KUBERNETES".to_string(), "ERROR".to_string(), 1),
                ("KUBERNETES".to_string(), "READY".to_string(), 2),
            ]
        );
    }

    #[test]
    fn failed_task_shows_error() {
        let task = Task::new("t-1", "CREATE_HOST", TaskState::Error).with_error("E", "boom");
        let table = OutputFormat::new(Format::Table).to_string(&task).unwrap();
        assert!(table.contains("boom (E)"));
    }

    #[test]
    fn outcome_script_prints_id() {
        let outcome = Outcome::new("cluster", "created", "c-1");
        let script = OutputFormat::new(Format::Script).to_string(&outcome).unwrap();
        assert_eq!(script, "c-1\n");
        let table = OutputFormat::new(Format::Table).to_string(&outcome).unwrap();
        assert_eq!(table, "✓ Cluster c-1 created\n");
    }

    #[test]
    fn emit_swallows_write_failures() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        OutputFormat::new(Format::Table).emit(&mut Broken, &Message::info("hello"));
    }

    #[test]
    fn message_success() {
        let output = OutputFormat::new(Format::Table)
            .to_string(&Message::success("Tenant deleted"))
            .unwrap();
        assert!(output.contains("✓ Tenant deleted"));
    }

    #[test]
    fn truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("hello", 5), "hello");
        assert_eq!(truncate("hello", 3), "hel");
    }
}
