//! Typed REST client for the controller.
//!
//! [`ApiClient`] turns resource verbs into [`ApiRequest`]s, sends them over a
//! [`Transport`] and decodes the replies. Mutating verbs return the [`Task`]
//! the server created; list verbs return the first [`Page`] of the
//! collection. Nothing here retries or waits.
//!
//! # Example
//!
//! ```rust,no_run
//! use strato_cli::client::ApiClient;
//! use strato_cli::transport::HttpTransport;
//!
//! # async fn example() -> Result<(), strato_cli::CliError> {
//! let client = ApiClient::new(HttpTransport::new("https://controller:9000", None)?);
//! let status = client.system_status().await?;
//! println!("{}", status.status);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use strato_proto::{
    ApiErrorBody, AvailabilityZoneCreateSpec, AvailabilityZoneSpec, Cluster, ClusterCreateSpec,
    ClusterResizeSpec, Deployment, DeploymentCreateSpec, Host, HostCreateSpec, Image,
    ImageCreateOptions, Network, NetworkCreateSpec, Page, PolicyDelta, PolicyEntry, Project,
    ProjectCreateSpec, ResourceQuota, SecurityGroupsSpec, Subnet, SubnetCreateSpec, SystemInfo,
    SystemStatus, Task, Tenant, TenantCreateSpec, Vm,
};
use tracing::debug;

use crate::error::CliError;
use crate::poller::TaskFetcher;
use crate::transport::{ApiRequest, ApiResponse, RequestBody, Transport};
use crate::walker::PageFetcher;

/// Filters for task listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only tasks acting on this entity id.
    pub entity_id: Option<String>,
    /// Only tasks acting on this entity kind.
    pub entity_kind: Option<String>,
    /// Only tasks in this state.
    pub state: Option<String>,
}

/// Host state transitions exposed as POST actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    /// Stop placing new VMs on the host.
    Suspend,
    /// Undo a suspend.
    Resume,
    /// Drain the host for maintenance.
    EnterMaintenance,
    /// Return the host to service.
    ExitMaintenance,
    /// (Re)install agents on the host.
    Provision,
}

impl HostAction {
    /// Path segment of this action.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Suspend => "suspend",
            Self::Resume => "resume",
            Self::EnterMaintenance => "enter-maintenance",
            Self::ExitMaintenance => "exit-maintenance",
            Self::Provision => "provision",
        }
    }
}

/// Resources that carry an IAM policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IamScope {
    /// An image.
    Image,
    /// A project.
    Project,
}

impl IamScope {
    /// Collection the resource lives in.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Project => "projects",
        }
    }

    /// Singular noun, for messages.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Project => "project",
        }
    }
}

/// REST client over a [`Transport`].
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    /// Create a client over `transport`.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a request and map non-2xx statuses to errors.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, CliError> {
        let method = request.method;
        let path = request.path.clone();
        let response = self.transport.send(request).await?;
        debug!(%method, path = %path, status = response.status, "API call");

        if response.is_success() {
            return Ok(response);
        }

        let body: ApiErrorBody = serde_json::from_slice(&response.body).unwrap_or_default();
        if response.status == 404 {
            let message = if body.message.is_empty() {
                path
            } else {
                body.message
            };
            return Err(CliError::NotFound(message));
        }
        Err(CliError::Api {
            status: response.status,
            code: body.code,
            message: body.message,
        })
    }

    async fn call<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, CliError> {
        let response = self.send(request).await?;
        serde_json::from_slice(&response.body)
            .map_err(|e| CliError::Protocol(format!("cannot decode response: {e}")))
    }

    async fn get<R: DeserializeOwned>(&self, path: String) -> Result<R, CliError> {
        self.call(ApiRequest::get(path)).await
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: String,
        body: &B,
    ) -> Result<R, CliError> {
        let value = serde_json::to_value(body)
            .map_err(|e| CliError::Protocol(format!("cannot encode request: {e}")))?;
        self.call(ApiRequest::post(path, RequestBody::Json(value)))
            .await
    }

    async fn post_empty(&self, path: String) -> Result<Task, CliError> {
        self.call(ApiRequest::post(path, RequestBody::Empty)).await
    }

    async fn delete(&self, path: String) -> Result<Task, CliError> {
        self.call(ApiRequest::delete(path)).await
    }

    // ========================================================================
    // Tasks and system
    // ========================================================================

    /// Fetch one task.
    pub async fn get_task(&self, id: &str) -> Result<Task, CliError> {
        self.get(format!("/tasks/{id}")).await
    }

    /// List tasks matching `filter`.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Page<Task>, CliError> {
        let request = ApiRequest::get("/tasks")
            .query_opt("entityId", filter.entity_id.as_deref())
            .query_opt("entityKind", filter.entity_kind.as_deref())
            .query_opt("state", filter.state.as_deref());
        self.call(request).await
    }

    /// Control-plane health.
    pub async fn system_status(&self) -> Result<SystemStatus, CliError> {
        self.get("/status".into()).await
    }

    /// Deployment-wide information, including the network type.
    pub async fn system_info(&self) -> Result<SystemInfo, CliError> {
        self.get("/info".into()).await
    }

    // ========================================================================
    // Tenants
    // ========================================================================

    /// List tenants, optionally by name.
    pub async fn list_tenants(&self, name: Option<&str>) -> Result<Page<Tenant>, CliError> {
        self.call(ApiRequest::get("/tenants").query_opt("name", name))
            .await
    }

    /// Create a tenant.
    pub async fn create_tenant(&self, spec: &TenantCreateSpec) -> Result<Task, CliError> {
        self.post("/tenants".into(), spec).await
    }

    /// Fetch one tenant.
    pub async fn get_tenant(&self, id: &str) -> Result<Tenant, CliError> {
        self.get(format!("/tenants/{id}")).await
    }

    /// Delete a tenant.
    pub async fn delete_tenant(&self, id: &str) -> Result<Task, CliError> {
        self.delete(format!("/tenants/{id}")).await
    }

    /// Quota of a tenant.
    pub async fn get_tenant_quota(&self, id: &str) -> Result<ResourceQuota, CliError> {
        self.get(format!("/tenants/{id}/quota")).await
    }

    // ========================================================================
    // Projects
    // ========================================================================

    /// List the projects of a tenant, optionally by name.
    pub async fn list_projects(
        &self,
        tenant_id: &str,
        name: Option<&str>,
    ) -> Result<Page<Project>, CliError> {
        let request = ApiRequest::get(format!("/tenants/{tenant_id}/projects")).query_opt("name", name);
        self.call(request).await
    }

    /// Create a project inside a tenant.
    pub async fn create_project(
        &self,
        tenant_id: &str,
        spec: &ProjectCreateSpec,
    ) -> Result<Task, CliError> {
        self.post(format!("/tenants/{tenant_id}/projects"), spec)
            .await
    }

    /// Fetch one project.
    pub async fn get_project(&self, id: &str) -> Result<Project, CliError> {
        self.get(format!("/projects/{id}")).await
    }

    /// Delete a project.
    pub async fn delete_project(&self, id: &str) -> Result<Task, CliError> {
        self.delete(format!("/projects/{id}")).await
    }

    /// Tasks of a project.
    pub async fn project_tasks(
        &self,
        id: &str,
        state: Option<&str>,
        kind: Option<&str>,
    ) -> Result<Page<Task>, CliError> {
        let request = ApiRequest::get(format!("/projects/{id}/tasks"))
            .query_opt("state", state)
            .query_opt("kind", kind);
        self.call(request).await
    }

    /// Replace the security groups of a project.
    pub async fn set_project_security_groups(
        &self,
        id: &str,
        spec: &SecurityGroupsSpec,
    ) -> Result<Task, CliError> {
        self.post(format!("/projects/{id}/set_security_groups"), spec)
            .await
    }

    // ========================================================================
    // IAM
    // ========================================================================

    /// IAM policy of an image or project.
    pub async fn get_iam(&self, scope: IamScope, id: &str) -> Result<Vec<PolicyEntry>, CliError> {
        self.get(format!("/{}/{id}/iam", scope.collection())).await
    }

    /// Grant or revoke a role on an image or project.
    pub async fn modify_iam(
        &self,
        scope: IamScope,
        id: &str,
        delta: &PolicyDelta,
    ) -> Result<Task, CliError> {
        self.post(format!("/{}/{id}/iam", scope.collection()), delta)
            .await
    }

    // ========================================================================
    // Clusters and VMs
    // ========================================================================

    /// Create a cluster inside a project.
    pub async fn create_cluster(
        &self,
        project_id: &str,
        spec: &ClusterCreateSpec,
    ) -> Result<Task, CliError> {
        self.post(format!("/projects/{project_id}/clusters"), spec)
            .await
    }

    /// List the clusters of a project.
    pub async fn list_clusters(&self, project_id: &str) -> Result<Page<Cluster>, CliError> {
        self.get(format!("/projects/{project_id}/clusters")).await
    }

    /// Fetch one cluster.
    pub async fn get_cluster(&self, id: &str) -> Result<Cluster, CliError> {
        self.get(format!("/clusters/{id}")).await
    }

    /// Delete a cluster.
    pub async fn delete_cluster(&self, id: &str) -> Result<Task, CliError> {
        self.delete(format!("/clusters/{id}")).await
    }

    /// Change the worker count of a cluster.
    pub async fn resize_cluster(&self, id: &str, spec: &ClusterResizeSpec) -> Result<Task, CliError> {
        self.post(format!("/clusters/{id}/resize"), spec).await
    }

    /// VMs of a cluster.
    pub async fn cluster_vms(&self, id: &str) -> Result<Page<Vm>, CliError> {
        self.get(format!("/clusters/{id}/vms")).await
    }

    /// Ask for the network connections of a VM. The answer arrives in the
    /// completed task's resource properties.
    pub async fn vm_networks(&self, vm_id: &str) -> Result<Task, CliError> {
        self.get(format!("/vms/{vm_id}/networks")).await
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Upload an image file, into a project when `project_id` is set.
    pub async fn upload_image(
        &self,
        project_id: Option<&str>,
        path: PathBuf,
        name: &str,
        options: &ImageCreateOptions,
    ) -> Result<Task, CliError> {
        let target = match project_id {
            Some(id) => format!("/projects/{id}/images"),
            None => "/images".to_string(),
        };
        let mut fields = vec![("name".to_string(), name.to_string())];
        if let Some(replication) = options.replication_type {
            fields.push(("imageReplication".to_string(), replication.to_string()));
        }
        self.call(ApiRequest::post(target, RequestBody::Upload { path, fields }))
            .await
    }

    /// List images, optionally by name.
    pub async fn list_images(&self, name: Option<&str>) -> Result<Page<Image>, CliError> {
        self.call(ApiRequest::get("/images").query_opt("name", name))
            .await
    }

    /// Fetch one image.
    pub async fn get_image(&self, id: &str) -> Result<Image, CliError> {
        self.get(format!("/images/{id}")).await
    }

    /// Delete an image.
    pub async fn delete_image(&self, id: &str) -> Result<Task, CliError> {
        self.delete(format!("/images/{id}")).await
    }

    /// Tasks of an image.
    pub async fn image_tasks(&self, id: &str, state: Option<&str>) -> Result<Page<Task>, CliError> {
        self.call(ApiRequest::get(format!("/images/{id}/tasks")).query_opt("state", state))
            .await
    }

    // ========================================================================
    // Physical networks
    // ========================================================================

    /// Create a physical network.
    pub async fn create_network(&self, spec: &NetworkCreateSpec) -> Result<Task, CliError> {
        self.post("/networks".into(), spec).await
    }

    /// List physical networks, optionally by name.
    pub async fn list_networks(&self, name: Option<&str>) -> Result<Page<Network>, CliError> {
        self.call(ApiRequest::get("/networks").query_opt("name", name))
            .await
    }

    /// Fetch one physical network.
    pub async fn get_network(&self, id: &str) -> Result<Network, CliError> {
        self.get(format!("/networks/{id}")).await
    }

    /// Delete a physical network.
    pub async fn delete_network(&self, id: &str) -> Result<Task, CliError> {
        self.delete(format!("/networks/{id}")).await
    }

    /// Make a physical network the default.
    pub async fn set_default_network(&self, id: &str) -> Result<Task, CliError> {
        self.post_empty(format!("/networks/{id}/set_default")).await
    }

    // ========================================================================
    // Software-defined subnets
    // ========================================================================

    /// Create a subnet inside a project.
    pub async fn create_subnet(
        &self,
        project_id: &str,
        spec: &SubnetCreateSpec,
    ) -> Result<Task, CliError> {
        self.post(format!("/projects/{project_id}/subnets"), spec)
            .await
    }

    /// List the subnets of a project, optionally by name.
    pub async fn list_subnets(
        &self,
        project_id: &str,
        name: Option<&str>,
    ) -> Result<Page<Subnet>, CliError> {
        let request = ApiRequest::get(format!("/projects/{project_id}/subnets")).query_opt("name", name);
        self.call(request).await
    }

    /// Fetch one subnet.
    pub async fn get_subnet(&self, id: &str) -> Result<Subnet, CliError> {
        self.get(format!("/subnets/{id}")).await
    }

    /// Delete a subnet.
    pub async fn delete_subnet(&self, id: &str) -> Result<Task, CliError> {
        self.delete(format!("/subnets/{id}")).await
    }

    /// Make a subnet the project default.
    pub async fn set_default_subnet(&self, id: &str) -> Result<Task, CliError> {
        self.post_empty(format!("/subnets/{id}/set_default")).await
    }

    // ========================================================================
    // Hosts
    // ========================================================================

    /// Register a host, inside a deployment when `deployment_id` is set.
    pub async fn create_host(
        &self,
        deployment_id: Option<&str>,
        spec: &HostCreateSpec,
    ) -> Result<Task, CliError> {
        let target = match deployment_id {
            Some(id) => format!("/deployments/{id}/hosts"),
            None => "/infrastructure/hosts".to_string(),
        };
        self.post(target, spec).await
    }

    /// List all hosts.
    pub async fn list_hosts(&self) -> Result<Page<Host>, CliError> {
        self.get("/infrastructure/hosts".into()).await
    }

    /// Fetch one host.
    pub async fn get_host(&self, id: &str) -> Result<Host, CliError> {
        self.get(format!("/infrastructure/hosts/{id}")).await
    }

    /// Delete a host.
    pub async fn delete_host(&self, id: &str) -> Result<Task, CliError> {
        self.delete(format!("/infrastructure/hosts/{id}")).await
    }

    /// Tasks of a host.
    pub async fn host_tasks(&self, id: &str, state: Option<&str>) -> Result<Page<Task>, CliError> {
        let request =
            ApiRequest::get(format!("/infrastructure/hosts/{id}/tasks")).query_opt("state", state);
        self.call(request).await
    }

    /// VMs placed on a host.
    pub async fn host_vms(&self, id: &str) -> Result<Page<Vm>, CliError> {
        self.get(format!("/infrastructure/hosts/{id}/vms")).await
    }

    /// Move a host to another availability zone.
    pub async fn set_host_availability_zone(
        &self,
        id: &str,
        spec: &AvailabilityZoneSpec,
    ) -> Result<Task, CliError> {
        self.post(format!("/infrastructure/hosts/{id}/set_availability_zone"), spec)
            .await
    }

    /// Run a state transition on a host.
    pub async fn host_action(&self, id: &str, action: HostAction) -> Result<Task, CliError> {
        self.post_empty(format!(
            "/infrastructure/hosts/{id}/{}",
            action.path_segment()
        ))
        .await
    }

    // ========================================================================
    // Deployments
    // ========================================================================

    /// Create a deployment.
    pub async fn create_deployment(&self, spec: &DeploymentCreateSpec) -> Result<Task, CliError> {
        self.post("/deployments".into(), spec).await
    }

    /// Create an availability zone.
    pub async fn create_availability_zone(
        &self,
        spec: &AvailabilityZoneCreateSpec,
    ) -> Result<Task, CliError> {
        self.post("/availabilityzones".into(), spec).await
    }

    /// Install the control plane on the hosts of a deployment.
    pub async fn deploy(&self, id: &str) -> Result<Task, CliError> {
        self.post_empty(format!("/deployments/{id}/deploy")).await
    }

    /// List deployments.
    pub async fn list_deployments(&self) -> Result<Page<Deployment>, CliError> {
        self.get("/deployments".into()).await
    }

    /// Fetch one deployment.
    pub async fn get_deployment(&self, id: &str) -> Result<Deployment, CliError> {
        self.get(format!("/deployments/{id}")).await
    }

    /// Hosts of a deployment.
    pub async fn deployment_hosts(&self, id: &str) -> Result<Page<Host>, CliError> {
        self.get(format!("/deployments/{id}/hosts")).await
    }

    /// Tear down the services of a deployment.
    pub async fn destroy_deployment(&self, id: &str) -> Result<Task, CliError> {
        self.post_empty(format!("/deployments/{id}/destroy")).await
    }

    /// Delete a deployment record.
    pub async fn delete_deployment(&self, id: &str) -> Result<Task, CliError> {
        self.delete(format!("/deployments/{id}")).await
    }
}

impl<T: Transport> TaskFetcher for ApiClient<T> {
    async fn get_task(&self, id: &str) -> Result<Task, CliError> {
        Self::get_task(self, id).await
    }
}

impl<T: Transport, R: DeserializeOwned + Send> PageFetcher<R> for ApiClient<T> {
    async fn get_page(&self, link: &str) -> Result<Page<R>, CliError> {
        self.get(link.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport};
    use serde_json::json;
    use strato_proto::TaskState;

    fn client() -> (ApiClient<MockTransport>, MockTransport) {
        let mock = MockTransport::new();
        (ApiClient::new(mock.clone()), mock)
    }

    #[tokio::test]
    async fn get_task_decodes() {
        let (client, mock) = client();
        mock.ok(
            Method::Get,
            "/tasks/t1",
            &json!({"id": "t1", "operation": "CREATE_HOST", "state": "STARTED"}),
        );
        let task = client.get_task("t1").await.unwrap();
        assert_eq!(task.state, TaskState::Started);
    }

    #[tokio::test]
    async fn not_found_maps_to_not_found() {
        let (client, mock) = client();
        mock.respond(
            Method::Get,
            "/clusters/c1",
            404,
            &json!({"code": "ClusterNotFound", "message": "cluster c1 not found"}),
        );
        let err = client.get_cluster("c1").await.unwrap_err();
        assert!(matches!(err, CliError::NotFound(msg) if msg == "cluster c1 not found"));
    }

    #[tokio::test]
    async fn server_error_carries_code() {
        let (client, mock) = client();
        mock.respond(
            Method::Post,
            "/tenants",
            400,
            &json!({"code": "InvalidEntity", "message": "name is required"}),
        );
        let err = client
            .create_tenant(&TenantCreateSpec::default())
            .await
            .unwrap_err();
        match err {
            CliError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, "InvalidEntity");
                assert_eq!(message, "name is required");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn iam_paths_follow_scope() {
        let (client, mock) = client();
        mock.ok(
            Method::Get,
            "/projects/p-1/iam",
            &json!([{"principal": "ops@example.local", "roles": ["owner"]}]),
        );
        mock.ok(Method::Post, "/images/i-1/iam", &json!({"id": "t1", "state": "QUEUED"}));

        let policy = client.get_iam(IamScope::Project, "p-1").await.unwrap();
        assert_eq!(policy[0].roles, vec!["owner"]);

        let delta = PolicyDelta {
            principal: "ops@example.local".into(),
            action: strato_proto::PolicyAction::Add,
            role: "viewer".into(),
        };
        client.modify_iam(IamScope::Image, "i-1", &delta).await.unwrap();
        let body = mock.calls()[1].body.clone().unwrap();
        assert_eq!(body, json!({"principal": "ops@example.local", "action": "ADD", "role": "viewer"}));
    }

    #[tokio::test]
    async fn undecodable_body_is_protocol_error() {
        let (client, mock) = client();
        mock.ok(Method::Get, "/status", &json!(["not", "an", "object"]));
        let err = client.system_status().await.unwrap_err();
        assert!(matches!(err, CliError::Protocol(_)));
    }

    #[tokio::test]
    async fn list_filters_become_query() {
        let (client, mock) = client();
        mock.ok(Method::Get, "/tasks", &json!({"items": []}));
        let filter = TaskFilter {
            entity_kind: Some("vm".into()),
            state: Some("ERROR".into()),
            ..TaskFilter::default()
        };
        client.list_tasks(&filter).await.unwrap();

        let calls = mock.calls();
        assert_eq!(
            calls[0].query,
            vec![
                ("entityKind".to_string(), "vm".to_string()),
                ("state".to_string(), "ERROR".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn host_actions_use_action_paths() {
        let (client, mock) = client();
        mock.ok(
            Method::Post,
            "/infrastructure/hosts/h1/enter-maintenance",
            &json!({"id": "t", "state": "QUEUED"}),
        );
        client
            .host_action("h1", HostAction::EnterMaintenance)
            .await
            .unwrap();
        assert_eq!(
            mock.count(Method::Post, "/infrastructure/hosts/h1/enter-maintenance"),
            1
        );
    }
}
