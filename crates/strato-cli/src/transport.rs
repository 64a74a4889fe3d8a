//! HTTP transport seam under [`crate::client::ApiClient`].
//!
//! [`Transport`] moves one request to the controller and returns the raw
//! status and body. [`HttpTransport`] does it with `reqwest`. With the
//! `test-util` feature, `MockTransport` replays scripted responses and
//! records every call.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, trace};

use crate::error::CliError;

#[cfg(any(test, feature = "test-util"))]
mod mock;

#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockTransport, RecordedCall};

/// How long to wait for a TCP connection to the controller.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on one JSON request. Uploads are not bounded.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP method of an API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
    /// DELETE.
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
            Self::Delete => f.write_str("DELETE"),
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// JSON document.
    Json(serde_json::Value),
    /// Multipart file upload with extra text fields.
    Upload {
        /// Local file to send.
        path: PathBuf,
        /// Extra form fields.
        fields: Vec<(String, String)>,
    },
}

/// One request against the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Server-relative path, possibly carrying its own query string.
    pub path: String,
    /// Extra query parameters.
    pub query: Vec<(String, String)>,
    /// Payload.
    pub body: RequestBody,
}

impl ApiRequest {
    /// A bodiless GET.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// A bodiless DELETE.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            ..Self::get(path)
        }
    }

    /// A POST with the given body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method: Method::Post,
            body,
            ..Self::get(path)
        }
    }

    /// Add a query parameter when `value` is present and non-empty.
    #[must_use]
    pub fn query_opt(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.query.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// Value of a query parameter, if set.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response from the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// A response with the given status and JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(status: u16, value: &T) -> Result<Self, CliError> {
        let body = serde_json::to_vec(value)
            .map_err(|e| CliError::Protocol(format!("cannot encode response: {e}")))?;
        Ok(Self { status, body })
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Sends requests to the controller.
pub trait Transport: Send + Sync {
    /// Send one request and return the raw response.
    ///
    /// Fails only when the server could not be reached; non-2xx statuses are
    /// returned as responses.
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, CliError>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Create a transport for `endpoint`, authenticating with `token` when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an http(s) URL.
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self, CliError> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(CliError::Config(format!(
                "invalid endpoint: {endpoint}, must start with http:// or https://"
            )));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("strato/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| CliError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// The base URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.endpoint)
        } else {
            format!("{}/{path}", self.endpoint)
        }
    }
}

/// Build a multipart form that streams the file at `path` from disk.
async fn upload_form(
    path: &std::path::Path,
    fields: Vec<(String, String)>,
) -> Result<Form, CliError> {
    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!(path = %path.display(), bytes = length, "Streaming upload");

    let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
    let mut form = Form::new().part(
        "file",
        Part::stream_with_length(body, length).file_name(file_name),
    );
    for (key, value) in fields {
        form = form.text(key, value);
    }
    Ok(form)
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, CliError> {
        let url = self.url_for(&request.path);
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Delete => self.client.delete(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            RequestBody::Empty => builder.timeout(REQUEST_TIMEOUT),
            RequestBody::Json(value) => builder.json(&value).timeout(REQUEST_TIMEOUT),
            RequestBody::Upload { path, fields } => {
                builder.multipart(upload_form(&path, fields).await?)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| CliError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| CliError::Transport(e.to_string()))?
            .to_vec();

        trace!(status, bytes = body.len(), "Received response");
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_transport_rejects_bad_endpoint() {
        let err = HttpTransport::new("ftp://controller", None).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn http_transport_joins_paths() {
        let transport = HttpTransport::new("https://controller:9000/", None).unwrap();
        assert_eq!(transport.endpoint(), "https://controller:9000");
        assert_eq!(transport.url_for("/tasks/t1"), "https://controller:9000/tasks/t1");
        assert_eq!(transport.url_for("tasks"), "https://controller:9000/tasks");
        assert_eq!(
            transport.url_for("https://other/tasks?page=2"),
            "https://other/tasks?page=2"
        );
    }

    #[test]
    fn query_opt_skips_empty() {
        let request = ApiRequest::get("/images")
            .query_opt("name", Some(""))
            .query_opt("state", None)
            .query_opt("kind", Some("vm"));
        assert_eq!(request.query, vec![("kind".to_string(), "vm".to_string())]);
        assert_eq!(request.query_value("kind"), Some("vm"));
    }

    #[tokio::test]
    async fn upload_of_missing_file_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("absent.qcow2");
        let err = upload_form(&missing, Vec::new()).await.unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[tokio::test]
    async fn upload_form_opens_file_without_reading_it() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("disk.img");
        std::fs::write(&path, vec![0u8; 64 * 1024]).unwrap();

        let form = upload_form(&path, vec![("name".into(), "disk".into())])
            .await
            .unwrap();
        assert!(!form.boundary().is_empty());
    }

    #[tokio::test]
    async fn mock_replays_in_order_and_repeats_last() {
        let mock = MockTransport::new();
        mock.ok(Method::Get, "/tasks/t1", &serde_json::json!({"state": "QUEUED"}));
        mock.ok(Method::Get, "/tasks/t1", &serde_json::json!({"state": "COMPLETED"}));

        let bodies: Vec<String> = futures::future::join_all(
            (0..3).map(|_| mock.send(ApiRequest::get("/tasks/t1"))),
        )
        .await
        .into_iter()
        .map(|r| String::from_utf8(r.unwrap().body).unwrap())
        .collect();

        assert!(bodies[0].contains("QUEUED"));
        assert!(bodies[1].contains("COMPLETED"));
        assert!(bodies[2].contains("COMPLETED"));
        assert_eq!(mock.count(Method::Get, "/tasks/t1"), 3);
    }

    #[tokio::test]
    async fn mock_unknown_route_is_404() {
        let mock = MockTransport::new();
        let response = mock.send(ApiRequest::delete("/clusters/x")).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn mock_records_json_bodies() {
        let mock = MockTransport::new();
        mock.ok(Method::Post, "/tenants", &serde_json::json!({"id": "t"}));
        let body = RequestBody::Json(serde_json::json!({"name": "acme"}));
        mock.send(ApiRequest::post("/tenants", body)).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].body.as_ref().unwrap()["name"], "acme");
    }

    #[tokio::test]
    async fn mock_failure_is_transport_error() {
        let mock = MockTransport::new();
        mock.fail(Method::Get, "/status", "connection refused");
        let err = mock.send(ApiRequest::get("/status")).await.unwrap_err();
        assert!(matches!(err, CliError::Transport(msg) if msg == "connection refused"));
    }
}
