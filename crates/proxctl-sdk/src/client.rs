//! HTTP client for the cluster API
//!
//! This module provides a type-safe client for the `/api2/json` REST API of
//! a virtualization cluster. Requests can be sent with or without a session.
//!
//! # Authentication
//!
//! A session consists of a ticket and a CSRF prevention token, both issued
//! by `POST /access/ticket`:
//! - the ticket travels as the `PVEAuthCookie` cookie on every request
//! - the CSRF token is sent as the `CSRFPreventionToken` header on every
//!   request that is not a `GET`
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use proxctl_sdk::{ClientBuilder, SessionTicket};
//!
//! # async fn example() -> proxctl_sdk::Result<()> {
//! let client = ClientBuilder::default()
//!     .server_url("https://pve.example.com:8006")
//!     .session(SessionTicket::new("PVE:root@pam:...", "csrf"))
//!     .danger_accept_invalid_certs(true)
//!     .build()?;
//!
//! for node in client.nodes().await? {
//!     println!("{} {}", node.node, node.status);
//! }
//! # Ok(())
//! # }
//! ```

use crate::{
    auth::{Credentials, SessionTicket},
    error::{ApiError, ErrorResponse, Result},
    types::{
        CloneOptions, ContainerStatus, NodeStatus, ResourceOption, ShutdownOptions, Snapshot,
        Task, TaskStatus, VersionInfo, VirtualMachineStatus,
    },
};
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Path of the JSON API below the server URL
pub const API_PATH: &str = "api2/json";

/// Default timeout in seconds for API requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const AUTH_COOKIE: &str = "PVEAuthCookie";
const CSRF_HEADER: &str = "CSRFPreventionToken";

/// The two guest flavours share most endpoints and differ in the path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestKind {
    VirtualMachine,
    Container,
}

impl GuestKind {
    fn segment(self) -> &'static str {
        match self {
            GuestKind::VirtualMachine => "qemu",
            GuestKind::Container => "lxc",
        }
    }

    /// Human readable noun used in error context
    pub fn noun(self) -> &'static str {
        match self {
            GuestKind::VirtualMachine => "virtual machine",
            GuestKind::Container => "container",
        }
    }

    /// Clone parameter carrying the new guest's name
    fn clone_name_param(self) -> &'static str {
        match self {
            GuestKind::VirtualMachine => "name",
            GuestKind::Container => "hostname",
        }
    }
}

/// Every response body is wrapped as `{"data": ...}`
#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// HTTP client for the cluster API
///
/// Cloning is cheap; clones share the connection pool and session.
#[derive(Clone)]
pub struct ProxmoxClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    server_url: String,
    api_url: Url,
    session: Option<SessionTicket>,
}

impl fmt::Debug for ProxmoxClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxmoxClient")
            .field("server_url", &self.inner.server_url)
            .field("authenticated", &self.inner.session.is_some())
            .finish()
    }
}

impl ProxmoxClient {
    /// Server URL the client was built for, without the API path
    pub fn server_url(&self) -> &str {
        &self.inner.server_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.session.is_some()
    }

    // ===== Cluster =====

    /// API version of the server
    pub async fn version(&self) -> Result<VersionInfo> {
        self.get(&["version"]).await
    }

    /// All cluster members
    pub async fn nodes(&self) -> Result<Vec<NodeStatus>> {
        self.get(&["nodes"]).await
    }

    /// Raw status of a single node; used as an existence check
    pub async fn node_status(&self, node: &str) -> Result<serde_json::Value> {
        self.get(&["nodes", node, "status"]).await
    }

    /// Next free guest id
    pub async fn next_id(&self) -> Result<u32> {
        let value: serde_json::Value = self.get(&["cluster", "nextid"]).await?;
        match &value {
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| ApiError::InvalidResponse {
            message: format!("unexpected next id: {value}"),
        })
    }

    // ===== Guests =====

    pub async fn virtual_machines(&self, node: &str) -> Result<Vec<VirtualMachineStatus>> {
        self.get(&["nodes", node, GuestKind::VirtualMachine.segment()])
            .await
    }

    pub async fn containers(&self, node: &str) -> Result<Vec<ContainerStatus>> {
        self.get(&["nodes", node, GuestKind::Container.segment()])
            .await
    }

    /// Current status of one guest
    pub async fn guest_status<T: DeserializeOwned>(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: u32,
    ) -> Result<T> {
        let vmid = vmid.to_string();
        self.get(&["nodes", node, kind.segment(), &vmid, "status", "current"])
            .await
    }

    /// Create a guest with the given id and parameters
    pub async fn create_guest(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: u32,
        options: &[ResourceOption],
    ) -> Result<Task> {
        let mut form = vec![("vmid".to_string(), vmid.to_string())];
        form.extend(
            options
                .iter()
                .map(|option| (option.name.clone(), option.value.clone())),
        );
        self.post_task(&["nodes", node, kind.segment()], &form).await
    }

    /// Trigger a power action (`start`, `stop`, `reboot`, ...)
    pub async fn guest_action(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: u32,
        action: &str,
    ) -> Result<Task> {
        let vmid = vmid.to_string();
        self.post_task(&["nodes", node, kind.segment(), &vmid, "status", action], &[])
            .await
    }

    /// Ask the guest to shut down cleanly
    pub async fn shutdown_guest(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: u32,
        options: ShutdownOptions,
    ) -> Result<Task> {
        let vmid = vmid.to_string();
        let mut form = Vec::new();
        if options.force {
            form.push(("forceStop".to_string(), "1".to_string()));
        }
        if let Some(timeout) = options.timeout {
            form.push(("timeout".to_string(), timeout.to_string()));
        }
        self.post_task(
            &["nodes", node, kind.segment(), &vmid, "status", "shutdown"],
            &form,
        )
        .await
    }

    pub async fn delete_guest(&self, node: &str, kind: GuestKind, vmid: u32) -> Result<Task> {
        let vmid = vmid.to_string();
        let upid: String = self
            .request(Method::DELETE, &["nodes", node, kind.segment(), &vmid], None)
            .await?;
        Ok(Task::accepted(upid))
    }

    /// Clone a guest, returning the id of the copy and the clone task
    pub async fn clone_guest(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: u32,
        options: &CloneOptions,
    ) -> Result<(u32, Task)> {
        let new_id = match options.new_id {
            Some(id) => id,
            None => self.next_id().await?,
        };

        let mut form = vec![("newid".to_string(), new_id.to_string())];
        if let Some(name) = &options.name {
            form.push((kind.clone_name_param().to_string(), name.clone()));
        }
        if let Some(target) = &options.target {
            form.push(("target".to_string(), target.clone()));
        }
        if options.full {
            form.push(("full".to_string(), "1".to_string()));
        }
        if let Some(description) = &options.description {
            form.push(("description".to_string(), description.clone()));
        }

        let vmid = vmid.to_string();
        let task = self
            .post_task(&["nodes", node, kind.segment(), &vmid, "clone"], &form)
            .await?;
        Ok((new_id, task))
    }

    pub async fn container_snapshots(&self, node: &str, vmid: u32) -> Result<Vec<Snapshot>> {
        let vmid = vmid.to_string();
        self.get(&["nodes", node, GuestKind::Container.segment(), &vmid, "snapshot"])
            .await
    }

    // ===== Tasks =====

    pub async fn task_status(&self, node: &str, upid: &str) -> Result<TaskStatus> {
        self.get(&["nodes", node, "tasks", upid, "status"]).await
    }

    // ===== Access =====

    /// Exchange username and password for a session ticket
    pub async fn request_ticket(&self, credentials: &Credentials) -> Result<SessionTicket> {
        #[derive(Deserialize)]
        struct TicketResponse {
            ticket: String,
            #[serde(rename = "CSRFPreventionToken")]
            csrf_token: String,
            #[serde(default)]
            username: Option<String>,
        }

        let form = [
            ("username".to_string(), credentials.username.clone()),
            ("password".to_string(), credentials.password.clone()),
        ];
        let response: TicketResponse = self
            .request(Method::POST, &["access", "ticket"], Some(&form))
            .await?;

        Ok(SessionTicket {
            ticket: response.ticket,
            csrf_token: response.csrf_token,
            username: response
                .username
                .or_else(|| Some(credentials.username.clone())),
        })
    }

    // ===== Private Helper Methods =====

    /// Build the URL for a path below `/api2/json`, escaping each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.inner.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest {
                message: format!("server URL {} cannot carry a path", self.inner.server_url),
            })?
            .extend(segments);
        Ok(url)
    }

    /// Attach the session cookie and, for mutating requests, the CSRF header
    fn apply_auth(&self, method: &Method, request: RequestBuilder) -> RequestBuilder {
        match &self.inner.session {
            Some(session) => {
                let request =
                    request.header(header::COOKIE, format!("{AUTH_COOKIE}={}", session.ticket));
                if *method == Method::GET {
                    request
                } else {
                    request.header(CSRF_HEADER, &session.csrf_token)
                }
            }
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        self.request(Method::GET, segments, None).await
    }

    /// POST that answers with a task id
    async fn post_task(&self, segments: &[&str], form: &[(String, String)]) -> Result<Task> {
        let upid: String = self.request(Method::POST, segments, Some(form)).await?;
        Ok(Task::accepted(upid))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        form: Option<&[(String, String)]>,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "cluster API request");

        let mut request = self.inner.http_client.request(method.clone(), url);
        if let Some(form) = form {
            request = request.form(form);
        }
        let request = self.apply_auth(&method, request);

        let response = request.send().await.map_err(ApiError::HttpClient)?;
        self.handle_response(response).await
    }

    /// Handle successful response
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        if !response.status().is_success() {
            return self.handle_error_response(response).await;
        }

        let body = response.text().await.map_err(ApiError::HttpClient)?;
        serde_json::from_str::<DataEnvelope<T>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|e| ApiError::InvalidResponse {
                message: e.to_string(),
            })
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorResponse>(&error_text)
            .ok()
            .and_then(|body| body.summary())
            .or_else(|| {
                let text = error_text.trim();
                (!text.is_empty()).then(|| text.to_string())
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Authentication { message }),
            StatusCode::FORBIDDEN => Err(ApiError::Authorization { message }),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound { resource: message }),
            StatusCode::BAD_REQUEST => Err(ApiError::BadRequest { message }),
            StatusCode::INTERNAL_SERVER_ERROR if message.contains("does not exist") => {
                Err(ApiError::NotFound { resource: message })
            }
            _ => Err(ApiError::Server {
                status: status.as_u16(),
                message,
            }),
        }
    }
}

/// Builder for constructing a [`ProxmoxClient`]
#[derive(Default)]
pub struct ClientBuilder {
    server_url: Option<String>,
    session: Option<SessionTicket>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    accept_invalid_certs: bool,
}

impl ClientBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Server URL, e.g. `https://pve.example.com:8006`
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Authenticate every request with the given session
    pub fn session(mut self, session: SessionTicket) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Skip TLS certificate validation
    ///
    /// Cluster nodes ship with self-signed certificates, so this is usually
    /// required unless a trusted certificate has been installed. Anyone on the
    /// network path can impersonate the server while it is enabled.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ProxmoxClient> {
        let server_url = self
            .server_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ApiError::InvalidRequest {
                message: "a server URL is required".into(),
            })?;

        let api_url = Url::parse(&format!("{server_url}/{API_PATH}")).map_err(|e| {
            ApiError::InvalidRequest {
                message: format!("invalid server URL '{server_url}': {e}"),
            }
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(
                self.timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            )
            .connect_timeout(
                self.connect_timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            )
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(ApiError::HttpClient)?;

        Ok(ProxmoxClient {
            inner: Arc::new(ClientInner {
                http_client,
                server_url,
                api_url,
                session: self.session,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ProxmoxClient {
        ClientBuilder::default()
            .server_url(server.uri())
            .session(SessionTicket::new("PVE:root@pam:TICKET", "CSRF-TOKEN"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_nodes_sends_session_cookie() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api2/json/nodes"))
            .and(header("cookie", "PVEAuthCookie=PVE:root@pam:TICKET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"node": "pve", "status": "online", "cpu": 0.05, "maxcpu": 8, "uptime": 3600},
                    {"node": "pve2", "status": "offline"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let nodes = client_for(&mock_server).nodes().await.unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].node, "pve");
        assert!(nodes[0].is_online());
        assert!(!nodes[1].is_online());
    }

    #[tokio::test]
    async fn test_mutations_send_csrf_header() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api2/json/nodes/pve/lxc/200/status/start"))
            .and(header("CSRFPreventionToken", "CSRF-TOKEN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": "UPID:pve:0000ABCD:00000001:65000000:vzstart:200:root@pam:"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let task = client_for(&mock_server)
            .guest_action("pve", GuestKind::Container, 200, "start")
            .await
            .unwrap();

        assert_eq!(
            task.upid,
            "UPID:pve:0000ABCD:00000001:65000000:vzstart:200:root@pam:"
        );
        assert!(!task.completed);
    }

    #[tokio::test]
    async fn test_create_posts_vmid_and_options() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api2/json/nodes/pve/qemu"))
            .and(body_string_contains("vmid=105"))
            .and(body_string_contains("memory=2048"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": "UPID:pve:1:2:3:qmcreate:105:root@pam:"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let options = vec![
            ResourceOption::new("memory", "2048"),
            ResourceOption::new("cores", "2"),
        ];
        let task = client_for(&mock_server)
            .create_guest("pve", GuestKind::VirtualMachine, 105, &options)
            .await
            .unwrap();

        assert_eq!(task.node(), Some("pve"));
    }

    #[tokio::test]
    async fn test_shutdown_sends_force_and_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api2/json/nodes/pve/qemu/105/status/shutdown"))
            .and(body_string_contains("forceStop=1"))
            .and(body_string_contains("timeout=30"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": "UPID:pve:1:2:3:qmshutdown:105:root@pam:"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let options = ShutdownOptions {
            force: true,
            timeout: Some(30),
        };
        let task = client_for(&mock_server)
            .shutdown_guest("pve", GuestKind::VirtualMachine, 105, options)
            .await
            .unwrap();

        assert_eq!(task.upid, "UPID:pve:1:2:3:qmshutdown:105:root@pam:");
    }

    #[tokio::test]
    async fn test_plain_shutdown_sends_no_force() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api2/json/nodes/pve/lxc/200/status/shutdown"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": "UPID:pve:1:2:3:vzshutdown:200:root@pam:"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        client_for(&mock_server)
            .shutdown_guest("pve", GuestKind::Container, 200, ShutdownOptions::default())
            .await
            .unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(!body.contains("forceStop"), "body: {body}");
        assert!(!body.contains("timeout"), "body: {body}");
    }

    #[tokio::test]
    async fn test_clone_uses_next_id_when_unset() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api2/json/cluster/nextid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "201"})))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api2/json/nodes/pve/lxc/200/clone"))
            .and(body_string_contains("newid=201"))
            .and(body_string_contains("hostname=web-copy"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": "UPID:pve:1:2:3:vzclone:200:root@pam:"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let options = CloneOptions {
            name: Some("web-copy".into()),
            ..Default::default()
        };
        let (new_id, _task) = client_for(&mock_server)
            .clone_guest("pve", GuestKind::Container, 200, &options)
            .await
            .unwrap();

        assert_eq!(new_id, 201);
    }

    #[tokio::test]
    async fn test_missing_guest_maps_to_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api2/json/nodes/pve/lxc/999/status/current"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "data": null,
                "message": "Configuration file 'nodes/pve/lxc/999.conf' does not exist\n"
            })))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .guest_status::<ContainerStatus>("pve", GuestKind::Container, 999)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
    }

    #[tokio::test]
    async fn test_error_handling() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api2/json/nodes"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).nodes().await;

        assert!(matches!(
            result.unwrap_err(),
            ApiError::Authentication { .. }
        ));
    }

    #[tokio::test]
    async fn test_non_api_body_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api2/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>router</html>"))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).version().await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse { .. }));
    }

    #[test]
    fn test_builder_requires_server_url() {
        let result = ClientBuilder::default().build();
        assert!(matches!(
            result.unwrap_err(),
            ApiError::InvalidRequest { .. }
        ));
    }

    #[test]
    fn test_builder_with_all_options() {
        let client = ClientBuilder::default()
            .server_url("https://pve.example.com:8006/")
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .danger_accept_invalid_certs(true)
            .build()
            .unwrap();

        assert_eq!(client.server_url(), "https://pve.example.com:8006");
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_debug_hides_ticket() {
        let client = ClientBuilder::default()
            .server_url("https://pve.example.com:8006")
            .session(SessionTicket::new("SECRET-TICKET", "SECRET-CSRF"))
            .build()
            .unwrap();

        let debug = format!("{client:?}");
        assert!(!debug.contains("SECRET"));
        assert!(debug.contains("authenticated: true"));
    }
}
