use super::{ClusterApi, ContainerApi, NodeApi, VirtualMachineApi};
use crate::client::{GuestKind, ProxmoxClient};
use crate::error::{ApiError, Result};
use crate::task::wait_for_task;
use crate::types::{
    CloneOptions, ContainerStatus, NodeStatus, ResourceOption, ShutdownOptions, Snapshot, Task,
    VersionInfo, VirtualMachineStatus, WaitOptions,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[async_trait]
impl ClusterApi for ProxmoxClient {
    async fn nodes(&self) -> Result<Vec<NodeStatus>> {
        debug!("Listing nodes");
        ProxmoxClient::nodes(self)
            .await
            .map_err(|e| e.context("list", "nodes"))
    }

    async fn node(&self, name: &str) -> Result<Box<dyn NodeApi>> {
        debug!("Resolving node {}", name);
        if let Err(e) = self.node_status(name).await {
            return Err(self
                .classify_node_error(name, e)
                .await
                .context("get node", name));
        }
        Ok(Box::new(LiveNode {
            client: self.clone(),
            name: name.to_string(),
        }))
    }

    async fn version(&self) -> Result<VersionInfo> {
        ProxmoxClient::version(self)
            .await
            .map_err(|e| e.context("get", "version"))
    }

    async fn wait_task(
        &self,
        task: &Task,
        options: WaitOptions,
        cancel: &CancellationToken,
    ) -> Result<Task> {
        debug!("Waiting up to {:?} for task {}", options.timeout, task.upid);
        wait_for_task(self, task, options, cancel).await
    }
}

impl ProxmoxClient {
    /// The cluster answers a status request for an unknown node with a 500
    /// (a failed hostname lookup); the member list tells the two apart
    async fn classify_node_error(&self, name: &str, error: ApiError) -> ApiError {
        if !matches!(error.root(), ApiError::Server { status: 500, .. }) {
            return error;
        }
        match ProxmoxClient::nodes(self).await {
            Ok(nodes) if !nodes.iter().any(|node| node.node == name) => {
                debug!("Node {} is not a cluster member", name);
                ApiError::NotFound {
                    resource: format!("node {name}"),
                }
            }
            _ => error,
        }
    }
}

/// A node reached through the live client
#[derive(Debug, Clone)]
pub struct LiveNode {
    client: ProxmoxClient,
    name: String,
}

impl LiveNode {
    fn resource(&self, kind: GuestKind, vmid: u32) -> String {
        format!("{} {}/{}", kind.noun(), self.name, vmid)
    }
}

#[async_trait]
impl NodeApi for LiveNode {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn virtual_machines(&self) -> Result<Vec<VirtualMachineStatus>> {
        self.client
            .virtual_machines(&self.name)
            .await
            .map_err(|e| e.context("list virtual machines on", &self.name))
    }

    async fn containers(&self) -> Result<Vec<ContainerStatus>> {
        self.client
            .containers(&self.name)
            .await
            .map_err(|e| e.context("list containers on", &self.name))
    }

    async fn container(&self, vmid: u32) -> Result<Box<dyn ContainerApi>> {
        self.client
            .guest_status::<ContainerStatus>(&self.name, GuestKind::Container, vmid)
            .await
            .map_err(|e| e.context("get", self.resource(GuestKind::Container, vmid)))?;
        Ok(Box::new(LiveContainer {
            guest: LiveGuest::new(self.client.clone(), &self.name, GuestKind::Container, vmid),
        }))
    }

    async fn virtual_machine(&self, vmid: u32) -> Result<Box<dyn VirtualMachineApi>> {
        self.client
            .guest_status::<VirtualMachineStatus>(&self.name, GuestKind::VirtualMachine, vmid)
            .await
            .map_err(|e| e.context("get", self.resource(GuestKind::VirtualMachine, vmid)))?;
        Ok(Box::new(LiveVirtualMachine {
            guest: LiveGuest::new(
                self.client.clone(),
                &self.name,
                GuestKind::VirtualMachine,
                vmid,
            ),
        }))
    }

    async fn create_virtual_machine(
        &self,
        vmid: u32,
        options: Vec<ResourceOption>,
    ) -> Result<Task> {
        self.client
            .create_guest(&self.name, GuestKind::VirtualMachine, vmid, &options)
            .await
            .map_err(|e| e.context("create", self.resource(GuestKind::VirtualMachine, vmid)))
    }

    async fn create_container(&self, vmid: u32, options: Vec<ResourceOption>) -> Result<Task> {
        self.client
            .create_guest(&self.name, GuestKind::Container, vmid, &options)
            .await
            .map_err(|e| e.context("create", self.resource(GuestKind::Container, vmid)))
    }
}

/// Shared plumbing for both guest kinds
#[derive(Debug, Clone)]
struct LiveGuest {
    client: ProxmoxClient,
    node: String,
    kind: GuestKind,
    vmid: u32,
}

impl LiveGuest {
    fn new(client: ProxmoxClient, node: &str, kind: GuestKind, vmid: u32) -> Self {
        Self {
            client,
            node: node.to_string(),
            kind,
            vmid,
        }
    }

    fn resource(&self) -> String {
        format!("{} {}/{}", self.kind.noun(), self.node, self.vmid)
    }

    async fn status<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        self.client
            .guest_status(&self.node, self.kind, self.vmid)
            .await
            .map_err(|e| e.context("get", self.resource()))
    }

    async fn action(&self, action: &str) -> Result<Task> {
        debug!("{} {}", action, self.resource());
        self.client
            .guest_action(&self.node, self.kind, self.vmid, action)
            .await
            .map_err(|e| e.context(action, self.resource()))
    }

    async fn shutdown(&self, options: ShutdownOptions) -> Result<Task> {
        self.client
            .shutdown_guest(&self.node, self.kind, self.vmid, options)
            .await
            .map_err(|e| e.context("shutdown", self.resource()))
    }

    async fn delete(&self) -> Result<Task> {
        self.client
            .delete_guest(&self.node, self.kind, self.vmid)
            .await
            .map_err(|e| e.context("delete", self.resource()))
    }

    async fn create_clone(&self, options: &CloneOptions) -> Result<(u32, Task)> {
        self.client
            .clone_guest(&self.node, self.kind, self.vmid, options)
            .await
            .map_err(|e| e.context("clone", self.resource()))
    }
}

/// A container reached through the live client
#[derive(Debug, Clone)]
pub struct LiveContainer {
    guest: LiveGuest,
}

#[async_trait]
impl ContainerApi for LiveContainer {
    fn vmid(&self) -> u32 {
        self.guest.vmid
    }

    async fn status(&self) -> Result<ContainerStatus> {
        self.guest.status().await
    }

    async fn start(&self) -> Result<Task> {
        self.guest.action("start").await
    }

    async fn stop(&self) -> Result<Task> {
        self.guest.action("stop").await
    }

    async fn shutdown(&self, options: ShutdownOptions) -> Result<Task> {
        self.guest.shutdown(options).await
    }

    async fn reboot(&self) -> Result<Task> {
        self.guest.action("reboot").await
    }

    async fn delete(&self) -> Result<Task> {
        self.guest.delete().await
    }

    async fn create_clone(&self, options: CloneOptions) -> Result<(u32, Task)> {
        self.guest.create_clone(&options).await
    }

    async fn snapshots(&self) -> Result<Vec<Snapshot>> {
        self.guest
            .client
            .container_snapshots(&self.guest.node, self.guest.vmid)
            .await
            .map_err(|e| e.context("list snapshots of", self.guest.resource()))
    }
}

/// A virtual machine reached through the live client
#[derive(Debug, Clone)]
pub struct LiveVirtualMachine {
    guest: LiveGuest,
}

#[async_trait]
impl VirtualMachineApi for LiveVirtualMachine {
    fn vmid(&self) -> u32 {
        self.guest.vmid
    }

    async fn status(&self) -> Result<VirtualMachineStatus> {
        self.guest.status().await
    }

    async fn start(&self) -> Result<Task> {
        self.guest.action("start").await
    }

    async fn stop(&self) -> Result<Task> {
        self.guest.action("stop").await
    }

    async fn shutdown(&self, options: ShutdownOptions) -> Result<Task> {
        self.guest.shutdown(options).await
    }

    async fn reboot(&self) -> Result<Task> {
        self.guest.action("reboot").await
    }

    async fn delete(&self) -> Result<Task> {
        self.guest.delete().await
    }

    async fn create_clone(&self, options: CloneOptions) -> Result<(u32, Task)> {
        self.guest.create_clone(&options).await
    }
}
