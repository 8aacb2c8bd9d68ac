//! Capability traits every command goes through
//!
//! Commands never talk to [`ProxmoxClient`] directly. They obtain a
//! [`Backend`], which is either the live client or an injected
//! implementation, and drill down from cluster to node to guest.

mod live;

pub use live::{LiveContainer, LiveNode, LiveVirtualMachine};

use crate::client::ProxmoxClient;
use crate::error::Result;
use crate::types::{
    CloneOptions, ContainerStatus, NodeStatus, ResourceOption, ShutdownOptions, Snapshot, Task,
    VersionInfo, VirtualMachineStatus, WaitOptions,
};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cluster-level operations
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// All cluster members, in server order
    async fn nodes(&self) -> Result<Vec<NodeStatus>>;

    /// Handle for one node; fails when the node is unknown
    async fn node(&self, name: &str) -> Result<Box<dyn NodeApi>>;

    async fn version(&self) -> Result<VersionInfo>;

    /// Block until `task` finishes, `options.timeout` elapses or `cancel` fires
    async fn wait_task(
        &self,
        task: &Task,
        options: WaitOptions,
        cancel: &CancellationToken,
    ) -> Result<Task>;
}

/// Operations scoped to one node
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait NodeApi: Send + Sync {
    fn name(&self) -> String;

    async fn virtual_machines(&self) -> Result<Vec<VirtualMachineStatus>>;

    async fn containers(&self) -> Result<Vec<ContainerStatus>>;

    async fn container(&self, vmid: u32) -> Result<Box<dyn ContainerApi>>;

    async fn virtual_machine(&self, vmid: u32) -> Result<Box<dyn VirtualMachineApi>>;

    async fn create_virtual_machine(&self, vmid: u32, options: Vec<ResourceOption>)
        -> Result<Task>;

    async fn create_container(&self, vmid: u32, options: Vec<ResourceOption>) -> Result<Task>;
}

/// Operations on one LXC container
///
/// Mutations return as soon as the cluster accepts the job.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ContainerApi: Send + Sync {
    fn vmid(&self) -> u32;

    async fn status(&self) -> Result<ContainerStatus>;

    async fn start(&self) -> Result<Task>;

    async fn stop(&self) -> Result<Task>;

    async fn shutdown(&self, options: ShutdownOptions) -> Result<Task>;

    async fn reboot(&self) -> Result<Task>;

    async fn delete(&self) -> Result<Task>;

    /// Returns the id of the copy with the clone task
    async fn create_clone(&self, options: CloneOptions) -> Result<(u32, Task)>;

    async fn snapshots(&self) -> Result<Vec<Snapshot>>;
}

/// Operations on one QEMU virtual machine
///
/// Mutations return as soon as the cluster accepts the job.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait VirtualMachineApi: Send + Sync {
    fn vmid(&self) -> u32;

    async fn status(&self) -> Result<VirtualMachineStatus>;

    async fn start(&self) -> Result<Task>;

    async fn stop(&self) -> Result<Task>;

    async fn shutdown(&self, options: ShutdownOptions) -> Result<Task>;

    async fn reboot(&self) -> Result<Task>;

    async fn delete(&self) -> Result<Task>;

    /// Returns the id of the copy with the clone task
    async fn create_clone(&self, options: CloneOptions) -> Result<(u32, Task)>;
}

/// The client a command works with
///
/// Exactly one of the live HTTP client or an implementation supplied by a
/// test harness.
#[derive(Clone)]
pub enum Backend {
    Live(ProxmoxClient),
    Injected(Arc<dyn ClusterApi>),
}

impl Backend {
    pub fn is_live(&self) -> bool {
        matches!(self, Backend::Live(_))
    }

    fn api(&self) -> &dyn ClusterApi {
        match self {
            Backend::Live(client) => client,
            Backend::Injected(api) => api.as_ref(),
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Live(client) => f.debug_tuple("Live").field(client).finish(),
            Backend::Injected(_) => f.write_str("Injected"),
        }
    }
}

#[async_trait]
impl ClusterApi for Backend {
    async fn nodes(&self) -> Result<Vec<NodeStatus>> {
        self.api().nodes().await
    }

    async fn node(&self, name: &str) -> Result<Box<dyn NodeApi>> {
        self.api().node(name).await
    }

    async fn version(&self) -> Result<VersionInfo> {
        self.api().version().await
    }

    async fn wait_task(
        &self,
        task: &Task,
        options: WaitOptions,
        cancel: &CancellationToken,
    ) -> Result<Task> {
        self.api().wait_task(task, options, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_injected_backend_delegates() {
        let mut mock = MockClusterApi::new();
        mock.expect_nodes().times(1).returning(|| {
            Ok(vec![NodeStatus {
                node: "pve".into(),
                status: "online".into(),
                ..Default::default()
            }])
        });

        let backend = Backend::Injected(Arc::new(mock));
        assert!(!backend.is_live());

        let nodes = backend.nodes().await.unwrap();
        assert_eq!(nodes[0].node, "pve");
    }

    #[tokio::test]
    async fn test_drill_down_through_mocks() {
        let mut container = MockContainerApi::new();
        container
            .expect_start()
            .times(1)
            .returning(|| Ok(Task::accepted("UPID:pve:1:2:3:vzstart:200:root@pam:")));

        let mut node = MockNodeApi::new();
        let mut container = Some(container);
        node.expect_container()
            .withf(|vmid| *vmid == 200)
            .times(1)
            .returning(move |_| {
                let container = container.take().expect("container requested twice");
                Ok(Box::new(container) as Box<dyn ContainerApi>)
            });

        let mut cluster = MockClusterApi::new();
        let mut node = Some(node);
        cluster
            .expect_node()
            .withf(|name| name == "pve")
            .times(1)
            .returning(move |_| {
                let node = node.take().expect("node requested twice");
                Ok(Box::new(node) as Box<dyn NodeApi>)
            });

        let backend = Backend::Injected(Arc::new(cluster));
        let task = backend
            .node("pve")
            .await
            .unwrap()
            .container(200)
            .await
            .unwrap()
            .start()
            .await
            .unwrap();

        assert_eq!(task.node(), Some("pve"));
    }
}
