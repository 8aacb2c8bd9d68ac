//! Type definitions for the cluster API
//!
//! Only the fields the CLI reads are declared; everything else in the
//! server's JSON is ignored. Numeric fields default to zero because the
//! server omits them for stopped guests and offline nodes.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Cluster member as reported by `GET /nodes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NodeStatus {
    /// Node name
    pub node: String,

    /// `online` or `offline`
    #[serde(default)]
    pub status: String,

    /// CPU utilisation as a fraction of `maxcpu`
    #[serde(default)]
    pub cpu: f64,

    #[serde(default)]
    pub maxcpu: u32,

    /// Used memory in bytes
    #[serde(default)]
    pub mem: u64,

    #[serde(default)]
    pub maxmem: u64,

    /// Used root disk in bytes
    #[serde(default)]
    pub disk: u64,

    #[serde(default)]
    pub maxdisk: u64,

    /// Seconds since boot
    #[serde(default)]
    pub uptime: u64,
}

impl NodeStatus {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

/// API version information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VersionInfo {
    pub version: String,

    #[serde(default)]
    pub release: String,

    #[serde(default)]
    pub repoid: String,
}

/// QEMU guest as listed under a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VirtualMachineStatus {
    #[serde(deserialize_with = "deserialize_vmid")]
    pub vmid: u32,

    #[serde(default)]
    pub name: String,

    /// `running`, `stopped`, ...
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub uptime: u64,

    #[serde(default)]
    pub cpus: f64,

    #[serde(default)]
    pub cpu: f64,

    #[serde(default)]
    pub mem: u64,

    #[serde(default)]
    pub maxmem: u64,

    #[serde(default)]
    pub maxdisk: u64,

    /// Set to 1 for templates
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub template: bool,
}

/// LXC guest as listed under a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContainerStatus {
    #[serde(deserialize_with = "deserialize_vmid")]
    pub vmid: u32,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub uptime: u64,

    #[serde(default)]
    pub cpus: f64,

    #[serde(default)]
    pub cpu: f64,

    #[serde(default)]
    pub mem: u64,

    #[serde(default)]
    pub maxmem: u64,

    #[serde(default)]
    pub maxdisk: u64,

    #[serde(default)]
    pub maxswap: u64,
}

/// Container snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Snapshot {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Unix timestamp; absent for the synthetic `current` entry
    #[serde(default)]
    pub snaptime: Option<i64>,

    #[serde(default)]
    pub parent: Option<String>,
}

/// Handle to an asynchronous cluster job
///
/// A task returned by a mutating call only means the cluster accepted the
/// job. `completed` and `is_successful` are filled in by an explicit wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub upid: String,
    pub completed: bool,
    pub is_successful: bool,
    pub exit_status: Option<String>,
}

impl Task {
    /// A task the cluster has accepted but not yet finished
    pub fn accepted(upid: impl Into<String>) -> Self {
        Self {
            upid: upid.into(),
            completed: false,
            is_successful: false,
            exit_status: None,
        }
    }

    /// The node that owns the task, taken from the UPID
    ///
    /// UPIDs look like `UPID:<node>:<pid>:<pstart>:<starttime>:<type>:<id>:<user>:`.
    pub fn node(&self) -> Option<&str> {
        let mut parts = self.upid.split(':');
        match (parts.next(), parts.next()) {
            (Some("UPID"), Some(node)) if !node.is_empty() => Some(node),
            _ => None,
        }
    }

    /// Mark the task finished with the given exit status
    pub fn finished(mut self, exit_status: impl Into<String>) -> Self {
        let exit_status = exit_status.into();
        self.completed = true;
        self.is_successful = exit_status == "OK";
        self.exit_status = Some(exit_status);
        self
    }

    /// Turn a finished-but-failed task into [`ApiError::TaskFailed`]
    ///
    /// [`ApiError::TaskFailed`]: crate::ApiError::TaskFailed
    pub fn ensure_successful(self) -> crate::Result<Self> {
        if self.completed && !self.is_successful {
            return Err(crate::ApiError::TaskFailed {
                exit_status: self
                    .exit_status
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
                upid: self.upid,
            });
        }
        Ok(self)
    }
}

/// Status of a task as returned by `GET /nodes/{node}/tasks/{upid}/status`
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatus {
    /// `running` or `stopped`
    pub status: String,

    #[serde(default)]
    pub exitstatus: Option<String>,
}

impl TaskStatus {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// How long and how often to poll a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// One creation parameter, written on the command line as `key=value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOption {
    pub name: String,
    pub value: String,
}

impl ResourceOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl FromStr for ResourceOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("missing option name in '{s}'"));
        }
        if name == "vmid" {
            return Err("vmid is set with --vmid, not as an option".to_string());
        }
        Ok(Self::new(name, value.trim()))
    }
}

impl fmt::Display for ResourceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Parameters for a guest shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownOptions {
    /// Hard-stop the guest if it has not shut down when the timeout elapses
    pub force: bool,
    /// Seconds the guest gets to shut down cleanly
    pub timeout: Option<u32>,
}

/// Parameters for cloning a guest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneOptions {
    /// Id for the copy; the next free id is requested when unset
    pub new_id: Option<u32>,
    /// VM name or container hostname of the copy
    pub name: Option<String>,
    /// Node to place the copy on
    pub target: Option<String>,
    /// Full copy instead of a linked clone
    pub full: bool,
    pub description: Option<String>,
}

/// Accepts `200` as well as `"200"`; the container listing returns strings
fn deserialize_vmid<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Accepts `1`/`0`, `true`/`false` and `""`
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(u64),
        String(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Number(n) => n != 0,
        Flag::String(s) => matches!(s.as_str(), "1" | "true"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_container_vmid_accepts_string() {
        let container: ContainerStatus = serde_json::from_str(
            r#"{"vmid":"200","name":"web","status":"running","uptime":90061,"type":"lxc"}"#,
        )
        .unwrap();

        assert_eq!(container.vmid, 200);
        assert_eq!(container.name, "web");
        assert_eq!(container.maxswap, 0);
    }

    #[test]
    fn test_vm_template_flag() {
        let vm: VirtualMachineStatus =
            serde_json::from_str(r#"{"vmid":9000,"name":"tpl","status":"stopped","template":1}"#)
                .unwrap();
        assert!(vm.template);

        let vm: VirtualMachineStatus =
            serde_json::from_str(r#"{"vmid":100,"status":"running"}"#).unwrap();
        assert!(!vm.template);
        assert_eq!(vm.name, "");
    }

    #[test]
    fn test_task_node_from_upid() {
        let task = Task::accepted("UPID:pve:00001234:00112233:65432100:start");
        assert_eq!(task.node(), Some("pve"));

        assert_eq!(Task::accepted("not-a-upid").node(), None);
        assert_eq!(Task::accepted("UPID::1").node(), None);
    }

    #[test]
    fn test_task_finished_states() {
        let ok = Task::accepted("UPID:pve:1").finished("OK");
        assert!(ok.completed);
        assert!(ok.is_successful);
        assert!(ok.clone().ensure_successful().is_ok());

        let failed = Task::accepted("UPID:pve:1").finished("unable to start");
        assert!(failed.completed);
        assert!(!failed.is_successful);
        let err = failed.ensure_successful().unwrap_err();
        assert!(matches!(err, crate::ApiError::TaskFailed { ref exit_status, .. } if exit_status == "unable to start"));
    }

    #[test]
    fn test_accepted_task_is_not_a_failure() {
        let task = Task::accepted("UPID:pve:1");
        assert!(task.ensure_successful().is_ok());
    }

    #[test]
    fn test_resource_option_parsing() {
        let option: ResourceOption = "memory=2048".parse().unwrap();
        assert_eq!(option, ResourceOption::new("memory", "2048"));

        let option: ResourceOption = "net0=name=eth0,bridge=vmbr0".parse().unwrap();
        assert_eq!(option.name, "net0");
        assert_eq!(option.value, "name=eth0,bridge=vmbr0");

        assert!("memory".parse::<ResourceOption>().is_err());
        assert!("=1".parse::<ResourceOption>().is_err());
        assert!("vmid=100".parse::<ResourceOption>().is_err());
    }
}
