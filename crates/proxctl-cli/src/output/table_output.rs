//! Table formatting for CLI output

use crate::error::Result;
use chrono::{DateTime, Local};
use proxctl_sdk::{ContainerStatus, NodeStatus, Snapshot, VirtualMachineStatus};
use std::io::Write;
use tabled::{settings::Style, Table, Tabled};

/// One line of a `describe` view
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct Field {
    #[tabled(rename = "Field")]
    pub name: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl Field {
    fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// Format a Unix timestamp to YY-MM-DD HH:MM:SS in local time
fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| timestamp.to_string())
}

/// Human readable byte count using binary units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Uptime as `1d 2h 3m`; zero renders as `-`
pub fn format_uptime(seconds: u64) -> String {
    if seconds == 0 {
        return "-".to_string();
    }
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m {}s", seconds % 60)
    }
}

/// CPU fraction as a percentage
pub fn format_cpu(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

fn usage(used: u64, max: u64) -> String {
    if max == 0 {
        return "-".to_string();
    }
    format!("{} / {}", format_bytes(used), format_bytes(max))
}

fn write_table<T: Tabled>(out: &mut dyn Write, rows: Vec<T>) -> Result<()> {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    writeln!(out, "{table}")?;
    Ok(())
}

/// Display nodes in table format, in the order given
pub fn display_nodes(out: &mut dyn Write, nodes: &[NodeStatus]) -> Result<()> {
    #[derive(Tabled)]
    struct NodeRow {
        #[tabled(rename = "Node")]
        node: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "CPU")]
        cpu: String,
        #[tabled(rename = "Memory")]
        memory: String,
        #[tabled(rename = "Uptime")]
        uptime: String,
    }

    let rows: Vec<NodeRow> = nodes
        .iter()
        .map(|node| NodeRow {
            node: node.node.clone(),
            status: node.status.clone(),
            cpu: if node.is_online() {
                format_cpu(node.cpu)
            } else {
                "-".to_string()
            },
            memory: usage(node.mem, node.maxmem),
            uptime: format_uptime(node.uptime),
        })
        .collect();

    write_table(out, rows)
}

/// Display virtual machines with the node each one lives on
pub fn display_virtual_machines(
    out: &mut dyn Write,
    vms: &[(String, VirtualMachineStatus)],
) -> Result<()> {
    #[derive(Tabled)]
    struct VmRow {
        #[tabled(rename = "VMID")]
        vmid: u32,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Node")]
        node: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Memory")]
        memory: String,
        #[tabled(rename = "Uptime")]
        uptime: String,
    }

    let rows: Vec<VmRow> = vms
        .iter()
        .map(|(node, vm)| VmRow {
            vmid: vm.vmid,
            name: if vm.template {
                format!("{} (template)", vm.name)
            } else {
                vm.name.clone()
            },
            node: node.clone(),
            status: vm.status.clone(),
            memory: usage(vm.mem, vm.maxmem),
            uptime: format_uptime(vm.uptime),
        })
        .collect();

    write_table(out, rows)
}

/// Display containers with the node each one lives on
pub fn display_containers(
    out: &mut dyn Write,
    containers: &[(String, ContainerStatus)],
) -> Result<()> {
    #[derive(Tabled)]
    struct ContainerRow {
        #[tabled(rename = "VMID")]
        vmid: u32,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Node")]
        node: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Memory")]
        memory: String,
        #[tabled(rename = "Uptime")]
        uptime: String,
    }

    let rows: Vec<ContainerRow> = containers
        .iter()
        .map(|(node, ct)| ContainerRow {
            vmid: ct.vmid,
            name: ct.name.clone(),
            node: node.clone(),
            status: ct.status.clone(),
            memory: usage(ct.mem, ct.maxmem),
            uptime: format_uptime(ct.uptime),
        })
        .collect();

    write_table(out, rows)
}

/// Display container snapshots
pub fn display_snapshots(out: &mut dyn Write, snapshots: &[Snapshot]) -> Result<()> {
    #[derive(Tabled)]
    struct SnapshotRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Parent")]
        parent: String,
        #[tabled(rename = "Taken")]
        taken: String,
        #[tabled(rename = "Description")]
        description: String,
    }

    let rows: Vec<SnapshotRow> = snapshots
        .iter()
        .map(|snapshot| SnapshotRow {
            name: snapshot.name.clone(),
            parent: snapshot.parent.clone().unwrap_or_else(|| "-".to_string()),
            taken: snapshot
                .snaptime
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string()),
            description: snapshot.description.trim().to_string(),
        })
        .collect();

    write_table(out, rows)
}

/// Display a `describe` view
pub fn display_fields(out: &mut dyn Write, fields: Vec<Field>) -> Result<()> {
    write_table(out, fields)
}

pub fn describe_node(node: &NodeStatus, vm_count: usize, container_count: usize) -> Vec<Field> {
    vec![
        Field::new("Node", node.node.clone()),
        Field::new("Status", node.status.clone()),
        Field::new("CPU", format!("{} of {} cores", format_cpu(node.cpu), node.maxcpu)),
        Field::new("Memory", usage(node.mem, node.maxmem)),
        Field::new("Root disk", usage(node.disk, node.maxdisk)),
        Field::new("Uptime", format_uptime(node.uptime)),
        Field::new("Virtual machines", vm_count.to_string()),
        Field::new("Containers", container_count.to_string()),
    ]
}

pub fn describe_virtual_machine(node: &str, vm: &VirtualMachineStatus) -> Vec<Field> {
    vec![
        Field::new("VMID", vm.vmid.to_string()),
        Field::new("Name", vm.name.clone()),
        Field::new("Node", node),
        Field::new("Status", vm.status.clone()),
        Field::new("Template", if vm.template { "yes" } else { "no" }),
        Field::new("CPUs", format!("{}", vm.cpus)),
        Field::new("CPU usage", format_cpu(vm.cpu)),
        Field::new("Memory", usage(vm.mem, vm.maxmem)),
        Field::new("Disk size", format_bytes(vm.maxdisk)),
        Field::new("Uptime", format_uptime(vm.uptime)),
    ]
}

pub fn describe_container(node: &str, ct: &ContainerStatus) -> Vec<Field> {
    vec![
        Field::new("VMID", ct.vmid.to_string()),
        Field::new("Hostname", ct.name.clone()),
        Field::new("Node", node),
        Field::new("Status", ct.status.clone()),
        Field::new("CPUs", format!("{}", ct.cpus)),
        Field::new("CPU usage", format_cpu(ct.cpu)),
        Field::new("Memory", usage(ct.mem, ct.maxmem)),
        Field::new("Swap", format_bytes(ct.maxswap)),
        Field::new("Disk size", format_bytes(ct.maxdisk)),
        Field::new("Uptime", format_uptime(ct.uptime)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(8 * 1024 * 1024 * 1024), "8.0 GiB");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "-");
        assert_eq!(format_uptime(59), "0m 59s");
        assert_eq!(format_uptime(3_660), "1h 1m");
        assert_eq!(format_uptime(90_061), "1d 1h 1m");
    }

    #[test]
    fn test_node_table_keeps_order() {
        let nodes = vec![
            NodeStatus {
                node: "pve2".into(),
                status: "online".into(),
                ..Default::default()
            },
            NodeStatus {
                node: "pve1".into(),
                status: "offline".into(),
                ..Default::default()
            },
        ];
        let mut out = Vec::new();
        display_nodes(&mut out, &nodes).unwrap();

        let text = String::from_utf8(out).unwrap();
        let first = text.find("pve2").unwrap();
        let second = text.find("pve1").unwrap();
        assert!(first < second);
        assert!(text.contains("offline"));
    }

    #[test]
    fn test_describe_container_projection() {
        let ct = ContainerStatus {
            vmid: 200,
            name: "web".into(),
            status: "running".into(),
            maxmem: 512 * 1024 * 1024,
            ..Default::default()
        };
        let fields = describe_container("pve", &ct);

        assert_eq!(fields[0], Field::new("VMID", "200"));
        assert_eq!(fields[1], Field::new("Hostname", "web"));
        assert!(fields.iter().any(|f| f.name == "Node" && f.value == "pve"));
    }
}
