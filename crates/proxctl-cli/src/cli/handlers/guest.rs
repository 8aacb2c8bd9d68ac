//! Handlers shared by `vm` and `lxc`
//!
//! Both guest kinds support the same lifecycle commands. The kind decides
//! which facade is resolved and how results are labelled.

use crate::cli::commands::{GuestAction, GuestTarget, WaitArgs};
use crate::context::CliContext;
use crate::error::Result;
use crate::output::{
    json_output, print_info, print_success, print_warning,
    table_output::{
        describe_container, describe_virtual_machine, display_containers, display_fields,
        display_virtual_machines,
    },
};
use proxctl_sdk::{
    Backend, CloneOptions, ClusterApi, ContainerApi, GuestKind, NodeApi, ResourceOption,
    ShutdownOptions, Task, VirtualMachineApi,
};
use serde::Serialize;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A resolved guest of either kind
pub enum GuestHandle {
    VirtualMachine(Box<dyn VirtualMachineApi>),
    Container(Box<dyn ContainerApi>),
}

impl GuestHandle {
    /// Resolve `target` through the node facade
    pub async fn resolve(backend: &Backend, kind: GuestKind, target: &GuestTarget) -> Result<Self> {
        let node = backend.node(&target.node).await?;
        Ok(match kind {
            GuestKind::VirtualMachine => {
                GuestHandle::VirtualMachine(node.virtual_machine(target.vmid).await?)
            }
            GuestKind::Container => GuestHandle::Container(node.container(target.vmid).await?),
        })
    }

    async fn start(&self) -> proxctl_sdk::Result<Task> {
        match self {
            GuestHandle::VirtualMachine(vm) => vm.start().await,
            GuestHandle::Container(ct) => ct.start().await,
        }
    }

    async fn stop(&self) -> proxctl_sdk::Result<Task> {
        match self {
            GuestHandle::VirtualMachine(vm) => vm.stop().await,
            GuestHandle::Container(ct) => ct.stop().await,
        }
    }

    async fn shutdown(&self, options: ShutdownOptions) -> proxctl_sdk::Result<Task> {
        match self {
            GuestHandle::VirtualMachine(vm) => vm.shutdown(options).await,
            GuestHandle::Container(ct) => ct.shutdown(options).await,
        }
    }

    async fn reboot(&self) -> proxctl_sdk::Result<Task> {
        match self {
            GuestHandle::VirtualMachine(vm) => vm.reboot().await,
            GuestHandle::Container(ct) => ct.reboot().await,
        }
    }

    async fn delete(&self) -> proxctl_sdk::Result<Task> {
        match self {
            GuestHandle::VirtualMachine(vm) => vm.delete().await,
            GuestHandle::Container(ct) => ct.delete().await,
        }
    }

    async fn create_clone(&self, options: CloneOptions) -> proxctl_sdk::Result<(u32, Task)> {
        match self {
            GuestHandle::VirtualMachine(vm) => vm.create_clone(options).await,
            GuestHandle::Container(ct) => ct.create_clone(options).await,
        }
    }
}

/// Verb forms used in task messages
#[derive(Debug, Clone, Copy)]
struct Operation {
    name: &'static str,
    done: &'static str,
}

const CREATE: Operation = Operation {
    name: "create",
    done: "created",
};
const START: Operation = Operation {
    name: "start",
    done: "started",
};
const STOP: Operation = Operation {
    name: "stop",
    done: "stopped",
};
const SHUTDOWN: Operation = Operation {
    name: "shutdown",
    done: "shut down",
};
const REBOOT: Operation = Operation {
    name: "reboot",
    done: "rebooted",
};
const DELETE: Operation = Operation {
    name: "delete",
    done: "deleted",
};
const CLONE: Operation = Operation {
    name: "clone",
    done: "cloned",
};

fn label(kind: GuestKind) -> &'static str {
    match kind {
        GuestKind::VirtualMachine => "VM",
        GuestKind::Container => "Container",
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Run one of the shared guest actions
pub async fn handle_guest_action(
    ctx: &CliContext,
    kind: GuestKind,
    action: GuestAction,
    out: &mut dyn Write,
) -> Result<()> {
    match action {
        GuestAction::Get { node } => handle_list(ctx, kind, node.as_deref(), out).await,
        GuestAction::Describe { guest } => handle_describe(ctx, kind, &guest, out).await,
        GuestAction::Create {
            guest,
            options,
            wait,
        } => handle_create(ctx, kind, &guest, options, &wait, out).await,
        GuestAction::Start { guest, wait } => {
            let backend = ctx.authenticated_backend()?;
            let task = GuestHandle::resolve(&backend, kind, &guest)
                .await?
                .start()
                .await?;
            report_task(ctx, &backend, kind, guest.vmid, START, task, &wait, out).await
        }
        GuestAction::Stop { guest, wait } => {
            let backend = ctx.authenticated_backend()?;
            let task = GuestHandle::resolve(&backend, kind, &guest)
                .await?
                .stop()
                .await?;
            report_task(ctx, &backend, kind, guest.vmid, STOP, task, &wait, out).await
        }
        GuestAction::Shutdown {
            guest,
            force,
            shutdown_timeout,
            wait,
        } => {
            let backend = ctx.authenticated_backend()?;
            let options = ShutdownOptions {
                force,
                timeout: shutdown_timeout,
            };
            let task = GuestHandle::resolve(&backend, kind, &guest)
                .await?
                .shutdown(options)
                .await?;
            report_task(ctx, &backend, kind, guest.vmid, SHUTDOWN, task, &wait, out).await
        }
        GuestAction::Reboot { guest, wait } => {
            let backend = ctx.authenticated_backend()?;
            let task = GuestHandle::resolve(&backend, kind, &guest)
                .await?
                .reboot()
                .await?;
            report_task(ctx, &backend, kind, guest.vmid, REBOOT, task, &wait, out).await
        }
        GuestAction::Delete { guest, wait } => {
            let backend = ctx.authenticated_backend()?;
            let task = GuestHandle::resolve(&backend, kind, &guest)
                .await?
                .delete()
                .await?;
            report_task(ctx, &backend, kind, guest.vmid, DELETE, task, &wait, out).await
        }
        GuestAction::Clone {
            guest,
            new_id,
            name,
            target,
            full,
            description,
            wait,
        } => {
            let options = CloneOptions {
                new_id,
                name,
                target,
                full,
                description,
            };
            handle_clone(ctx, kind, &guest, options, &wait, out).await
        }
    }
}

#[derive(Serialize)]
struct GuestRow<'a, T> {
    node: &'a str,
    #[serde(flatten)]
    guest: &'a T,
}

/// List guests on one node, or on every online node
///
/// A node that fails to answer is reported and skipped.
async fn handle_list(
    ctx: &CliContext,
    kind: GuestKind,
    node: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let backend = ctx.authenticated_backend()?;

    let handles: Vec<Box<dyn NodeApi>> = match node {
        Some(name) => vec![backend.node(name).await?],
        None => {
            let mut handles = Vec::new();
            for status in backend.nodes().await? {
                if !status.is_online() {
                    debug!("Skipping offline node {}", status.node);
                    continue;
                }
                match backend.node(&status.node).await {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        warn!("Skipping node {}: {}", status.node, e);
                        print_warning(out, &e.to_string())?;
                    }
                }
            }
            handles
        }
    };

    match kind {
        GuestKind::VirtualMachine => {
            let mut rows = Vec::new();
            for handle in &handles {
                match handle.virtual_machines().await {
                    Ok(vms) => rows.extend(vms.into_iter().map(|vm| (handle.name(), vm))),
                    Err(e) => {
                        warn!("Listing VMs on {} failed: {}", handle.name(), e);
                        print_warning(out, &e.to_string())?;
                    }
                }
            }
            rows.sort_by(|a, b| a.1.vmid.cmp(&b.1.vmid));

            if ctx.json {
                let json: Vec<_> = rows
                    .iter()
                    .map(|(node, guest)| GuestRow { node, guest })
                    .collect();
                return json_output(out, &json);
            }
            if rows.is_empty() {
                return print_info(out, "No virtual machines found");
            }
            display_virtual_machines(out, &rows)
        }
        GuestKind::Container => {
            let mut rows = Vec::new();
            for handle in &handles {
                match handle.containers().await {
                    Ok(cts) => rows.extend(cts.into_iter().map(|ct| (handle.name(), ct))),
                    Err(e) => {
                        warn!("Listing containers on {} failed: {}", handle.name(), e);
                        print_warning(out, &e.to_string())?;
                    }
                }
            }
            rows.sort_by(|a, b| a.1.vmid.cmp(&b.1.vmid));

            if ctx.json {
                let json: Vec<_> = rows
                    .iter()
                    .map(|(node, guest)| GuestRow { node, guest })
                    .collect();
                return json_output(out, &json);
            }
            if rows.is_empty() {
                return print_info(out, "No containers found");
            }
            display_containers(out, &rows)
        }
    }
}

async fn handle_describe(
    ctx: &CliContext,
    kind: GuestKind,
    target: &GuestTarget,
    out: &mut dyn Write,
) -> Result<()> {
    let backend = ctx.authenticated_backend()?;
    match GuestHandle::resolve(&backend, kind, target).await? {
        GuestHandle::VirtualMachine(vm) => {
            let status = vm.status().await?;
            if ctx.json {
                return json_output(
                    out,
                    &GuestRow {
                        node: &target.node,
                        guest: &status,
                    },
                );
            }
            display_fields(out, describe_virtual_machine(&target.node, &status))
        }
        GuestHandle::Container(ct) => {
            let status = ct.status().await?;
            if ctx.json {
                return json_output(
                    out,
                    &GuestRow {
                        node: &target.node,
                        guest: &status,
                    },
                );
            }
            display_fields(out, describe_container(&target.node, &status))
        }
    }
}

async fn handle_create(
    ctx: &CliContext,
    kind: GuestKind,
    target: &GuestTarget,
    options: Vec<ResourceOption>,
    wait: &WaitArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let backend = ctx.authenticated_backend()?;
    let node = backend.node(&target.node).await?;
    debug!(
        "Creating {} {} on {} with {} option(s)",
        kind.noun(),
        target.vmid,
        target.node,
        options.len()
    );

    let task = match kind {
        GuestKind::VirtualMachine => node.create_virtual_machine(target.vmid, options).await?,
        GuestKind::Container => node.create_container(target.vmid, options).await?,
    };
    report_task(ctx, &backend, kind, target.vmid, CREATE, task, wait, out).await
}

async fn handle_clone(
    ctx: &CliContext,
    kind: GuestKind,
    target: &GuestTarget,
    options: CloneOptions,
    wait: &WaitArgs,
    out: &mut dyn Write,
) -> Result<()> {
    #[derive(Serialize)]
    struct CloneResult<'a> {
        new_id: u32,
        task: &'a Task,
    }

    let backend = ctx.authenticated_backend()?;
    let (new_id, task) = GuestHandle::resolve(&backend, kind, target)
        .await?
        .create_clone(options)
        .await?;
    let task = finish_task(ctx, &backend, task, wait).await?;

    if ctx.json {
        return json_output(out, &CloneResult { new_id, task: &task });
    }

    print_info(out, &format!("Clone task: {}", task.upid))?;
    let subject = format!("{} {}", label(kind), target.vmid);
    if task.completed {
        print_success(out, &format!("{subject} cloned successfully to {new_id}"))
    } else {
        print_success(
            out,
            &format!("{subject} clone to {new_id} submitted successfully"),
        )
    }
}

/// Print the task id and, when asked, wait for the task to finish
#[allow(clippy::too_many_arguments)]
async fn report_task(
    ctx: &CliContext,
    backend: &Backend,
    kind: GuestKind,
    vmid: u32,
    operation: Operation,
    task: Task,
    wait: &WaitArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let task = finish_task(ctx, backend, task, wait).await?;

    if ctx.json {
        return json_output(out, &task);
    }

    print_info(
        out,
        &format!("{} task: {}", capitalize(operation.name), task.upid),
    )?;
    let subject = format!("{} {}", label(kind), vmid);
    if task.completed {
        print_success(out, &format!("{subject} {} successfully", operation.done))
    } else {
        print_success(
            out,
            &format!("{subject} {} submitted successfully", operation.name),
        )
    }
}

/// Wait for `task` when `--wait` or `--timeout` was given
///
/// Ctrl-C stops the wait; the task itself keeps running on the cluster.
async fn finish_task(
    ctx: &CliContext,
    backend: &Backend,
    task: Task,
    wait: &WaitArgs,
) -> Result<Task> {
    if !wait.enabled() {
        return Ok(task);
    }

    let options = ctx.config.wait_options(wait.timeout);
    let cancel = ctx.cancel.child_token();
    let interrupt = spawn_interrupt_listener(cancel.clone());

    let result = backend.wait_task(&task, options, &cancel).await;
    interrupt.abort();

    Ok(result?.ensure_successful()?)
}

fn spawn_interrupt_listener(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, no longer waiting for task");
            cancel.cancel();
        }
    })
}
