//! Waiting for asynchronous cluster tasks

use crate::client::ProxmoxClient;
use crate::error::{ApiError, Result};
use crate::types::{Task, WaitOptions};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Poll a task until it stops, the timeout elapses or `cancel` fires
///
/// Returns the finished task whether it succeeded or not; call
/// [`Task::ensure_successful`] to turn a failure into an error.
pub async fn wait_for_task(
    client: &ProxmoxClient,
    task: &Task,
    options: WaitOptions,
    cancel: &CancellationToken,
) -> Result<Task> {
    if task.completed {
        return Ok(task.clone());
    }

    let node = task.node().ok_or_else(|| ApiError::InvalidRequest {
        message: format!("cannot determine node from task id '{}'", task.upid),
    })?;

    let deadline = tokio::time::sleep(options.timeout);
    tokio::pin!(deadline);

    let timed_out = || ApiError::Timeout {
        upid: task.upid.clone(),
        seconds: options.timeout.as_secs(),
    };
    let cancelled = || ApiError::Cancelled {
        upid: task.upid.clone(),
    };

    loop {
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = &mut deadline => return Err(timed_out()),
            status = client.task_status(node, &task.upid) => status?,
        };

        if !status.is_running() {
            let exit_status = status.exitstatus.unwrap_or_else(|| "unknown".to_string());
            debug!("Task {} finished: {}", task.upid, exit_status);
            return Ok(task.clone().finished(exit_status));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = &mut deadline => return Err(timed_out()),
            _ = tokio::time::sleep(options.poll_interval) => {}
        }
    }
}
