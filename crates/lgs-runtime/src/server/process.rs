//! Child-process plumbing: spawning, stdin, interrupt and forced kill.
//!
//! The exit waiter owns the `Child`. Everyone else reaches the process
//! through a [`ProcessHandle`]: stdin behind an async mutex, a `Notify` that
//! asks the waiter to kill, and a `watch` flag that flips once the exit has
//! been reaped and recorded on the job.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use lgs_core::{CoreError, JobKey, Listener, TemplateError};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Mutex, Notify, watch};
use tracing::{debug, warn};

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Shared view of one running process.
#[derive(Debug, Clone)]
pub(crate) struct ProcessHandle {
    /// Distinguishes this run from earlier runs of the same job.
    pub(crate) generation: u64,
    pub(crate) pid: Option<u32>,
    pub(crate) stdin: Arc<Mutex<Option<ChildStdin>>>,
    pub(crate) kill: Arc<Notify>,
    pub(crate) exited: watch::Receiver<bool>,
    /// Readiness listener for this run, dropped when the process exits.
    pub(crate) readiness: Option<Arc<Listener>>,
}

/// A freshly spawned process before its tasks are launched.
pub(crate) struct Spawned {
    pub(crate) child: Child,
    pub(crate) handle: ProcessHandle,
    pub(crate) exit_tx: watch::Sender<bool>,
}

/// Spawn `argv` in `cwd` with all three standard streams piped.
pub(crate) fn spawn(argv: &[String], cwd: &Path, generation: u64) -> Result<Spawned, CoreError> {
    let (program, args) = argv.split_first().ok_or(TemplateError::EmptyCommand)?;

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| CoreError::io(program, e))?;

    let (exit_tx, exited) = watch::channel(false);
    let handle = ProcessHandle {
        generation,
        pid: child.id(),
        stdin: Arc::new(Mutex::new(child.stdin.take())),
        kill: Arc::new(Notify::new()),
        exited,
        readiness: None,
    };
    Ok(Spawned {
        child,
        handle,
        exit_tx,
    })
}

/// Wait for the child to exit, killing it whenever `kill` is notified.
pub(crate) async fn wait_or_kill(child: &mut Child, kill: &Notify) -> io::Result<ExitStatus> {
    loop {
        tokio::select! {
            result = child.wait() => return result,
            () = kill.notified() => {
                if let Err(e) = child.start_kill() {
                    debug!(error = %e, "Kill request failed, process may already be gone");
                }
            }
        }
    }
}

/// Write one line to the process's stdin.
pub(crate) async fn write_line(stdin: &Mutex<Option<ChildStdin>>, text: &str) -> io::Result<()> {
    let mut guard = stdin.lock().await;
    let pipe = guard
        .as_mut()
        .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin is closed"))?;
    let mut line = String::with_capacity(text.len() + 1);
    line.push_str(text);
    line.push('\n');
    pipe.write_all(line.as_bytes()).await?;
    pipe.flush().await
}

/// Deliver an interrupt. Falls back to a forced kill where no signal exists.
pub(crate) fn interrupt(handle: &ProcessHandle) {
    #[cfg(unix)]
    {
        if let Some(pid) = handle.pid.and_then(|p| i32::try_from(p).ok()) {
            match signal::kill(Pid::from_raw(pid), Signal::SIGINT) {
                Ok(()) | Err(nix::errno::Errno::ESRCH) => return,
                Err(e) => warn!(pid, error = %e, "SIGINT failed, killing instead"),
            }
        }
    }
    handle.kill.notify_one();
}

/// Kill the process if it is still alive after `timeout`.
pub(crate) fn spawn_kill_timer(handle: &ProcessHandle, timeout: Duration, job: JobKey) {
    let mut exited = handle.exited.clone();
    let kill = Arc::clone(&handle.kill);
    tokio::spawn(async move {
        let waited = tokio::time::timeout(timeout, exited.wait_for(|done| *done)).await;
        if waited.is_err() {
            warn!(job = %job, timeout_secs = timeout.as_secs(), "Process did not stop in time, killing");
            kill.notify_one();
        }
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = spawn(&[], dir.path(), 1).err().unwrap();
        assert!(matches!(
            err,
            CoreError::CommandTemplate(TemplateError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn missing_program_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = spawn(&argv(&["./definitely-not-here"]), dir.path(), 1)
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::Io { .. }));
    }

    #[tokio::test]
    async fn kill_notify_terminates_process() {
        let dir = tempfile::tempdir().unwrap();
        let mut spawned = spawn(&argv(&["sleep", "30"]), dir.path(), 1).unwrap();
        spawned.handle.kill.notify_one();

        let status = tokio::time::timeout(
            Duration::from_secs(5),
            wait_or_kill(&mut spawned.child, &spawned.handle.kill),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn interrupt_stops_sleep() {
        let dir = tempfile::tempdir().unwrap();
        let mut spawned = spawn(&argv(&["sleep", "30"]), dir.path(), 1).unwrap();
        interrupt(&spawned.handle);

        let status = tokio::time::timeout(
            Duration::from_secs(5),
            wait_or_kill(&mut spawned.child, &spawned.handle.kill),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn write_line_reaches_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let mut spawned = spawn(&argv(&["head", "-n", "1"]), dir.path(), 1).unwrap();
        write_line(&spawned.handle.stdin, "hello").await.unwrap();

        let status = tokio::time::timeout(
            Duration::from_secs(5),
            wait_or_kill(&mut spawned.child, &spawned.handle.kill),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(status.success());
    }
}
