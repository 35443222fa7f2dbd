//! Process lifecycle: start, readiness, stop, commands and exit handling.
//!
//! Status transitions happen under the state mutex; events are published
//! after it is released so listeners may call back into the job.

use std::io;
use std::process::ExitStatus;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use lgs_core::{
    CoreError, EventKind, JobEvent, JobStatus, Listener, StopCommand, render_command, split_command_line,
};
use tokio::process::Child;
use tokio::sync::{Notify, watch};
use tracing::{debug, error, info, warn};

use super::GameServer;
use super::process::{self, ProcessHandle};
use super::stream::{ConsoleSink, spawn_stream_reader};

impl GameServer {
    /// Render the startup command and launch the process.
    ///
    /// The job goes to `STARTING` when it has a start indicator and straight
    /// to `RUNNING` otherwise. Fails with `InvalidState` unless `STOPPED`.
    pub fn start(self: &Arc<Self>) -> Result<(), CoreError> {
        let settings = self.settings();
        let replacements = self.replacements();

        let mut state = self.lock_state();
        if state.status != JobStatus::Stopped {
            return Err(CoreError::InvalidState(format!(
                "{} is {}",
                self.key,
                state.status.as_str()
            )));
        }

        let rendered = render_command(&settings.startup_command, &replacements)?;
        let argv = split_command_line(&rendered)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let process::Spawned {
            mut child,
            mut handle,
            exit_tx,
        } = process::spawn(&argv, &self.directory, generation)?;

        let indicator = settings.start_indicator.clone();
        let status = if indicator.is_some() {
            JobStatus::Starting
        } else {
            JobStatus::Running
        };
        self.console.clear();
        if let Some(indicator) = indicator.filter(|i| !i.is_empty()) {
            handle.readiness = Some(self.watch_for_readiness(indicator, generation));
        }
        state.status = status;
        state.process = Some(handle.clone());
        drop(state);

        info!(job = %self.key, pid = ?handle.pid, command = %rendered, "Server process started");
        self.bus.publish(&JobEvent::status(status));

        let sink = ConsoleSink {
            job: self.key.clone(),
            console: self.console.clone(),
            bus: self.bus.clone(),
            generation,
            current: Arc::clone(&self.generation),
        };
        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(stdout, false, sink.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, true, sink);
        }
        self.spawn_exit_waiter(child, Arc::clone(&handle.kill), exit_tx, generation);
        Ok(())
    }

    /// Move `STARTING` to `RUNNING`. Returns false in any other status.
    ///
    /// Job types whose start indicator is empty call this themselves.
    pub fn mark_running(&self) -> bool {
        self.mark_running_if(|_| true)
    }

    fn mark_running_if(&self, same_run: impl FnOnce(u64) -> bool) -> bool {
        {
            let mut state = self.lock_state();
            let generation = state.process.as_ref().map_or(0, |p| p.generation);
            if state.status != JobStatus::Starting || !same_run(generation) {
                return false;
            }
            state.status = JobStatus::Running;
        }
        info!(job = %self.key, "Server is ready");
        self.bus.publish(&JobEvent::status(JobStatus::Running));
        true
    }

    /// One-shot listener that flips the job to `RUNNING` on the first
    /// stdout line containing `indicator`.
    fn watch_for_readiness(self: &Arc<Self>, indicator: String, generation: u64) -> Arc<Listener> {
        let server: Weak<Self> = Arc::downgrade(self);
        self.bus.subscribe(
            move |event, listener| {
                let JobEvent::ConsoleLine(line) = event else {
                    return;
                };
                if line.is_error || !line.text.contains(&indicator) {
                    return;
                }
                listener.deregister();
                if let Some(server) = server.upgrade() {
                    server.mark_running_if(|current| current == generation);
                }
            },
            Some(EventKind::ConsoleLine),
        )
    }

    fn spawn_exit_waiter(
        self: &Arc<Self>,
        mut child: Child,
        kill: Arc<Notify>,
        exit_tx: watch::Sender<bool>,
        generation: u64,
    ) {
        let server = Arc::clone(self);
        tokio::spawn(async move {
            let result = process::wait_or_kill(&mut child, &kill).await;
            server.handle_exit(generation, result);
            exit_tx.send_replace(true);
        });
    }

    fn handle_exit(self: &Arc<Self>, generation: u64, result: io::Result<ExitStatus>) {
        let (crashed, readiness) = {
            let mut state = self.lock_state();
            if state.process.as_ref().map(|p| p.generation) != Some(generation) {
                debug!(job = %self.key, generation, "Ignoring exit of a stale process");
                return;
            }
            let crashed = state.status != JobStatus::Stopping;
            state.status = JobStatus::Stopped;
            let readiness = state.process.take().and_then(|p| p.readiness);
            (crashed, readiness)
        };
        if let Some(listener) = readiness {
            listener.deregister();
        }

        match (&result, crashed) {
            (Ok(status), true) => warn!(job = %self.key, code = ?status.code(), "Server process crashed"),
            (Ok(status), false) => info!(job = %self.key, code = ?status.code(), "Server process stopped"),
            (Err(e), _) => error!(job = %self.key, error = %e, "Failed to wait for server process"),
        }
        self.bus.publish(&JobEvent::status(JobStatus::Stopped));

        if crashed && self.settings().restart_on_crash {
            info!(job = %self.key, "Restarting after crash");
            if let Err(e) = self.start() {
                error!(job = %self.key, error = %e, "Restart after crash failed");
            }
        }
    }

    /// Ask the process to stop and force-kill it after `stop_timeout`.
    ///
    /// Does nothing if the job is already `STOPPED` or `STOPPING`. Returns
    /// once the job is `STOPPING` and the kill timer is armed, without
    /// waiting for the stop command to be written; use
    /// [`GameServer::wait_for_exit`] to wait for the process itself.
    pub async fn stop(&self) -> Result<(), CoreError> {
        let handle = {
            let mut state = self.lock_state();
            if matches!(state.status, JobStatus::Stopped | JobStatus::Stopping) {
                return Ok(());
            }
            let Some(handle) = state.process.clone() else {
                return Ok(());
            };
            state.status = JobStatus::Stopping;
            handle
        };
        let settings = self.settings();
        info!(job = %self.key, "Stopping server");
        self.bus.publish(&JobEvent::status(JobStatus::Stopping));

        let timeout = settings.stop_timeout();
        process::spawn_kill_timer(&handle, timeout, self.key.clone());
        match &settings.stop_command {
            StopCommand::Interrupt => process::interrupt(&handle),
            StopCommand::Console(command) => {
                // Sent in the background; the kill timer bounds a child
                // that never drains stdin.
                let stdin = Arc::clone(&handle.stdin);
                let command = command.clone();
                let job = self.key.clone();
                tokio::spawn(async move {
                    let sent =
                        tokio::time::timeout(timeout, process::write_line(&stdin, &command)).await;
                    match sent {
                        Ok(Ok(())) => debug!(%job, %command, "Sent stop command"),
                        Ok(Err(e)) => warn!(%job, error = %e, "Could not send stop command"),
                        Err(_) => warn!(%job, "Timed out sending stop command"),
                    }
                });
            }
        }
        Ok(())
    }

    /// Write one line to the process's stdin. Fails when `STOPPED`.
    pub async fn send_command(&self, command: &str) -> Result<(), CoreError> {
        let handle = self.current_process()?;
        process::write_line(&handle.stdin, command)
            .await
            .map_err(|e| CoreError::io(&self.directory, e))?;
        debug!(job = %self.key, %command, "Sent console command");
        Ok(())
    }

    /// Resolve once the current process has exited. Returns immediately
    /// when nothing is running.
    pub async fn wait_for_exit(&self) {
        let exited = self.lock_state().process.as_ref().map(|p| p.exited.clone());
        if let Some(mut exited) = exited {
            let _ = exited.wait_for(|done| *done).await;
        }
    }

    fn current_process(&self) -> Result<ProcessHandle, CoreError> {
        let state = self.lock_state();
        match (&state.status, &state.process) {
            (JobStatus::Stopped, _) | (_, None) => Err(CoreError::InvalidState(format!(
                "{} is not running",
                self.key
            ))),
            (_, Some(handle)) => Ok(handle.clone()),
        }
    }
}
