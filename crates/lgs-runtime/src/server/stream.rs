//! Console capture for a job's stdout/stderr.
//!
//! Game servers are free to print non-UTF-8 bytes. `BufReader::lines()` would
//! end the reader on the first invalid sequence, so lines are read as bytes
//! and decoded lossily.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lgs_core::{Console, ConsoleLine, EventBus, JobEvent, JobKey};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

/// Where captured lines go.
#[derive(Debug, Clone)]
pub(crate) struct ConsoleSink {
    pub(crate) job: JobKey,
    pub(crate) console: Console,
    pub(crate) bus: EventBus,
    /// Process generation this sink was built for.
    pub(crate) generation: u64,
    /// The job's live generation counter.
    pub(crate) current: Arc<AtomicU64>,
}

impl ConsoleSink {
    /// Append one line to the console, then publish it. Lines arriving
    /// after a newer process was started are dropped.
    pub(crate) fn record(&self, text: String, is_error: bool) {
        if self.current.load(Ordering::SeqCst) != self.generation {
            debug!(job = %self.job, generation = self.generation, "Dropping line from a stale process");
            return;
        }
        let line = ConsoleLine::new(text, is_error);
        self.console.push(line.clone());
        self.bus.publish(&JobEvent::ConsoleLine(line));
    }
}

/// Spawn a task that forwards every line of `stream` into `sink` until EOF.
///
/// A final line without a trailing newline is still recorded.
pub(crate) fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    is_error: bool,
    sink: ConsoleSink,
) -> JoinHandle<()> {
    let stream_type = if is_error { "stderr" } else { "stdout" };
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    debug!(job = %sink.job, %stream_type, "{line}");
                    sink.record(line, is_error);
                }
                Err(e) => {
                    debug!(job = %sink.job, %stream_type, error = %e, "Console reader exiting on read error");
                    break;
                }
            }
        }

        debug!(job = %sink.job, %stream_type, "Console reader finished");
    })
}
