//! Job domain types.

mod console;
mod job;

pub use console::{Console, ConsoleLine};
pub use job::{
    DEFAULT_STOP_TIMEOUT, INTERRUPT_SENTINEL, JobKey, JobSettings, JobStatus, StopCommand,
};
