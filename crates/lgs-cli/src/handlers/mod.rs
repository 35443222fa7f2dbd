//! Command handlers.
//!
//! Each handler is a thin `execute(ctx, ...)` wrapper: parse CLI input, call
//! the manager, print the result.

pub mod create;
pub mod list;
pub mod serve;
pub mod setup;
pub mod types;
