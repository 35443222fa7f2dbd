//! Filesystem access for jobs.
//!
//! - [`fs`] is a thin wrapper over `std::fs` (existence, atomic writes, symlinks)
//! - [`StorageLayout`] is the resource registry: per-job directories under
//!   `servers/` and shared bins under `storage/` linked into them
//!
//! Job code touches the filesystem only through these; shared assets are
//! linked, never copied.

pub mod fs;
mod layout;

pub use fs::{DirEntryInfo, EntryKind};
pub use layout::{SERVERS_DIR_NAME, STORAGE_DIR_NAME, StorageLayout};
