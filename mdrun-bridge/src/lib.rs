//! mdrun bridge library target.
//!
//! Host-side collaborators for the core pipeline plus the CLI glue. The
//! binary entry point is in `main.rs`; this target lets `tests/*.rs`
//! import the bridge's logic.

pub mod app;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod console;
pub mod pty;
pub mod util;
pub mod watcher;
