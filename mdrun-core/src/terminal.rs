//! Terminal collaborator traits.
//!
//! The pipeline never creates a terminal widget itself. The host hands it a
//! `TerminalHost` that can find the focused terminal or open a new one, and
//! every terminal comes back as a boxed `TerminalSink`.

use anyhow::Result;

/// A terminal text can be sent to.
pub trait TerminalSink: Send {
    fn name(&self) -> &str;

    /// Bring the terminal to the front.
    fn show(&mut self);

    /// Send `text`. With `execute` set, a trailing Enter follows it.
    fn send_text(&mut self, text: &str, execute: bool) -> Result<()>;

    /// True once the underlying process is gone.
    fn has_exited(&mut self) -> bool;

    fn dispose(&mut self);
}

/// Where terminals come from.
pub trait TerminalHost: Send {
    /// The terminal currently focused in the host, if any.
    fn active_terminal(&mut self) -> Option<Box<dyn TerminalSink>>;

    fn create_terminal(&mut self, name: &str) -> Result<Box<dyn TerminalSink>>;
}
