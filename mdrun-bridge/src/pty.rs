use anyhow::{Context, Result};
use mdrun_core::terminal::{TerminalHost, TerminalSink};
use portable_pty::{Child, ChildKiller, CommandBuilder, NativePtySystem, PtyPair, PtySize, PtySystem};
use std::io::{Read, Write};

pub const DEFAULT_COLS: u16 = 120;
pub const DEFAULT_ROWS: u16 = 32;

/// A shell running in a PTY. Output is mirrored to our stdout.
pub struct PtyTerminal {
    name: String,
    // Held so the master side stays open while the shell runs.
    _pair: PtyPair,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send>,
    shown: bool,
}

impl std::fmt::Debug for PtyTerminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyTerminal")
            .field("name", &self.name)
            .field("pair", &"PtyPair")
            .field("writer", &"Box<dyn Write + Send>")
            .field("child", &"Box<dyn Child + Send>")
            .finish()
    }
}

impl PtyTerminal {
    pub fn spawn(name: &str, cols: u16, rows: u16) -> Result<Self> {
        let pty_system = NativePtySystem::default();
        let size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = pty_system.openpty(size).context("Failed to open PTY")?;

        let child = pair
            .slave
            .spawn_command(default_shell_command())
            .context("Failed to spawn shell process")?;

        let writer = pair
            .master
            .take_writer()
            .context("Failed to take PTY writer")?;

        let reader = pair
            .master
            .try_clone_reader()
            .context("Failed to clone PTY reader")?;
        mirror_output(reader);

        tracing::info!(name, "terminal created");
        Ok(Self {
            name: name.to_string(),
            _pair: pair,
            writer,
            child,
            shown: false,
        })
    }

    /// Raw write (no newline).
    fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data).context("Failed to write to PTY")?;
        self.writer.flush().context("Failed to flush PTY writer")
    }

    /// Write a line and press Enter.
    /// Windows ConPTY wants CRLF or you get "typed but not executed" behavior.
    fn write_line(&mut self, line: &str) -> Result<()> {
        let s = line.trim_end_matches(&['\r', '\n'][..]);
        self.write_raw(s.as_bytes())?;

        #[cfg(windows)]
        {
            self.write_raw(b"\r\n")?;
        }

        #[cfg(not(windows))]
        {
            self.write_raw(b"\n")?;
        }

        Ok(())
    }
}

impl TerminalSink for PtyTerminal {
    fn name(&self) -> &str {
        &self.name
    }

    fn show(&mut self) {
        if !self.shown {
            eprintln!("── {} ──", self.name);
            self.shown = true;
        }
    }

    fn send_text(&mut self, text: &str, execute: bool) -> Result<()> {
        if execute {
            self.write_line(text)
        } else {
            self.write_raw(text.as_bytes())
        }
    }

    fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => false,
            Ok(Some(_)) => true,
            Err(_) => false,
        }
    }

    fn dispose(&mut self) {
        if self.has_exited() {
            return;
        }
        if let Err(e) = self.child.kill() {
            tracing::warn!("Failed to stop terminal {}: {}", self.name, e);
        }
    }
}

/// Copy everything the shell prints to our stdout until the PTY closes.
fn mirror_output(mut reader: Box<dyn Read + Send>) {
    std::thread::spawn(move || {
        let mut buf = [0u8; 4096];
        let mut stdout = std::io::stdout();
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if stdout.write_all(&buf[..n]).and_then(|_| stdout.flush()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}

fn default_shell_command() -> CommandBuilder {
    if cfg!(windows) {
        let mut cmd = CommandBuilder::new("powershell.exe");
        cmd.arg("-NoLogo");
        cmd.arg("-NoExit");
        cmd
    } else {
        let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string());
        CommandBuilder::new(shell)
    }
}

/// Creates PTY terminals on demand.
///
/// A console has no notion of a focused terminal, so `active_terminal`
/// never offers one and the dispatcher always creates its own.
#[derive(Debug, Clone, Copy)]
pub struct PtyTerminalHost {
    pub cols: u16,
    pub rows: u16,
}

impl Default for PtyTerminalHost {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }
}

impl TerminalHost for PtyTerminalHost {
    fn active_terminal(&mut self) -> Option<Box<dyn TerminalSink>> {
        None
    }

    fn create_terminal(&mut self, name: &str) -> Result<Box<dyn TerminalSink>> {
        Ok(Box::new(PtyTerminal::spawn(name, self.cols, self.rows)?))
    }
}
