//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically. All helpers
//! write to an explicit stream so commands never touch the process stdout.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use colored::Colorize;

/// Cloneable writer serializing every write through a mutex.
///
/// Helper threads spawned by a command (progress reporting, polling) write
/// through clones of the same `SyncWriter` as the main path.
#[derive(Clone)]
pub struct SyncWriter {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl SyncWriter {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }
}

impl Write for SyncWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

/// Write one complete line in a single locked write.
fn line(out: &mut dyn Write, text: String) -> io::Result<()> {
    out.write_all(format!("{text}\n").as_bytes())
}

/// Success status (green "SUCCESS:" prefix)
pub fn success(out: &mut dyn Write, msg: &(impl Display + ?Sized)) -> io::Result<()> {
    line(out, format!("{} {}", "SUCCESS:".green().bold(), msg))
}

/// Warning (yellow "WARNING:" prefix)
pub fn warning(out: &mut dyn Write, msg: &(impl Display + ?Sized)) -> io::Result<()> {
    line(out, format!("{} {}", "WARNING:".yellow().bold(), msg))
}

/// Informational line (no color)
pub fn info(out: &mut dyn Write, msg: &(impl Display + ?Sized)) -> io::Result<()> {
    line(out, msg.to_string())
}

/// Dimmed key/value line used for verbose provenance reports
pub fn detail(out: &mut dyn Write, label: &str, msg: &(impl Display + ?Sized)) -> io::Result<()> {
    line(out, format!("{}: {}", label.dimmed(), msg))
}

/// Empty line
pub fn blank(out: &mut dyn Write) -> io::Result<()> {
    out.write_all(b"\n")
}

/// Prompt without newline (cyan)
pub fn prompt(out: &mut dyn Write, msg: &(impl Display + ?Sized)) -> io::Result<()> {
    out.write_all(format!("{} ", msg.to_string().cyan()).as_bytes())?;
    out.flush()
}

/// Error block header (red bold "ERROR:" prefix)
pub fn error(out: &mut dyn Write, msg: &(impl Display + ?Sized)) -> io::Result<()> {
    line(out, format!("{} {}", "ERROR:".red().bold(), msg))
}
