//! Console - the process's output and diagnostic surfaces.

use crate::classify::classify;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

type Sink = Mutex<Box<dyn Write + Send>>;

/// Standard output for results, standard error for diagnostics.
///
/// Writes never fail from the caller's point of view: the console is the
/// last thing that runs before the process exits, so I/O errors on these
/// streams are dropped.
pub struct Console {
    out: Sink,
    err: Sink,
}

impl Console {
    /// A console over the process's stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }

    /// A console over arbitrary writers.
    pub fn new(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            err: Mutex::new(Box::new(err)),
        }
    }

    /// A console writing into in-memory buffers, and a handle to read them.
    pub fn buffered() -> (Self, Capture) {
        let capture = Capture::default();
        let console = Self::new(capture.out.clone(), capture.err.clone());
        (console, capture)
    }

    /// Write one line to the output stream.
    pub fn line(&self, text: &str) {
        let mut out = lock(&self.out);
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }

    /// Write one diagnostic line to the error stream.
    pub fn diagnostic(&self, text: &str) {
        let mut err = lock(&self.err);
        let _ = writeln!(err, "{text}");
        let _ = err.flush();
    }

    /// Describe a failure on the error stream.
    ///
    /// Client problems (status below 500) print their message and detail
    /// only; everything else prints the error's debug representation.
    pub fn report(&self, err: &anyhow::Error) {
        match classify(err) {
            Some(problem) if problem.is_client_error() => {
                self.diagnostic(&problem.message);
                if let Some(detail) = &problem.detail {
                    self.diagnostic(&format!("{detail:#}"));
                }
            }
            _ => self.diagnostic(&format!("{err:?}")),
        }
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

fn lock(sink: &Sink) -> MutexGuard<'_, Box<dyn Write + Send>> {
    sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared in-memory writer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|p| p.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Read side of [`Console::buffered`].
#[derive(Debug, Clone, Default)]
pub struct Capture {
    out: SharedBuffer,
    err: SharedBuffer,
}

impl Capture {
    /// Text written to the output stream.
    pub fn stdout(&self) -> String {
        self.out.contents()
    }

    /// Text written to the error stream.
    pub fn stderr(&self) -> String {
        self.err.contents()
    }
}
