//! Output streams handed to command handlers.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Cloneable handle over a shared writable stream.
#[derive(Clone)]
pub struct OutputStream {
    sink: Arc<Mutex<dyn Write + Send>>,
}

impl OutputStream {
    /// Wrap an arbitrary writer.
    #[must_use]
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(writer)),
        }
    }

    /// Process standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Process standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// In-memory stream paired with a handle for reading back what was written.
    #[must_use]
    pub fn buffer() -> (Self, CapturedOutput) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            sink: Arc::clone(&buffer) as Arc<Mutex<dyn Write + Send>>,
        };
        (stream, CapturedOutput { buffer })
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink
            .lock()
            .map_err(|_| io::Error::other("output stream lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink
            .lock()
            .map_err(|_| io::Error::other("output stream lock poisoned"))?
            .flush()
    }
}

/// Read side of [`OutputStream::buffer`].
#[derive(Clone)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    /// Everything written so far, decoded lossily as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        let bytes = self.buffer.lock().map_or_else(
            |poisoned| poisoned.into_inner().clone(),
            |guard| guard.clone(),
        );
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
