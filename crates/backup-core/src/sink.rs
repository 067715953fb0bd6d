//! Output sink for the generated script.
//!
//! A file sink buffers appended text in memory and writes it out on
//! [`OutputSink::flush`]; the snapshot engine flushes at every insert
//! batch so the buffer never holds more than one batch. A passthrough
//! sink writes every append straight to its writer (preview mode).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

enum Mode {
    Buffered { path: Option<PathBuf> },
    Passthrough,
}

pub struct OutputSink {
    writer: Box<dyn Write + Send>,
    mode: Mode,
    buffer: String,
    written: u64,
}

impl OutputSink {
    /// Create (or truncate) the file at `path` and buffer appends for it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| {
            io::Error::new(e.kind(), format!("Failed to open {}: {e}", path.display()))
        })?;
        debug!("Opened output file {}", path.display());
        Ok(Self {
            writer: Box::new(BufWriter::new(file)),
            mode: Mode::Buffered { path: Some(path) },
            buffer: String::new(),
            written: 0,
        })
    }

    /// Buffer appends and hand them to `writer` on flush.
    pub fn buffered(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
            mode: Mode::Buffered { path: None },
            buffer: String::new(),
            written: 0,
        }
    }

    /// Write every append directly to `writer`.
    pub fn passthrough(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
            mode: Mode::Passthrough,
            buffer: String::new(),
            written: 0,
        }
    }

    pub fn stdout() -> Self {
        Self::passthrough(io::stdout())
    }

    pub fn append(&mut self, text: &str) -> Result<()> {
        match self.mode {
            Mode::Buffered { .. } => self.buffer.push_str(text),
            Mode::Passthrough => {
                self.writer.write_all(text.as_bytes())?;
                self.written += text.len() as u64;
            }
        }
        Ok(())
    }

    /// Write the buffered text to the destination and clear the buffer.
    pub fn flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(self.buffer.as_bytes())?;
            self.written += self.buffer.len() as u64;
            self.buffer.clear();
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and release the destination. Returns the file path, if any.
    pub fn close(mut self) -> Result<Option<PathBuf>> {
        self.flush()?;
        debug!("Closed output sink after {} bytes", self.written);
        match self.mode {
            Mode::Buffered { path } => Ok(path),
            Mode::Passthrough => Ok(None),
        }
    }

    /// Bytes of text waiting for the next flush.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes handed to the destination so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.mode {
            Mode::Buffered { path } => path.as_deref(),
            Mode::Passthrough => None,
        }
    }
}
