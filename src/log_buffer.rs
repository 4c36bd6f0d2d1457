//! In-memory ring of formatted log lines.
//!
//! The demo shell installs one globally so `tracing` output lands in its
//! status panel instead of scribbling over the alternate screen.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock};

pub const DEFAULT_MAX_LINES: usize = 500;

static GLOBAL_LOG: OnceLock<LogHandle> = OnceLock::new();

/// Install `handle` as the process-wide log sink. Only the first call wins.
pub fn set_global_log(handle: LogHandle) -> bool {
    GLOBAL_LOG.set(handle).is_ok()
}

pub fn global_log() -> Option<LogHandle> {
    GLOBAL_LOG.get().cloned()
}

#[derive(Debug)]
struct LogBuffer {
    lines: VecDeque<String>,
    max_lines: usize,
}

impl LogBuffer {
    fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
        }
    }

    fn push_line(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogHandle {
    inner: Arc<Mutex<LogBuffer>>,
}

impl Default for LogHandle {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl LogHandle {
    pub fn new(max_lines: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogBuffer::new(max_lines))),
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        if let Ok(mut buffer) = self.inner.lock() {
            buffer.push_line(line.into());
        }
    }

    /// The newest `count` lines, oldest first.
    pub fn tail(&self, count: usize) -> Vec<String> {
        match self.inner.lock() {
            Ok(buffer) => {
                let skip = buffer.lines.len().saturating_sub(count);
                buffer.lines.iter().skip(skip).cloned().collect()
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|b| b.lines.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn writer(&self) -> LogWriter {
        LogWriter::new(self.clone())
    }
}

/// `io::Write` adapter splitting written bytes into lines. A trailing
/// partial line is held back until a newline or an explicit flush.
#[derive(Debug)]
pub struct LogWriter {
    handle: LogHandle,
    pending: Vec<u8>,
}

impl LogWriter {
    pub fn new(handle: LogHandle) -> Self {
        Self {
            handle,
            pending: Vec::new(),
        }
    }

    fn push_text(&self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        for line in text.split('\n').filter(|line| !line.is_empty()) {
            self.handle.push(line.trim_end_matches('\r'));
        }
    }

    fn flush_pending(&mut self, force: bool) {
        if self.pending.is_empty() {
            return;
        }
        if force {
            let drained = std::mem::take(&mut self.pending);
            self.push_text(&drained);
            return;
        }
        let Some(pos) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return;
        };
        let drained: Vec<u8> = self.pending.drain(..=pos).collect();
        self.push_text(&drained);
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.flush_pending(false);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_pending(true);
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        self.flush_pending(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_keeps_only_newest_lines() {
        let handle = LogHandle::new(3);
        for line in ["one", "two", "three", "four"] {
            handle.push(line);
        }
        assert_eq!(handle.len(), 3);
        assert_eq!(handle.tail(10), vec!["two", "three", "four"]);
        assert_eq!(handle.tail(1), vec!["four"]);
    }

    #[test]
    fn writer_holds_partial_line_until_flush() {
        let handle = LogHandle::new(10);
        let mut writer = handle.writer();
        writer.write_all(b"first line\nsecond line\npartial").unwrap();
        assert_eq!(handle.tail(10), vec!["first line", "second line"]);
        writer.flush().unwrap();
        assert_eq!(handle.tail(1), vec!["partial"]);
    }

    #[test]
    fn dropping_writer_flushes_remainder() {
        let handle = LogHandle::new(10);
        {
            let mut writer = handle.writer();
            writer.write_all(b"tail without newline").unwrap();
        }
        assert_eq!(handle.tail(1), vec!["tail without newline"]);
    }
}
