//! Shared, serialized console output.
//!
//! Every write goes through one mutex and is flushed before the lock is
//! released, so lines from different tasks never interleave. The sink also
//! remembers whether the cursor sits at the end of an in-place refreshed line
//! (written with a leading `\r` and no newline); the next regular line
//! terminates it first instead of being glued onto it.

use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

struct SinkState {
    writer: Box<dyn Write + Send>,
    line_open: bool,
}

impl SinkState {
    fn emit(&mut self, bytes: &[u8]) {
        let result = self
            .writer
            .write_all(bytes)
            .and_then(|_| self.writer.flush());
        // A closed console must not fault the task that happened to write.
        if let Err(e) = result {
            tracing::debug!("output sink write failed: {}", e);
        }
    }
}

#[derive(Clone)]
pub struct OutputSink {
    state: Arc<Mutex<SinkState>>,
}

impl OutputSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState {
                writer: Box::new(writer),
                line_open: false,
            })),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// In-memory sink for tests and embedding.
    pub fn capture() -> (Self, CaptureBuffer) {
        let buffer = CaptureBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    /// Write one complete line.
    pub fn write_line(&self, line: &str) {
        let mut state = self.state.lock();
        let mut buf = String::with_capacity(line.len() + 2);
        if state.line_open {
            buf.push('\n');
        }
        buf.push_str(line);
        buf.push('\n');
        state.emit(buf.as_bytes());
        state.line_open = false;
    }

    /// Overwrite the current line in place: carriage return, then `line`,
    /// without a trailing newline.
    pub fn refresh_line(&self, line: &str) {
        let mut state = self.state.lock();
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push('\r');
        buf.push_str(line);
        state.emit(buf.as_bytes());
        state.line_open = true;
    }

    /// Terminate a pending refreshed line, if any.
    pub fn close_line(&self) {
        let mut state = self.state.lock();
        if state.line_open {
            state.emit(b"\n");
            state.line_open = false;
        }
    }

    pub fn has_open_line(&self) -> bool {
        self.state.lock().line_open
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink")
            .field("line_open", &self.has_open_line())
            .finish()
    }
}

/// Byte buffer shared with an [`OutputSink`] created by [`OutputSink::capture`].
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Captured output split into display lines, treating both `\r` and `\n`
    /// as terminators and dropping empty fragments.
    pub fn lines(&self) -> Vec<String> {
        self.contents()
            .split(['\r', '\n'])
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn clear(&self) {
        self.bytes.lock().clear();
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_write_line() {
        let (sink, buffer) = OutputSink::capture();
        sink.write_line("hello");
        sink.write_line("world");
        assert_eq!(buffer.contents(), "hello\nworld\n");
    }

    #[test]
    fn test_refresh_overwrites_in_place() {
        let (sink, buffer) = OutputSink::capture();
        sink.refresh_line("tick 1");
        sink.refresh_line("tick 2");
        assert!(sink.has_open_line());
        assert_eq!(buffer.contents(), "\rtick 1\rtick 2");
    }

    #[test]
    fn test_line_after_refresh_starts_fresh() {
        let (sink, buffer) = OutputSink::capture();
        sink.refresh_line("tick");
        sink.write_line("status");
        assert!(!sink.has_open_line());
        assert_eq!(buffer.contents(), "\rtick\nstatus\n");
        assert_eq!(buffer.lines(), vec!["tick", "status"]);
    }

    #[test]
    fn test_close_line() {
        let (sink, buffer) = OutputSink::capture();
        sink.close_line();
        assert_eq!(buffer.contents(), "");

        sink.refresh_line("tick");
        sink.close_line();
        sink.close_line();
        assert_eq!(buffer.contents(), "\rtick\n");
    }

    #[test]
    fn test_broken_writer_is_swallowed() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let sink = OutputSink::new(Broken);
        sink.write_line("nobody is listening");
        sink.refresh_line("still nobody");
    }

    #[test]
    fn test_concurrent_lines_are_whole() {
        let (sink, buffer) = OutputSink::capture();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                thread::spawn(move || {
                    let line = format!("writer-{}-{}", i, "x".repeat(64));
                    for _ in 0..100 {
                        sink.write_line(&line);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let lines = buffer.lines();
        assert_eq!(lines.len(), 800);
        for line in lines {
            assert!(line.starts_with("writer-"));
            assert!(line.ends_with(&"x".repeat(64)));
            assert_eq!(line.len(), "writer-0-".len() + 64);
        }
    }
}
