//! Per-trial draw trace.
//!
//! Workers hand `(key, missed)` events to a bounded queue; one drain thread
//! owns the sink and writes each event as `"<key>,<missed>\n"`. A full queue
//! blocks producers, which is acceptable for a diagnostic stream.
//!
//! ```text
//!   worker 0 ─┐
//!   worker 1 ─┼─► bounded(capacity) ─► drain thread ─► BufWriter<File>
//!   worker N ─┘
//! ```
//!
//! [`TraceLogger::finish`] closes the queue, waits for the drain thread and
//! returns only after the sink is flushed and closed, so consecutive trials
//! never interleave in one file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::debug;

use crate::error::BenchError;

/// One observed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEvent {
    pub key: u64,
    pub missed: bool,
}

/// Producer handle given to each worker.
#[derive(Debug, Clone)]
pub struct TraceSender(Sender<TraceEvent>);

impl TraceSender {
    /// Queues an event, blocking while the queue is full.
    ///
    /// Events are dropped if the drain thread already failed; the failure is
    /// reported by [`TraceLogger::finish`].
    #[inline]
    pub fn record(&self, key: u64, missed: bool) {
        let _ = self.0.send(TraceEvent { key, missed });
    }
}

/// Owner of the trace queue and its drain thread.
#[derive(Debug)]
pub struct TraceLogger {
    sender: Option<Sender<TraceEvent>>,
    drain: Option<JoinHandle<io::Result<u64>>>,
    path: Option<PathBuf>,
}

impl TraceLogger {
    /// Creates (truncating) the trace file at `path`.
    pub fn create(path: impl AsRef<Path>, capacity: usize) -> Result<Self, BenchError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| BenchError::TraceSink {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "trace file opened");
        let mut logger = Self::from_writer(file, capacity);
        logger.path = Some(path.to_path_buf());
        Ok(logger)
    }

    /// Drains into an arbitrary writer.
    pub fn from_writer<W>(writer: W, capacity: usize) -> Self
    where
        W: Write + Send + 'static,
    {
        let (sender, receiver) = channel::bounded(capacity.max(1));
        let drain = thread::Builder::new()
            .name("trace-drain".into())
            .spawn(move || drain(receiver, writer));
        let drain = match drain {
            Ok(handle) => Some(handle),
            Err(err) => {
                // Without a drain thread the receiver is gone and sends fail fast.
                tracing::error!(error = %err, "failed to spawn trace drain thread");
                None
            },
        };
        Self {
            sender: Some(sender),
            drain,
            path: None,
        }
    }

    /// A producer handle for one worker.
    pub fn sender(&self) -> Option<TraceSender> {
        self.sender.clone().map(TraceSender)
    }

    /// File path, if the logger was created from one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Closes the queue and waits for every queued event to be written.
    ///
    /// Returns the number of lines written. All worker senders must already be
    /// dropped, otherwise this blocks until they are.
    pub fn finish(mut self) -> Result<u64, BenchError> {
        self.sender.take();
        let lines = match self.drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| BenchError::TraceWorker)?
                .map_err(BenchError::TraceWrite)?,
            None => return Err(BenchError::TraceWorker),
        };
        debug!(path = ?self.path, lines, "trace closed");
        Ok(lines)
    }
}

impl Drop for TraceLogger {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.drain.take() {
            let _ = handle.join();
        }
    }
}

fn drain<W: Write>(receiver: Receiver<TraceEvent>, writer: W) -> io::Result<u64> {
    let mut out = BufWriter::new(writer);
    let mut lines = 0u64;
    for event in receiver {
        writeln!(out, "{},{}", event.key, event.missed)?;
        lines += 1;
    }
    out.flush()?;
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("sink closed"))
        }
    }

    #[test]
    fn writes_events_in_arrival_order() {
        let buf = SharedBuf::default();
        let logger = TraceLogger::from_writer(buf.clone(), 2);
        let sender = logger.sender().unwrap();
        sender.record(7, true);
        sender.record(3, false);
        sender.record(7, false);
        drop(sender);
        assert_eq!(logger.finish().unwrap(), 3);
        let text = String::from_utf8(buf.0.lock().clone()).unwrap();
        assert_eq!(text, "7,true\n3,false\n7,false\n");
    }

    #[test]
    fn empty_trace_writes_nothing() {
        let buf = SharedBuf::default();
        let logger = TraceLogger::from_writer(buf.clone(), 8);
        assert_eq!(logger.finish().unwrap(), 0);
        assert!(buf.0.lock().is_empty());
    }

    #[test]
    fn write_failure_surfaces_on_finish() {
        let logger = TraceLogger::from_writer(FailingWriter, 1);
        let sender = logger.sender().unwrap();
        for i in 0..10_000 {
            sender.record(i, false);
        }
        drop(sender);
        assert!(matches!(logger.finish(), Err(BenchError::TraceWrite(_))));
    }

    #[test]
    fn unwritable_path_is_a_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("trace.csv");
        let err = TraceLogger::create(&path, 4).unwrap_err();
        assert!(matches!(err, BenchError::TraceSink { .. }));
        assert!(err.aborts_run());
    }
}
