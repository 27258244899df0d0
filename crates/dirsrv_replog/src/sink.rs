//! Replication sinks.

use crate::error::SinkError;
use crate::record::ReplicationRecord;
use parking_lot::Mutex;
use std::sync::Arc;

/// Destination of replication records.
///
/// A sink is owned by the log writer thread; `enqueue` is only called from
/// there, one record at a time and in per-backend commit order.
pub trait ReplicationSink: Send {
    /// Accepts one record.
    fn enqueue(&mut self, record: &ReplicationRecord) -> Result<(), SinkError>;

    /// Flushes buffered records.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// A sink that keeps records in memory.
///
/// Clones share the same buffer, so a test can keep one clone and hand the
/// other to the log.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<ReplicationRecord>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the records received so far.
    pub fn records(&self) -> Vec<ReplicationRecord> {
        self.records.lock().clone()
    }

    /// Number of records received.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// True if nothing was received.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ReplicationSink for MemorySink {
    fn enqueue(&mut self, record: &ReplicationRecord) -> Result<(), SinkError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

impl<S: ReplicationSink + ?Sized> ReplicationSink for Box<S> {
    fn enqueue(&mut self, record: &ReplicationRecord) -> Result<(), SinkError> {
        (**self).enqueue(record)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}
