//! The replication log.
//!
//! Operation workers submit records; a dedicated writer thread hands them
//! to the sink. Records for one backend are released to the writer in
//! commit sequence order, even when the workers that committed them race
//! to submit. A commit that must not be replicated is submitted with
//! [`ReplicationLog::skip`] so the sequence has no holes.
//!
//! ```rust
//! use dirsrv_replog::{Change, MemorySink, ReplicationLog, ReplicationRecord, ReplogConfig};
//!
//! let sink = MemorySink::new();
//! let log = ReplicationLog::new(sink.clone(), &ReplogConfig::default()).unwrap();
//!
//! log.submit(ReplicationRecord::new("userRoot", 2, "cn=b", Change::Delete)).unwrap();
//! log.skip("userRoot", 1).unwrap();
//! log.shutdown();
//!
//! assert_eq!(sink.records()[0].sequence, 2);
//! ```

use crate::config::ReplogConfig;
use crate::error::{ReplogError, ReplogResult};
use crate::file::FileSink;
use crate::record::ReplicationRecord;
use crate::sink::ReplicationSink;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

enum Message {
    Record(Box<ReplicationRecord>),
    Flush(mpsc::Sender<()>),
}

/// Orders records of one backend by commit sequence.
#[derive(Debug)]
struct Sequencer {
    next: u64,
    /// Out-of-order arrivals; `None` marks a skipped commit.
    pending: BTreeMap<u64, Option<ReplicationRecord>>,
    /// Set once `pending` passed the limit, cleared when it drains.
    backlogged: bool,
}

impl Sequencer {
    fn new(next: u64) -> Self {
        Self {
            next,
            pending: BTreeMap::new(),
            backlogged: false,
        }
    }

    fn insert(
        &mut self,
        backend: &str,
        sequence: u64,
        record: Option<ReplicationRecord>,
    ) -> ReplogResult<Vec<ReplicationRecord>> {
        if sequence < self.next || self.pending.contains_key(&sequence) {
            return Err(ReplogError::StaleSequence {
                backend: backend.to_string(),
                sequence,
                next: self.next,
            });
        }
        self.pending.insert(sequence, record);
        let mut ready = Vec::new();
        while let Some(record) = self.pending.remove(&self.next) {
            ready.extend(record);
            self.next += 1;
        }
        Ok(ready)
    }

    /// Returns true the first time `pending` grows past `limit`.
    fn crossed_backlog(&mut self, limit: usize) -> bool {
        if self.pending.len() <= limit {
            self.backlogged = false;
            return false;
        }
        !std::mem::replace(&mut self.backlogged, true)
    }
}

/// Counters kept by the log.
#[derive(Debug, Default)]
pub struct ReplogStats {
    submitted: AtomicU64,
    skipped: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl ReplogStats {
    /// Records submitted for replication.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Commits submitted as skips.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Records the sink accepted.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Records the sink refused.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Records dropped because the writer queue was full or gone.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Queue-based handoff from operation workers to a replication sink.
pub struct ReplicationLog {
    sender: Mutex<Option<SyncSender<Message>>>,
    sequencers: Mutex<HashMap<String, Sequencer>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<ReplogStats>,
    backlog_limit: usize,
}

impl ReplicationLog {
    /// Starts a writer thread feeding `sink`.
    pub fn new(sink: impl ReplicationSink + 'static, config: &ReplogConfig) -> ReplogResult<Self> {
        let (sender, receiver) = mpsc::sync_channel(config.channel_bound);
        let stats = Arc::new(ReplogStats::default());
        let writer = {
            let stats = Arc::clone(&stats);
            thread::Builder::new()
                .name("replog-writer".into())
                .spawn(move || run_writer(sink, receiver, &stats))?
        };
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            sequencers: Mutex::new(HashMap::new()),
            writer: Mutex::new(Some(writer)),
            stats,
            backlog_limit: config.channel_bound,
        })
    }

    /// Starts a log appending to a slurpd-style replog file.
    pub fn to_file(path: impl AsRef<Path>, config: &ReplogConfig) -> ReplogResult<Self> {
        let sink = FileSink::open(path, config.replicas.clone())?;
        Self::new(sink, config)
    }

    /// Sets the first sequence expected from a backend.
    ///
    /// Backends that committed changes before the log started must be
    /// resumed, otherwise their records wait for the earlier sequences.
    pub fn resume(&self, backend_id: &str, last_sequence: u64) {
        self.sequencers
            .lock()
            .insert(backend_id.to_string(), Sequencer::new(last_sequence + 1));
    }

    /// Submits a committed change.
    pub fn submit(&self, record: ReplicationRecord) -> ReplogResult<()> {
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        let backend = record.backend_id.clone();
        let sequence = record.sequence;
        self.sequence(&backend, sequence, Some(record))
    }

    /// Marks a commit that is not replicated.
    pub fn skip(&self, backend_id: &str, sequence: u64) -> ReplogResult<()> {
        self.stats.skipped.fetch_add(1, Ordering::Relaxed);
        self.sequence(backend_id, sequence, None)
    }

    fn sequence(
        &self,
        backend: &str,
        sequence: u64,
        record: Option<ReplicationRecord>,
    ) -> ReplogResult<()> {
        // The sequencer lock is held while sending so that the channel
        // order matches the commit order.
        let mut sequencers = self.sequencers.lock();
        let sequencer = sequencers
            .entry(backend.to_string())
            .or_insert_with(|| Sequencer::new(1));
        let ready = sequencer.insert(backend, sequence, record)?;
        if sequencer.crossed_backlog(self.backlog_limit) {
            warn!(
                backend,
                waiting_for = sequencer.next,
                pending = sequencer.pending.len(),
                "replication records held behind a missing commit"
            );
        }
        if ready.is_empty() {
            debug!(backend, sequence, "replication record held for ordering");
            return Ok(());
        }
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            self.stats.dropped.fetch_add(ready.len() as u64, Ordering::Relaxed);
            return Err(ReplogError::Closed);
        };
        for record in ready {
            match sender.try_send(Message::Record(Box::new(record))) {
                Ok(()) => {}
                Err(TrySendError::Full(Message::Record(record))) => {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        backend = %record.backend_id,
                        sequence = record.sequence,
                        "replication queue full, record dropped"
                    );
                }
                Err(_) => {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    return Err(ReplogError::Closed);
                }
            }
        }
        Ok(())
    }

    /// Number of records of a backend waiting for an earlier sequence.
    pub fn pending(&self, backend_id: &str) -> usize {
        self.sequencers
            .lock()
            .get(backend_id)
            .map_or(0, |s| s.pending.len())
    }

    /// Counters.
    pub fn stats(&self) -> &ReplogStats {
        &self.stats
    }

    /// Blocks until the writer has handed every released record to the sink.
    pub fn flush(&self) -> ReplogResult<()> {
        let (done, wait) = mpsc::channel();
        {
            let sender = self.sender.lock();
            let sender = sender.as_ref().ok_or(ReplogError::Closed)?;
            sender
                .send(Message::Flush(done))
                .map_err(|_| ReplogError::Closed)?;
        }
        wait.recv().map_err(|_| ReplogError::Closed)
    }

    /// Stops accepting records, drains the queue and joins the writer.
    pub fn shutdown(&self) {
        drop(self.sender.lock().take());
        if let Some(writer) = self.writer.lock().take() {
            if writer.join().is_err() {
                warn!("replication writer panicked");
            }
        }
    }
}

impl Drop for ReplicationLog {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ReplicationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicationLog")
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

fn run_writer(mut sink: impl ReplicationSink, receiver: Receiver<Message>, stats: &ReplogStats) {
    for message in receiver {
        match message {
            Message::Record(record) => match sink.enqueue(&record) {
                Ok(()) => {
                    stats.written.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        backend = %record.backend_id,
                        sequence = record.sequence,
                        dn = %record.dn,
                        error = %err,
                        "replication enqueue failed"
                    );
                }
            },
            Message::Flush(done) => {
                if let Err(err) = sink.flush() {
                    warn!(error = %err, "replication sink flush failed");
                }
                let _ = done.send(());
            }
        }
    }
    if let Err(err) = sink.flush() {
        warn!(error = %err, "replication sink flush failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::record::Change;
    use crate::sink::MemorySink;

    fn record(backend: &str, sequence: u64) -> ReplicationRecord {
        ReplicationRecord::new(backend, sequence, format!("cn={sequence}"), Change::Delete)
    }

    fn sequences(sink: &MemorySink, backend: &str) -> Vec<u64> {
        sink.records()
            .into_iter()
            .filter(|r| r.backend_id == backend)
            .map(|r| r.sequence)
            .collect()
    }

    #[test]
    fn backlog_behind_a_hole_is_flagged_once() {
        let log = ReplicationLog::new(MemorySink::new(), &ReplogConfig::new().with_channel_bound(4))
            .unwrap();
        let backlogged = |log: &ReplicationLog| log.sequencers.lock()["a"].backlogged;

        for sequence in 2..=5 {
            log.submit(record("a", sequence)).unwrap();
        }
        assert!(!backlogged(&log));
        log.submit(record("a", 6)).unwrap();
        assert!(backlogged(&log));
        assert!(!log.sequencers.lock().get_mut("a").unwrap().crossed_backlog(4));

        log.submit(record("a", 1)).unwrap();
        assert_eq!(log.pending("a"), 0);
        assert!(!backlogged(&log));
        log.flush().unwrap();
        let delivered = log.stats().written() + log.stats().dropped();
        assert_eq!(delivered, 6);
    }

    #[test]
    fn out_of_order_submissions_are_reordered() {
        let sink = MemorySink::new();
        let log = ReplicationLog::new(sink.clone(), &ReplogConfig::default()).unwrap();

        log.submit(record("a", 3)).unwrap();
        log.submit(record("a", 2)).unwrap();
        assert_eq!(log.pending("a"), 2);
        log.submit(record("a", 1)).unwrap();
        assert_eq!(log.pending("a"), 0);
        log.flush().unwrap();

        assert_eq!(sequences(&sink, "a"), vec![1, 2, 3]);
        assert_eq!(log.stats().written(), 3);
    }

    #[test]
    fn skips_fill_holes() {
        let sink = MemorySink::new();
        let log = ReplicationLog::new(sink.clone(), &ReplogConfig::default()).unwrap();

        log.submit(record("a", 2)).unwrap();
        log.skip("a", 1).unwrap();
        log.submit(record("b", 1)).unwrap();
        log.shutdown();

        assert_eq!(sequences(&sink, "a"), vec![2]);
        assert_eq!(sequences(&sink, "b"), vec![1]);
        assert_eq!(log.stats().skipped(), 1);
    }

    #[test]
    fn stale_sequence_rejected() {
        let log = ReplicationLog::new(MemorySink::new(), &ReplogConfig::default()).unwrap();
        log.submit(record("a", 1)).unwrap();
        assert!(matches!(
            log.submit(record("a", 1)),
            Err(ReplogError::StaleSequence { next: 2, .. })
        ));
    }

    #[test]
    fn resume_starts_later() {
        let sink = MemorySink::new();
        let log = ReplicationLog::new(sink.clone(), &ReplogConfig::default()).unwrap();
        log.resume("a", 10);
        log.submit(record("a", 11)).unwrap();
        log.shutdown();
        assert_eq!(sequences(&sink, "a"), vec![11]);
    }

    #[test]
    fn racing_workers_keep_commit_order() {
        let sink = MemorySink::new();
        let log = Arc::new(ReplicationLog::new(sink.clone(), &ReplogConfig::default()).unwrap());

        let handles: Vec<_> = (0..4u64)
            .map(|worker| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for seq in (1..=100u64).filter(|s| s % 4 == worker) {
                        log.submit(record("a", seq)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        log.shutdown();

        assert_eq!(sequences(&sink, "a"), (1..=100).collect::<Vec<_>>());
    }

    struct FailingSink;

    impl ReplicationSink for FailingSink {
        fn enqueue(&mut self, _record: &ReplicationRecord) -> Result<(), SinkError> {
            Err(SinkError::rejected("disk full"))
        }
    }

    #[test]
    fn sink_failures_are_counted() {
        let log = ReplicationLog::new(FailingSink, &ReplogConfig::default()).unwrap();
        log.submit(record("a", 1)).unwrap();
        log.submit(record("a", 2)).unwrap();
        log.flush().unwrap();
        assert_eq!(log.stats().failed(), 2);
        assert_eq!(log.stats().written(), 0);
    }

    #[test]
    fn closed_after_shutdown() {
        let log = ReplicationLog::new(MemorySink::new(), &ReplogConfig::default()).unwrap();
        log.shutdown();
        assert!(matches!(log.submit(record("a", 1)), Err(ReplogError::Closed)));
        assert!(matches!(log.flush(), Err(ReplogError::Closed)));
    }
}
