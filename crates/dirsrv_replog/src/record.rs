//! Replication records.

use dirsrv_core::{Entry, Modification};

/// The change carried by a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A new entry, operational attributes included.
    Add(Entry),
    /// Modifications in the order they were applied.
    Modify(Vec<Modification>),
    /// Removal of a leaf entry.
    Delete,
}

impl Change {
    /// The `changetype` keyword.
    pub fn changetype(&self) -> &'static str {
        match self {
            Change::Add(_) => "add",
            Change::Modify(_) => "modify",
            Change::Delete => "delete",
        }
    }
}

/// One committed mutation, handed to the replication log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationRecord {
    /// Backend that committed the change.
    pub backend_id: String,
    /// Commit sequence assigned by the backend.
    pub sequence: u64,
    /// Normalized DN of the target entry.
    pub dn: String,
    /// The change.
    pub change: Change,
    /// Modifier name of the submitting identity.
    pub identity: String,
    /// Unix seconds of the change.
    pub time: i64,
}

impl ReplicationRecord {
    /// Creates a record.
    pub fn new(
        backend_id: impl Into<String>,
        sequence: u64,
        dn: impl Into<String>,
        change: Change,
    ) -> Self {
        Self {
            backend_id: backend_id.into(),
            sequence,
            dn: dn.into(),
            change,
            identity: String::new(),
            time: 0,
        }
    }

    /// Sets the submitting identity.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Sets the change time.
    pub const fn with_time(mut self, time: i64) -> Self {
        self.time = time;
        self
    }
}
