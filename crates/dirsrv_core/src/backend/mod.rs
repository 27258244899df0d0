//! Backend trait and registry.
//!
//! A backend holds the entries under one or more suffixes. Backends are
//! registered at startup, shared as `Arc<dyn Backend>` and never owned
//! by the operation pipeline.
//!
//! # Write locking
//!
//! A successful `apply_add`, `apply_modify` or `apply_delete` returns with
//! the entry's write lock still held. The caller releases it with
//! [`Backend::release`], normally through a [`ReleaseGuard`] so that the
//! lock is dropped on every exit path. A failed apply releases the lock
//! before it returns.

mod memory;
mod registry;

pub use memory::{BackendConfig, InMemoryBackend};
pub use registry::{check_controls, BackendRegistry};

use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::BackendResult;
use crate::modification::Modification;
use crate::operation::Operation;
use crate::search::SearchParams;

/// The outcome of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    /// Per-backend commit sequence, starting at 1 and increasing by one
    /// with every successful write.
    pub sequence: u64,
}

/// A storage backend.
pub trait Backend: Send + Sync {
    /// Backend id, unique within a registry.
    fn id(&self) -> &str;

    /// Normalized suffixes served by this backend.
    fn suffixes(&self) -> &[Dn];

    /// True if writes are refused.
    fn read_only(&self) -> bool {
        false
    }

    /// Identity allowed to write to a replica.
    fn update_ndn(&self) -> Option<&Dn> {
        None
    }

    /// Referral URIs for writes that must go to the master.
    fn update_referrals(&self) -> &[String] {
        &[]
    }

    /// True if every identity may write, replica or not.
    fn multimaster(&self) -> bool {
        false
    }

    /// Per-backend override of operational attribute maintenance.
    fn lastmod(&self) -> Option<bool> {
        None
    }

    /// True if the backend understands the control.
    fn supports_control(&self, _oid: &str) -> bool {
        false
    }

    /// Stores a new entry.
    fn apply_add(&self, op: &Operation, entry: Entry) -> BackendResult<Commit>;

    /// Applies modifications to an existing entry.
    fn apply_modify(&self, op: &Operation, dn: &Dn, mods: &[Modification])
        -> BackendResult<Commit>;

    /// Removes a leaf entry.
    fn apply_delete(&self, op: &Operation, dn: &Dn) -> BackendResult<Commit>;

    /// Returns the entries selected by a search, in DN order.
    fn apply_search(&self, op: &Operation, params: &SearchParams) -> BackendResult<Vec<Entry>>;

    /// Verifies a simple bind password.
    fn apply_bind(&self, op: &Operation, dn: &Dn, password: &[u8]) -> BackendResult<()>;

    /// Releases the write lock taken by a successful apply.
    fn release(&self, dn: &Dn);
}

/// Releases a backend write lock when dropped.
#[must_use = "the write lock is released when the guard drops"]
pub struct ReleaseGuard<'a> {
    backend: &'a dyn Backend,
    dn: &'a Dn,
}

impl<'a> ReleaseGuard<'a> {
    /// Guards the write lock on `dn`.
    pub fn new(backend: &'a dyn Backend, dn: &'a Dn) -> Self {
        Self { backend, dn }
    }
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        self.backend.release(self.dn);
    }
}

impl std::fmt::Debug for ReleaseGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseGuard")
            .field("backend", &self.backend.id())
            .field("dn", &self.dn.as_str())
            .finish()
    }
}
