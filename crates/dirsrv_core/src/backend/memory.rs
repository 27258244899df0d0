//! In-memory backend.

use super::{Backend, Commit};
use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::{BackendError, BackendResult, DnError};
use crate::modification::Modification;
use crate::operation::Operation;
use crate::search::SearchParams;
use dirsrv_protocol::ResultCode;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use tracing::trace;

const USER_PASSWORD: &str = "userPassword";

/// Configuration for an [`InMemoryBackend`].
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Backend id.
    pub id: String,
    /// Suffixes served, as DN strings.
    pub suffixes: Vec<String>,
    /// Refuse all writes.
    pub read_only: bool,
    /// Replica update identity.
    pub update_dn: Option<String>,
    /// Referrals returned to other writers of a replica.
    pub update_referrals: Vec<String>,
    /// Accept writes from every identity.
    pub multimaster: bool,
    /// Operational attribute maintenance override.
    pub lastmod: Option<bool>,
    /// Control OIDs the backend understands.
    pub supported_controls: Vec<String>,
}

impl BackendConfig {
    /// Creates a configuration with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Adds a suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffixes.push(suffix.into());
        self
    }

    /// Sets the read-only flag.
    pub const fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Makes the backend a replica updated by `update_dn`.
    pub fn with_update_dn(mut self, update_dn: impl Into<String>) -> Self {
        self.update_dn = Some(update_dn.into());
        self
    }

    /// Adds an update referral.
    pub fn with_update_referral(mut self, uri: impl Into<String>) -> Self {
        self.update_referrals.push(uri.into());
        self
    }

    /// Sets the multi-master flag.
    pub const fn with_multimaster(mut self, multimaster: bool) -> Self {
        self.multimaster = multimaster;
        self
    }

    /// Overrides operational attribute maintenance.
    pub const fn with_lastmod(mut self, lastmod: bool) -> Self {
        self.lastmod = Some(lastmod);
        self
    }

    /// Adds a supported control.
    pub fn with_supported_control(mut self, oid: impl Into<String>) -> Self {
        self.supported_controls.push(oid.into());
        self
    }
}

#[derive(Debug, Default)]
struct Store {
    entries: BTreeMap<Dn, Entry>,
    last_sequence: u64,
}

impl Store {
    fn commit(&mut self) -> Commit {
        self.last_sequence += 1;
        Commit {
            sequence: self.last_sequence,
        }
    }

    /// The deepest existing ancestor of `dn`.
    fn matched(&self, dn: &Dn) -> Option<String> {
        let mut current = dn.parent();
        while let Some(candidate) = current {
            if let Some(entry) = self.entries.get(&candidate) {
                return Some(entry.dn().raw().to_string());
            }
            current = candidate.parent();
        }
        None
    }
}

/// A backend holding its entries in memory.
///
/// Writes take a per-DN write lock that stays held after a successful
/// apply until [`Backend::release`]; the store itself is guarded by a
/// read-write lock. Commit sequences are assigned while the store is
/// write-locked, so they follow the order in which changes became visible.
///
/// # Example
///
/// ```rust
/// use dirsrv_core::{Backend, BackendConfig, InMemoryBackend};
///
/// let backend = InMemoryBackend::new(
///     BackendConfig::new("userRoot").with_suffix("dc=example,dc=com"),
/// )
/// .unwrap();
/// assert_eq!(backend.suffixes()[0].as_str(), "dc=example,dc=com");
/// assert!(backend.is_empty());
/// ```
#[derive(Debug)]
pub struct InMemoryBackend {
    id: String,
    suffixes: Vec<Dn>,
    read_only: bool,
    update_ndn: Option<Dn>,
    update_referrals: Vec<String>,
    multimaster: bool,
    lastmod: Option<bool>,
    supported_controls: Vec<String>,
    store: RwLock<Store>,
    locked: Mutex<HashSet<Dn>>,
    unlocked: Condvar,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    ///
    /// Fails if a suffix or the update DN does not parse.
    pub fn new(config: BackendConfig) -> Result<Self, DnError> {
        let suffixes = config
            .suffixes
            .iter()
            .map(|s| Dn::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        let update_ndn = config.update_dn.as_deref().map(Dn::parse).transpose()?;
        Ok(Self {
            id: config.id,
            suffixes,
            read_only: config.read_only,
            update_ndn,
            update_referrals: config.update_referrals,
            multimaster: config.multimaster,
            lastmod: config.lastmod,
            supported_controls: config.supported_controls,
            store: RwLock::new(Store::default()),
            locked: Mutex::new(HashSet::new()),
            unlocked: Condvar::new(),
        })
    }

    /// Inserts an entry directly, without locking, parent checks or a
    /// commit sequence. Used to seed a backend.
    pub fn load(&self, entry: Entry) {
        self.store.write().entries.insert(entry.dn().clone(), entry);
    }

    /// Returns a copy of an entry.
    pub fn get(&self, dn: &Dn) -> Option<Entry> {
        self.store.read().entries.get(dn).cloned()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.store.read().entries.len()
    }

    /// True if the backend holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sequence of the last commit; 0 before the first.
    pub fn last_sequence(&self) -> u64 {
        self.store.read().last_sequence
    }

    /// True if `dn` is write-locked.
    pub fn is_locked(&self, dn: &Dn) -> bool {
        self.locked.lock().contains(dn)
    }

    fn is_own_suffix(&self, dn: &Dn) -> bool {
        self.suffixes.iter().any(|s| s == dn)
    }

    fn lock(&self, dn: &Dn) {
        let mut locked = self.locked.lock();
        while locked.contains(dn) {
            self.unlocked.wait(&mut locked);
        }
        locked.insert(dn.clone());
    }

    /// Runs a write under the DN lock, dropping the lock if it fails.
    fn write<T>(&self, dn: &Dn, f: impl FnOnce(&mut Store) -> BackendResult<T>) -> BackendResult<T> {
        self.lock(dn);
        let result = f(&mut self.store.write());
        if result.is_err() {
            self.release(dn);
        }
        result
    }
}

impl Backend for InMemoryBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn suffixes(&self) -> &[Dn] {
        &self.suffixes
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn update_ndn(&self) -> Option<&Dn> {
        self.update_ndn.as_ref()
    }

    fn update_referrals(&self) -> &[String] {
        &self.update_referrals
    }

    fn multimaster(&self) -> bool {
        self.multimaster
    }

    fn lastmod(&self) -> Option<bool> {
        self.lastmod
    }

    fn supports_control(&self, oid: &str) -> bool {
        self.supported_controls.iter().any(|c| c == oid)
    }

    fn apply_add(&self, op: &Operation, entry: Entry) -> BackendResult<Commit> {
        trace!(conn = op.conn_id, op = op.message_id, dn = %entry.dn(), "memory add");
        let dn = entry.dn().clone();
        self.write(&dn, |store| {
            if store.entries.contains_key(&dn) {
                return Err(BackendError::already_exists());
            }
            if !self.is_own_suffix(&dn) {
                let parent_exists = dn
                    .parent()
                    .map_or(false, |parent| store.entries.contains_key(&parent));
                if !parent_exists {
                    return Err(BackendError::no_such_object(store.matched(&dn)));
                }
            }
            store.entries.insert(dn.clone(), entry);
            Ok(store.commit())
        })
    }

    fn apply_modify(
        &self,
        op: &Operation,
        dn: &Dn,
        mods: &[Modification],
    ) -> BackendResult<Commit> {
        trace!(conn = op.conn_id, op = op.message_id, dn = %dn, mods = mods.len(), "memory modify");
        self.write(dn, |store| {
            let current = match store.entries.get(dn) {
                Some(entry) => entry,
                None => return Err(BackendError::no_such_object(store.matched(dn))),
            };
            let next = current.apply_modifications(mods)?;
            store.entries.insert(dn.clone(), next);
            Ok(store.commit())
        })
    }

    fn apply_delete(&self, op: &Operation, dn: &Dn) -> BackendResult<Commit> {
        trace!(conn = op.conn_id, op = op.message_id, dn = %dn, "memory delete");
        self.write(dn, |store| {
            if !store.entries.contains_key(dn) {
                return Err(BackendError::no_such_object(store.matched(dn)));
            }
            if store.entries.keys().any(|k| dn.is_parent_of(k)) {
                return Err(BackendError::new(
                    ResultCode::NotAllowedOnNonLeaf,
                    "subordinate objects must be deleted first",
                ));
            }
            store.entries.remove(dn);
            Ok(store.commit())
        })
    }

    fn apply_search(&self, op: &Operation, params: &SearchParams) -> BackendResult<Vec<Entry>> {
        trace!(conn = op.conn_id, op = op.message_id, base = %params.base, "memory search");
        let store = self.store.read();
        if !store.entries.contains_key(&params.base) {
            return Err(BackendError::no_such_object(store.matched(&params.base)));
        }
        Ok(store
            .entries
            .values()
            .filter(|entry| params.selects(entry))
            .cloned()
            .collect())
    }

    fn apply_bind(&self, op: &Operation, dn: &Dn, password: &[u8]) -> BackendResult<()> {
        trace!(conn = op.conn_id, op = op.message_id, dn = %dn, "memory bind");
        let store = self.store.read();
        let verified = store
            .entries
            .get(dn)
            .and_then(|entry| entry.get(USER_PASSWORD))
            .map_or(false, |attr| attr.values().iter().any(|v| v == password));
        if verified {
            Ok(())
        } else {
            Err(BackendError::invalid_credentials())
        }
    }

    fn release(&self, dn: &Dn) {
        let mut locked = self.locked.lock();
        locked.remove(dn);
        self.unlocked.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ReleaseGuard;
    use dirsrv_protocol::{Filter, OperationKind};
    use std::sync::Arc;

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    fn entry(s: &str, attrs: &[(&str, &str)]) -> Entry {
        Entry::from_modifications(
            dn(s),
            attrs
                .iter()
                .map(|(t, v)| Modification::add(*t, vec![v.as_bytes().to_vec()]))
                .collect(),
        )
        .unwrap()
    }

    fn backend() -> InMemoryBackend {
        let backend =
            InMemoryBackend::new(BackendConfig::new("userRoot").with_suffix("dc=example,dc=com"))
                .unwrap();
        backend.load(entry("dc=example,dc=com", &[("dc", "example")]));
        backend
    }

    fn op() -> Operation {
        Operation::new(1, 1, OperationKind::Add)
    }

    fn add(backend: &InMemoryBackend, e: Entry) -> BackendResult<Commit> {
        let dn = e.dn().clone();
        let commit = backend.apply_add(&op(), e)?;
        backend.release(&dn);
        Ok(commit)
    }

    #[test]
    fn add_assigns_sequences() {
        let backend = backend();
        let first = add(&backend, entry("ou=people,dc=example,dc=com", &[("ou", "people")])).unwrap();
        let second = add(&backend, entry("cn=a,ou=people,dc=example,dc=com", &[("cn", "a")])).unwrap();
        assert_eq!((first.sequence, second.sequence), (1, 2));
        assert_eq!(backend.last_sequence(), 2);
        assert_eq!(backend.len(), 3);
    }

    #[test]
    fn add_existing_entry_fails() {
        let backend = backend();
        let err = add(&backend, entry("dc=example,dc=com", &[("dc", "example")])).unwrap_err();
        assert_eq!(err.code, ResultCode::EntryAlreadyExists);
        assert!(!backend.is_locked(&dn("dc=example,dc=com")));
    }

    #[test]
    fn add_without_parent_reports_matched() {
        let backend = backend();
        let err = add(&backend, entry("cn=a,ou=missing,dc=example,dc=com", &[("cn", "a")])).unwrap_err();
        assert_eq!(err.code, ResultCode::NoSuchObject);
        assert_eq!(err.matched.as_deref(), Some("dc=example,dc=com"));
        assert_eq!(backend.last_sequence(), 0);
    }

    #[test]
    fn suffix_entry_needs_no_parent() {
        let backend =
            InMemoryBackend::new(BackendConfig::new("r").with_suffix("dc=example,dc=com")).unwrap();
        assert!(add(&backend, entry("dc=example,dc=com", &[("dc", "example")])).is_ok());
    }

    #[test]
    fn successful_apply_holds_lock_until_release() {
        let backend = backend();
        let e = entry("cn=a,dc=example,dc=com", &[("cn", "a")]);
        let dn = e.dn().clone();
        backend.apply_add(&op(), e).unwrap();
        assert!(backend.is_locked(&dn));
        {
            let _guard = ReleaseGuard::new(&backend, &dn);
        }
        assert!(!backend.is_locked(&dn));
    }

    #[test]
    fn writer_waits_for_release() {
        let backend = Arc::new(backend());
        let e = entry("cn=a,dc=example,dc=com", &[("cn", "a"), ("sn", "x")]);
        let dn = e.dn().clone();
        backend.apply_add(&op(), e).unwrap();

        let waiter = {
            let backend = Arc::clone(&backend);
            let dn = dn.clone();
            std::thread::spawn(move || {
                let commit = backend
                    .apply_modify(&op(), &dn, &[Modification::replace_one("sn", "y")])
                    .unwrap();
                backend.release(&dn);
                commit.sequence
            })
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(backend.last_sequence(), 1);
        backend.release(&dn);
        assert_eq!(waiter.join().unwrap(), 2);
    }

    #[test]
    fn modify_applies_on_copy() {
        let backend = backend();
        add(&backend, entry("cn=a,dc=example,dc=com", &[("cn", "a"), ("sn", "x")])).unwrap();
        let target = dn("cn=a,dc=example,dc=com");

        let err = backend
            .apply_modify(
                &op(),
                &target,
                &[
                    Modification::replace_one("sn", "y"),
                    Modification::delete("mail", vec![]),
                ],
            )
            .unwrap_err();
        assert_eq!(err.code, ResultCode::NoSuchAttribute);
        assert!(backend.get(&target).unwrap().get("sn").unwrap().contains(b"x"));

        let err = backend
            .apply_modify(&op(), &dn("cn=b,dc=example,dc=com"), &[])
            .unwrap_err();
        assert_eq!(err.code, ResultCode::NoSuchObject);
    }

    #[test]
    fn delete_requires_leaf() {
        let backend = backend();
        add(&backend, entry("ou=people,dc=example,dc=com", &[("ou", "people")])).unwrap();
        add(&backend, entry("cn=a,ou=people,dc=example,dc=com", &[("cn", "a")])).unwrap();

        let err = backend
            .apply_delete(&op(), &dn("ou=people,dc=example,dc=com"))
            .unwrap_err();
        assert_eq!(err.code, ResultCode::NotAllowedOnNonLeaf);

        let leaf = dn("cn=a,ou=people,dc=example,dc=com");
        backend.apply_delete(&op(), &leaf).unwrap();
        backend.release(&leaf);
        assert!(backend.get(&leaf).is_none());

        let err = backend.apply_delete(&op(), &leaf).unwrap_err();
        assert_eq!(err.code, ResultCode::NoSuchObject);
    }

    #[test]
    fn search_filters_and_scopes() {
        let backend = backend();
        add(&backend, entry("cn=a,dc=example,dc=com", &[("cn", "a")])).unwrap();
        add(&backend, entry("cn=b,dc=example,dc=com", &[("cn", "b")])).unwrap();

        let mut params = SearchParams::subtree(dn("dc=example,dc=com"));
        assert_eq!(backend.apply_search(&op(), &params).unwrap().len(), 3);

        params.filter = Filter::equality("cn", "B");
        let found = backend.apply_search(&op(), &params).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].dn().as_str(), "cn=b,dc=example,dc=com");

        let missing = SearchParams::subtree(dn("ou=x,dc=example,dc=com"));
        let err = backend.apply_search(&op(), &missing).unwrap_err();
        assert_eq!(err.code, ResultCode::NoSuchObject);
        assert_eq!(err.matched.as_deref(), Some("dc=example,dc=com"));
    }

    #[test]
    fn bind_checks_user_password() {
        let backend = backend();
        add(
            &backend,
            entry("cn=admin,dc=example,dc=com", &[("cn", "admin"), ("userPassword", "secret")]),
        )
        .unwrap();
        let admin = dn("cn=admin,dc=example,dc=com");
        assert!(backend.apply_bind(&op(), &admin, b"secret").is_ok());
        assert_eq!(
            backend.apply_bind(&op(), &admin, b"SECRET").unwrap_err().code,
            ResultCode::InvalidCredentials
        );
        assert!(backend
            .apply_bind(&op(), &dn("cn=nobody,dc=example,dc=com"), b"secret")
            .is_err());
    }
}
