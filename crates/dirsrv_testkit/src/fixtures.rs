//! Test fixtures and directory helpers.
//!
//! Provides a server wired to a writable `dc=example,dc=com` backend and
//! a replication log, with the log held in memory or in a temporary file.

use crate::builders::entry;
use dirsrv_core::{BackendConfig, BackendRegistry, Clock, FixedClock, InMemoryBackend};
use dirsrv_protocol::{Request, Response, ResultCode};
use dirsrv_replog::{MemorySink, ReplicationLog, ReplicationRecord, ReplogConfig};
use dirsrv_server::{Connection, Server, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Suffix of the fixture backend.
pub const SUFFIX: &str = "dc=example,dc=com";
/// An administrator entry with password [`ADMIN_PASSWORD`].
pub const ADMIN_DN: &str = "cn=admin,dc=example,dc=com";
/// Password of [`ADMIN_DN`].
pub const ADMIN_PASSWORD: &str = "secret";
/// Unix time of the fixture clock.
pub const FIXED_TIME: i64 = 1_700_000_000;
/// [`FIXED_TIME`] as GeneralizedTime.
pub const FIXED_TIMESTAMP: &str = "20231114221320Z";

/// A test directory with automatic cleanup.
pub struct TestDirectory {
    /// The server.
    pub server: Arc<Server>,
    /// The fixture backend.
    pub backend: Arc<InMemoryBackend>,
    /// The replication log.
    pub log: Arc<ReplicationLog>,
    sink: Option<MemorySink>,
    _temp_dir: Option<TempDir>,
}

impl TestDirectory {
    /// Creates a directory replicating into memory.
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default(), BackendConfig::new("example"))
    }

    /// Creates a directory with the given server and backend configuration.
    ///
    /// The backend config gets the fixture suffix added.
    pub fn with_config(config: ServerConfig, backend: BackendConfig) -> Self {
        let sink = MemorySink::new();
        let log = ReplicationLog::new(sink.clone(), &ReplogConfig::default())
            .expect("Failed to start replication log");
        Self::build(config, backend, log, Some(sink), None)
    }

    /// Creates a directory replicating into a replog in a temporary directory.
    pub fn with_replog(replicas: &[&str]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut replog = ReplogConfig::new();
        for replica in replicas {
            replog = replog.with_replica(*replica);
        }
        let log = ReplicationLog::to_file(temp_dir.path().join("slapd.replog"), &replog)
            .expect("Failed to open replog");
        Self::build(
            ServerConfig::default(),
            BackendConfig::new("example"),
            log,
            None,
            Some(temp_dir),
        )
    }

    fn build(
        config: ServerConfig,
        backend: BackendConfig,
        log: ReplicationLog,
        sink: Option<MemorySink>,
        temp_dir: Option<TempDir>,
    ) -> Self {
        let backend = Arc::new(
            InMemoryBackend::new(backend.with_suffix(SUFFIX)).expect("Invalid fixture backend"),
        );
        backend.load(entry(SUFFIX, &[("objectClass", "domain"), ("dc", "example")]));
        backend.load(entry(
            ADMIN_DN,
            &[
                ("objectClass", "person"),
                ("cn", "admin"),
                ("sn", "admin"),
                ("userPassword", ADMIN_PASSWORD),
            ],
        ));

        let mut registry = BackendRegistry::new();
        registry
            .register(backend.clone())
            .expect("Failed to register fixture backend");

        let log = Arc::new(log);
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at_unix(FIXED_TIME));
        let server = Server::new(config, registry)
            .with_replication(Arc::clone(&log))
            .with_clock(clock);

        Self {
            server: Arc::new(server),
            backend,
            log,
            sink,
            _temp_dir: temp_dir,
        }
    }

    /// Opens a connection.
    pub fn connect(&self) -> Connection {
        self.server.connect()
    }

    /// Sends a request and decodes every response.
    pub fn send(&self, conn: &mut Connection, id: i64, request: &Request) -> Vec<Response> {
        conn.receive(&request.encode(id, &[]))
            .iter()
            .map(|frame| Response::decode(frame).expect("Server sent an undecodable frame").1)
            .collect()
    }

    /// Sends a request and returns the code of its single result.
    pub fn send_one(&self, conn: &mut Connection, id: i64, request: &Request) -> ResultCode {
        let responses = self.send(conn, id, request);
        assert_eq!(responses.len(), 1, "expected one response, got {responses:?}");
        responses[0].result().expect("Response carries no result").code
    }

    /// Flushes the log and returns the replicated records.
    ///
    /// Panics for a directory writing to a replog file.
    pub fn records(&self) -> Vec<ReplicationRecord> {
        self.log.flush().expect("Failed to flush replication log");
        self.sink
            .as_ref()
            .expect("Directory replicates to a file")
            .records()
    }

    /// The replog path, if replicating to a file.
    pub fn replog_path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join("slapd.replog"))
    }
}

impl Default for TestDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a test with a fresh directory and one connection.
pub fn with_directory<F, R>(f: F) -> R
where
    F: FnOnce(&TestDirectory, &mut Connection) -> R,
{
    let dir = TestDirectory::new();
    let mut conn = dir.connect();
    f(&dir, &mut conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{add_person, bind};
    use dirsrv_replog::ReplogReader;

    #[test]
    fn fixture_accepts_writes() {
        with_directory(|dir, conn| {
            assert_eq!(dir.send_one(conn, 1, &bind(ADMIN_DN, ADMIN_PASSWORD)), ResultCode::Success);
            let code = dir.send_one(conn, 2, &add_person("cn=foo,dc=example,dc=com"));
            assert_eq!(code, ResultCode::Success);
            assert_eq!(dir.records().len(), 1);
        });
    }

    #[test]
    fn fixture_with_replog() {
        let dir = TestDirectory::with_replog(&["replica.example.com:389"]);
        let mut conn = dir.connect();
        let code = dir.send_one(&mut conn, 1, &add_person("cn=foo,dc=example,dc=com"));
        assert_eq!(code, ResultCode::Success);
        dir.log.flush().unwrap();

        let path = dir.replog_path().unwrap();
        let entries: Vec<_> = ReplogReader::open(path).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].as_ref().unwrap().time, FIXED_TIME);
    }
}
