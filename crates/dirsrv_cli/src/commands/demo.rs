//! Demo command implementation.
//!
//! Runs a fixed session against a writable `dc=example,dc=com` directory
//! and prints every response.

use dirsrv_core::{BackendConfig, BackendRegistry, Dn, Entry, InMemoryBackend, Modification};
use dirsrv_protocol::{
    BindRequest, Change, ModifyOperation, ModifyRequest, Request, Response, SearchRequest,
};
use dirsrv_replog::{MemorySink, ReplicationLog, ReplogConfig};
use dirsrv_server::{Server, ServerConfig};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const SUFFIX: &str = "dc=example,dc=com";
const ADMIN: &str = "cn=admin,dc=example,dc=com";
const ADMIN_PASSWORD: &str = "secret";

/// One response line of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Message id.
    pub message_id: i64,
    /// What was sent.
    pub request: String,
    /// Result code, or the DN of a search entry.
    pub outcome: String,
}

/// Runs the demo command.
pub fn run(replog: Option<&Path>, replicas: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ReplogConfig::new();
    for replica in replicas {
        config = config.with_replica(replica.clone());
    }

    let (log, sink) = match replog {
        Some(path) => (ReplicationLog::to_file(path, &config)?, None),
        None => {
            let sink = MemorySink::new();
            (ReplicationLog::new(sink.clone(), &config)?, Some(sink))
        }
    };
    let log = Arc::new(log);

    let steps = session(Arc::clone(&log))?;
    for step in &steps {
        println!("[{:>2}] {:32} -> {}", step.message_id, step.request, step.outcome);
    }

    log.flush()?;
    let stats = log.stats();
    println!();
    println!(
        "replication: submitted={} skipped={} written={} failed={} dropped={}",
        stats.submitted(),
        stats.skipped(),
        stats.written(),
        stats.failed(),
        stats.dropped()
    );
    match (replog, sink) {
        (Some(path), _) => println!("replog written to {}", path.display()),
        (None, Some(sink)) => println!("{} records held in memory", sink.len()),
        (None, None) => {}
    }
    log.shutdown();
    Ok(())
}

/// Builds the directory and plays the scripted requests against it.
pub fn session(log: Arc<ReplicationLog>) -> Result<Vec<Step>, Box<dyn std::error::Error>> {
    let backend = InMemoryBackend::new(BackendConfig::new("example").with_suffix(SUFFIX))?;
    backend.load(seed(SUFFIX, &[("objectClass", "domain"), ("dc", "example")])?);
    backend.load(seed(
        ADMIN,
        &[("objectClass", "person"), ("cn", "admin"), ("sn", "admin"), ("userPassword", ADMIN_PASSWORD)],
    )?);

    let mut registry = BackendRegistry::new();
    registry.register(Arc::new(backend))?;
    let server = Arc::new(
        Server::new(
            ServerConfig::default().with_default_referral("ldap://root.example.org"),
            registry,
        )
        .with_replication(log),
    );
    info!(suffix = SUFFIX, "demo directory ready");

    let foo = format!("cn=foo,{SUFFIX}");
    let script = vec![
        ("bind admin", Request::Bind(BindRequest::simple(ADMIN, ADMIN_PASSWORD.as_bytes()))),
        (
            "add cn=foo",
            Request::Add {
                name: foo.clone(),
                attributes: vec![
                    ("objectClass".into(), vec![b"person".to_vec()]),
                    ("cn".into(), vec![b"foo".to_vec()]),
                    ("sn".into(), vec![b"bar".to_vec()]),
                ],
            },
        ),
        (
            "add cn=foo again",
            Request::Add {
                name: foo.clone(),
                attributes: vec![("cn".into(), vec![b"foo".to_vec()])],
            },
        ),
        (
            "modify cn=foo",
            Request::Modify(ModifyRequest {
                object: foo.clone(),
                changes: vec![Change::new(
                    ModifyOperation::Add,
                    "mail",
                    vec![b"foo@example.com".to_vec()],
                )],
            }),
        ),
        ("search subtree", Request::Search(SearchRequest::subtree(SUFFIX))),
        ("delete cn=foo", Request::Delete(foo)),
        ("delete outside suffix", Request::Delete("cn=bar,o=elsewhere".into())),
        ("unbind", Request::Unbind),
    ];

    let mut conn = server.connect();
    let mut steps = Vec::new();
    for (id, (label, request)) in (1..).zip(script) {
        for frame in conn.receive(&request.encode(id, &[])) {
            let (message_id, response) = Response::decode(&frame)?;
            let outcome = match (&response, response.result()) {
                (Response::SearchEntry(entry), _) => format!("entry {}", entry.dn),
                (_, Some(result)) => result.code.to_string(),
                (_, None) => "-".to_string(),
            };
            steps.push(Step {
                message_id,
                request: label.to_string(),
                outcome,
            });
        }
    }
    Ok(steps)
}

fn seed(dn: &str, attrs: &[(&str, &str)]) -> Result<Entry, Box<dyn std::error::Error>> {
    let mods = attrs
        .iter()
        .map(|(t, v)| Modification::add(*t, vec![v.as_bytes().to_vec()]))
        .collect();
    Ok(Entry::from_modifications(Dn::parse(dn)?, mods)?)
}
