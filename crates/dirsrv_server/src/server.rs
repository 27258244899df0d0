//! The directory server.

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::{ServerError, ServerResult};
use crate::ops;
use dirsrv_core::{BackendRegistry, Clock, Dn, Operation, SystemClock};
use dirsrv_protocol::{LdapMessage, LdapResult, OperationKind, Response, ResultCode};
use dirsrv_replog::ReplicationLog;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// What a processed frame produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Message id the responses answer.
    pub message_id: i64,
    /// Responses in sending order; empty for unbind and abandon.
    pub responses: Vec<Response>,
    /// The client asked to close the connection.
    pub close: bool,
}

impl Outcome {
    fn respond(message_id: i64, responses: Vec<Response>) -> Self {
        Self {
            message_id,
            responses,
            close: false,
        }
    }

    /// Encodes the responses as frames.
    pub fn encode(&self) -> Vec<Vec<u8>> {
        self.responses
            .iter()
            .map(|r| r.encode(self.message_id))
            .collect()
    }
}

/// The directory server: backends, replication and configuration shared by
/// every connection.
///
/// # Example
///
/// ```
/// use dirsrv_core::BackendRegistry;
/// use dirsrv_protocol::{Request, Response, ResultCode};
/// use dirsrv_server::{Server, ServerConfig};
/// use std::sync::Arc;
///
/// let server = Arc::new(Server::new(ServerConfig::default(), BackendRegistry::new()));
/// let mut conn = server.connect();
///
/// let frame = Request::Delete("cn=foo,dc=example,dc=com".into()).encode(1, &[]);
/// let replies = conn.receive(&frame);
/// let (_, response) = Response::decode(&replies[0]).unwrap();
/// assert_eq!(response.result().unwrap().code, ResultCode::Referral);
/// ```
pub struct Server {
    config: ServerConfig,
    registry: BackendRegistry,
    replication: Option<Arc<ReplicationLog>>,
    clock: Arc<dyn Clock>,
    next_connection: AtomicU64,
}

impl Server {
    /// Creates a server without replication.
    pub fn new(config: ServerConfig, registry: BackendRegistry) -> Self {
        Self {
            config,
            registry,
            replication: None,
            clock: Arc::new(SystemClock),
            next_connection: AtomicU64::new(0),
        }
    }

    /// Writes successful changes to a replication log.
    pub fn with_replication(mut self, log: Arc<ReplicationLog>) -> Self {
        self.replication = Some(log);
        self
    }

    /// Replaces the clock used for timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Registered backends.
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// The replication log, if any.
    pub fn replication(&self) -> Option<&ReplicationLog> {
        self.replication.as_deref()
    }

    /// The clock used for timestamps.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Opens a connection.
    pub fn connect(self: &Arc<Self>) -> Connection {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        Connection::new(id, Arc::clone(self))
    }

    /// Processes one complete LDAPMessage frame.
    ///
    /// `bound` is the connection's identity; a bind updates it. A framing
    /// error is returned as [`ServerError::Framing`] and produces no response.
    pub fn process(
        &self,
        conn_id: u64,
        bound: &mut Option<Dn>,
        frame: &[u8],
    ) -> ServerResult<Outcome> {
        let message = LdapMessage::decode(frame)?;
        let id = message.message_id;
        let kind = message.kind;
        let mut op = Operation::new(conn_id, id, kind).with_bound(bound.clone());
        debug!(conn = conn_id, op = id, kind = kind.name(), "operation");

        let outcome = match kind {
            OperationKind::Add => final_result(kind, ops::add::do_add(self, &message, &mut op))?,
            OperationKind::Modify => {
                final_result(kind, ops::modify::do_modify(self, &message, &mut op))?
            }
            OperationKind::Delete => {
                final_result(kind, ops::delete::do_delete(self, &message, &mut op))?
            }
            OperationKind::Bind => {
                final_result(kind, ops::bind::do_bind(self, &message, &mut op, bound))?
            }
            OperationKind::Search => match ops::search::do_search(self, &message, &mut op) {
                Ok((entries, done)) => entries
                    .into_iter()
                    .map(Response::SearchEntry)
                    .chain(std::iter::once(Response::SearchDone(done)))
                    .collect(),
                Err(err) => final_result(kind, Err(err))?,
            },
            OperationKind::Unbind => {
                debug!(conn = conn_id, "unbind");
                return Ok(Outcome {
                    message_id: id,
                    responses: Vec::new(),
                    close: true,
                });
            }
            OperationKind::Abandon => {
                ops::do_abandon(&message, &op)?;
                Vec::new()
            }
            OperationKind::ModifyDn | OperationKind::Compare | OperationKind::Extended => {
                debug!(conn = conn_id, op = id, kind = kind.name(), "operation not supported");
                let result = LdapResult::new(ResultCode::UnwillingToPerform, "operation not supported");
                Response::for_kind(kind, result).into_iter().collect()
            }
        };
        Ok(Outcome::respond(id, outcome))
    }
}

/// Turns a handler result into the responses for `kind`, passing framing
/// errors through.
fn final_result(kind: OperationKind, result: ServerResult<LdapResult>) -> ServerResult<Vec<Response>> {
    let result = match result {
        Ok(result) => result,
        Err(ServerError::Operation(result)) => result,
        Err(framing) => return Err(framing),
    };
    Ok(Response::for_kind(kind, result).into_iter().collect())
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("backends", &self.registry.backends().len())
            .field("replication", &self.replication.is_some())
            .finish_non_exhaustive()
    }
}
