//! Operation handlers.
//!
//! Every handler decodes its own request grammar from the raw protocolOp
//! element. Writes share one shape: select the backend, pass the control
//! check and the write policy gate, apply, then hand the change to the
//! replication log while the backend's write lock is still held.

pub(crate) mod add;
pub(crate) mod bind;
pub(crate) mod delete;
pub(crate) mod modify;
pub(crate) mod search;

use crate::error::{ServerError, ServerResult};
use crate::server::Server;
use dirsrv_core::operational::modifier_name;
use dirsrv_core::{check_controls, Backend, Commit, Dn, Operation};
use dirsrv_protocol::request::abandon_id;
use dirsrv_protocol::LdapMessage;
use dirsrv_replog::{Change, ReplicationRecord};
use std::sync::Arc;
use tracing::{debug, warn};

/// Finds the backend holding `dn`, or refers the client elsewhere.
pub(crate) fn select_backend(server: &Server, dn: &Dn) -> ServerResult<Arc<dyn Backend>> {
    server.registry().select(dn).ok_or_else(|| {
        debug!(dn = %dn, "no backend, sending default referral");
        ServerError::referral(server.config().default_referrals.clone())
    })
}

/// Decodes the request controls into the operation.
pub(crate) fn decode_controls(message: &LdapMessage<'_>, op: &mut Operation) -> ServerResult<()> {
    op.controls = message.controls()?;
    Ok(())
}

/// Rejects critical controls the backend does not support.
pub(crate) fn backend_controls(backend: &dyn Backend, op: &Operation) -> ServerResult<()> {
    check_controls(backend, &op.controls)?;
    Ok(())
}

/// Hands a committed change to the replication log.
///
/// `None` submits a skip for the commit. Failures are logged and never
/// reach the client.
pub(crate) fn replicate(
    server: &Server,
    op: &Operation,
    backend: &dyn Backend,
    commit: Commit,
    dn: &Dn,
    change: Option<Change>,
) {
    let Some(log) = server.replication() else {
        return;
    };
    let submitted = match change {
        Some(change) => {
            let record = ReplicationRecord::new(backend.id(), commit.sequence, dn.as_str(), change)
                .with_identity(modifier_name(
                    op.bound_dn(),
                    &server.config().anonymous_marker,
                ))
                .with_time(server.clock().now().timestamp());
            log.submit(record)
        }
        None => log.skip(backend.id(), commit.sequence),
    };
    if let Err(err) = submitted {
        warn!(
            conn = op.conn_id,
            op = op.message_id,
            backend = backend.id(),
            sequence = commit.sequence,
            error = %err,
            "replication enqueue failed"
        );
    }
}

/// Abandon: the id is decoded and otherwise ignored.
pub(crate) fn do_abandon(message: &LdapMessage<'_>, op: &Operation) -> ServerResult<()> {
    let id = abandon_id(message.op)?;
    debug!(conn = op.conn_id, op = op.message_id, abandon = id, "abandon ignored");
    Ok(())
}
