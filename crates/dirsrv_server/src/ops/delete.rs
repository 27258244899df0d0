//! The delete operation.

use super::{backend_controls, decode_controls, replicate, select_backend};
use crate::error::{ServerError, ServerResult};
use crate::policy::check_write;
use crate::server::Server;
use dirsrv_core::{Dn, Operation, ReleaseGuard};
use dirsrv_protocol::request::delete_dn;
use dirsrv_protocol::{LdapMessage, LdapResult};
use dirsrv_replog::Change;
use tracing::{debug, info, trace};

pub(crate) fn do_delete(
    server: &Server,
    message: &LdapMessage<'_>,
    op: &mut Operation,
) -> ServerResult<LdapResult> {
    trace!(conn = op.conn_id, op = op.message_id, "do_delete");

    let raw = delete_dn(message.op)?;
    let dn = Dn::parse(raw).map_err(|err| {
        debug!(dn = raw, error = %err, "do_delete: invalid dn");
        ServerError::invalid_dn()
    })?;

    decode_controls(message, op)?;

    info!("conn={} op={} DEL dn=\"{}\"", op.conn_id, op.message_id, dn);

    let backend = select_backend(server, &dn)?;
    backend_controls(backend.as_ref(), op)?;
    let authority = check_write(server.config(), backend.as_ref(), op)?;

    let commit = backend.apply_delete(op, &dn)?;
    let _release = ReleaseGuard::new(backend.as_ref(), &dn);
    let change = authority.replicates().then_some(Change::Delete);
    replicate(server, op, backend.as_ref(), commit, &dn, change);

    Ok(LdapResult::success())
}
