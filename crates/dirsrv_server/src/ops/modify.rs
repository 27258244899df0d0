//! The modify operation.

use super::{backend_controls, decode_controls, replicate, select_backend};
use crate::error::{ServerError, ServerResult};
use crate::policy::{check_write, lastmod_enabled};
use crate::server::Server;
use dirsrv_core::operational::check_user_modifications;
use dirsrv_core::{Dn, Modification, ModifyOperation, Operation, ReleaseGuard, Stamp};
use dirsrv_protocol::{LdapMessage, LdapResult, ModifyRequest};
use dirsrv_replog::Change;
use tracing::{debug, info, trace};

pub(crate) fn do_modify(
    server: &Server,
    message: &LdapMessage<'_>,
    op: &mut Operation,
) -> ServerResult<LdapResult> {
    trace!(conn = op.conn_id, op = op.message_id, "do_modify");

    let request = ModifyRequest::decode(message.op)?;
    let dn = Dn::parse(&request.object).map_err(|err| {
        debug!(dn = %request.object, error = %err, "do_modify: invalid dn");
        ServerError::invalid_dn()
    })?;
    debug!(ndn = %dn, changes = request.changes.len(), "do_modify");

    let mut mods = Vec::with_capacity(request.changes.len());
    for change in request.changes {
        if change.operation == ModifyOperation::Add && change.values.is_empty() {
            return Err(ServerError::protocol("no values for attribute type"));
        }
        mods.push(Modification::from(change));
    }

    decode_controls(message, op)?;

    info!("conn={} op={} MOD dn=\"{}\"", op.conn_id, op.message_id, dn);

    let backend = select_backend(server, &dn)?;
    backend_controls(backend.as_ref(), op)?;
    let authority = check_write(server.config(), backend.as_ref(), op)?;

    if authority.replicates() && lastmod_enabled(server.config(), backend.as_ref()) {
        check_user_modifications(&mods)?;
        Stamp::new(op.bound_dn(), &server.config().anonymous_marker, server.clock())
            .add_to_modify_mods(&mut mods);
    }

    let commit = backend.apply_modify(op, &dn, &mods)?;
    let _release = ReleaseGuard::new(backend.as_ref(), &dn);
    let change = authority.replicates().then_some(Change::Modify(mods));
    replicate(server, op, backend.as_ref(), commit, &dn, change);

    Ok(LdapResult::success())
}
