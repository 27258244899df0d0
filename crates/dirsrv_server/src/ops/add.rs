//! The add operation.
//!
//! ```text
//! DecodeFrame -> NormalizeDN -> CollectAttributes -> CheckProtocolControls
//!   -> SelectBackend -> CheckWritePolicy -> BuildModifications
//!   -> StampOperationalAttrs -> MergeIntoEntry -> BackendApply
//!   -> ReplicationEnqueue -> SendResult
//! ```
//!
//! Every state either advances or ends the operation with a result.

use super::{backend_controls, decode_controls, replicate, select_backend};
use crate::error::{ServerError, ServerResult};
use crate::policy::{check_write, lastmod_enabled};
use crate::server::Server;
use dirsrv_core::operational::check_user_modifications;
use dirsrv_core::{Dn, Entry, Modification, Operation, ReleaseGuard, Stamp};
use dirsrv_protocol::{AddRequest, LdapMessage, LdapResult};
use dirsrv_replog::Change;
use tracing::{debug, info, trace};

pub(crate) fn do_add(
    server: &Server,
    message: &LdapMessage<'_>,
    op: &mut Operation,
) -> ServerResult<LdapResult> {
    trace!(conn = op.conn_id, op = op.message_id, "do_add");

    let request = AddRequest::decode(message.op)?;
    let dn = Dn::parse(request.name).map_err(|err| {
        debug!(dn = request.name, error = %err, "do_add: invalid dn");
        ServerError::invalid_dn()
    })?;
    debug!(ndn = %dn, "do_add");

    let mut mods = Vec::new();
    for attribute in request.attributes()? {
        let attribute = attribute?;
        if attribute.values.is_empty() {
            debug!(attr_type = attribute.attr_type, "no values for type");
            return Err(ServerError::protocol("no values for attribute type"));
        }
        mods.push(Modification::add(
            attribute.attr_type,
            attribute.values.iter().map(|v| v.to_vec()).collect(),
        ));
    }

    decode_controls(message, op)?;

    if mods.is_empty() {
        return Err(ServerError::protocol("no attributes provided"));
    }

    info!("conn={} op={} ADD dn=\"{}\"", op.conn_id, op.message_id, dn);

    let backend = select_backend(server, &dn)?;
    backend_controls(backend.as_ref(), op)?;
    let authority = check_write(server.config(), backend.as_ref(), op)?;

    if authority.replicates() && lastmod_enabled(server.config(), backend.as_ref()) {
        check_user_modifications(&mods)?;
        Stamp::new(op.bound_dn(), &server.config().anonymous_marker, server.clock())
            .add_to_entry_mods(&mut mods);
    }

    let entry = Entry::from_modifications(dn.clone(), mods)?;
    let change = (authority.replicates() && server.replication().is_some())
        .then(|| Change::Add(entry.clone()));

    let commit = backend.apply_add(op, entry)?;
    let _release = ReleaseGuard::new(backend.as_ref(), &dn);
    replicate(server, op, backend.as_ref(), commit, &dn, change);

    Ok(LdapResult::success())
}
