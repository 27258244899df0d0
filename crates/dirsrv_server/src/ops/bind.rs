//! The bind operation.

use super::{backend_controls, decode_controls};
use crate::error::{ServerError, ServerResult};
use crate::server::Server;
use dirsrv_core::{Dn, Operation};
use dirsrv_protocol::{Authentication, BindRequest, LdapMessage, LdapResult, ResultCode};
use tracing::{debug, info, trace};

const LDAP_VERSION3: i64 = 3;

/// Processes a bind. `bound` is the connection's identity; it is cleared
/// when the bind starts and set again only on success.
pub(crate) fn do_bind(
    server: &Server,
    message: &LdapMessage<'_>,
    op: &mut Operation,
    bound: &mut Option<Dn>,
) -> ServerResult<LdapResult> {
    trace!(conn = op.conn_id, op = op.message_id, "do_bind");

    let request = BindRequest::decode(message.op)?;
    decode_controls(message, op)?;
    *bound = None;

    if request.version != LDAP_VERSION3 {
        debug!(version = request.version, "do_bind: unsupported version");
        return Err(ServerError::protocol("requested protocol version not supported"));
    }

    let password = match request.authentication {
        Authentication::Simple(password) => password,
        Authentication::Sasl { ref mechanism, .. } => {
            debug!(mechanism = %mechanism, "do_bind: sasl not supported");
            return Err(ServerError::result(
                ResultCode::AuthMethodNotSupported,
                "SASL mechanisms not supported",
            ));
        }
        Authentication::Unsupported(ref tag) => {
            debug!(tag = %tag, "do_bind: unknown authentication choice");
            return Err(ServerError::result(
                ResultCode::AuthMethodNotSupported,
                "authentication method not supported",
            ));
        }
    };

    let dn = Dn::parse(&request.name).map_err(|err| {
        debug!(dn = %request.name, error = %err, "do_bind: invalid dn");
        ServerError::invalid_dn()
    })?;

    info!(
        "conn={} op={} BIND dn=\"{}\" method=simple",
        op.conn_id, op.message_id, dn
    );

    if dn.is_root() {
        if password.is_empty() {
            return Ok(LdapResult::success());
        }
        return Err(ServerError::result(ResultCode::InvalidCredentials, ""));
    }
    if password.is_empty() {
        return Err(ServerError::result(
            ResultCode::UnwillingToPerform,
            "unauthenticated bind not allowed",
        ));
    }

    let backend = server
        .registry()
        .select(&dn)
        .ok_or_else(|| ServerError::result(ResultCode::InvalidCredentials, ""))?;
    backend_controls(backend.as_ref(), op)?;
    backend.apply_bind(op, &dn, &password)?;

    *bound = Some(dn);
    Ok(LdapResult::success())
}
