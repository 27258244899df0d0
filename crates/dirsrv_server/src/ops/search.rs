//! The search operation.

use super::{backend_controls, decode_controls, select_backend};
use crate::error::{ServerError, ServerResult};
use crate::server::Server;
use dirsrv_core::{Operation, SearchParams};
use dirsrv_protocol::{LdapMessage, LdapResult, ResultCode, SearchRequest, SearchResultEntry};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Entries to send followed by the final result.
pub(crate) type SearchOutcome = (Vec<SearchResultEntry>, LdapResult);

pub(crate) fn do_search(
    server: &Server,
    message: &LdapMessage<'_>,
    op: &mut Operation,
) -> ServerResult<SearchOutcome> {
    trace!(conn = op.conn_id, op = op.message_id, "do_search");
    let started = Instant::now();

    let request = SearchRequest::decode(message.op)?;
    let params = SearchParams::from_request(request).map_err(|err| {
        debug!(error = %err, "do_search: invalid base dn");
        ServerError::invalid_dn()
    })?;
    debug!(
        base = %params.base,
        scope = ?params.scope,
        size_limit = params.size_limit,
        attributes = ?params.attributes,
        "do_search"
    );

    decode_controls(message, op)?;

    info!(
        "conn={} op={} SRCH base=\"{}\" scope={:?}",
        op.conn_id, op.message_id, params.base, params.scope
    );

    let backend = select_backend(server, &params.base)?;
    backend_controls(backend.as_ref(), op)?;

    let found = backend.apply_search(op, &params)?;
    let deadline = (params.time_limit > 0)
        .then(|| started.checked_add(Duration::from_secs(params.time_limit)))
        .flatten();

    let mut entries = Vec::new();
    for entry in &found {
        if params.size_limit > 0 && entries.len() == params.size_limit {
            return Ok((entries, LdapResult::new(ResultCode::SizeLimitExceeded, "")));
        }
        if deadline.is_some_and(|d| Instant::now() > d) {
            return Ok((entries, LdapResult::new(ResultCode::TimeLimitExceeded, "")));
        }
        entries.push(params.project(entry));
    }

    info!(
        "conn={} op={} SEARCH RESULT nentries={}",
        op.conn_id,
        op.message_id,
        entries.len()
    );
    Ok((entries, LdapResult::success()))
}
