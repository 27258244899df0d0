//! Fuzz testing harnesses for dirsrv.
//!
//! This module provides fuzz targets that can be used with cargo-fuzz
//! or other fuzzing frameworks. Every target must return normally for
//! any input.

use crate::fixtures::TestDirectory;
use dirsrv_codec::{BerReader, Element};
use dirsrv_protocol::request::{abandon_id, delete_dn};
use dirsrv_protocol::{
    AddRequest, BindRequest, FrameBuffer, LdapMessage, ModifyRequest, OperationKind, Response,
    SearchRequest,
};
use dirsrv_replog::ReplogReader;

const MAX_DEPTH: usize = 32;

/// Fuzz target for BER decoding.
///
/// Walks every element, descending into constructed ones.
pub fn fuzz_ber_decode(data: &[u8]) {
    let mut reader = BerReader::new(data);
    walk(&mut reader, 0);
}

fn walk(reader: &mut BerReader<'_>, depth: usize) {
    while !reader.is_empty() {
        let Ok(element) = reader.read_element() else {
            return;
        };
        if element.tag().constructed && depth < MAX_DEPTH {
            if let Ok(mut inner) = element.reader() {
                walk(&mut inner, depth + 1);
            }
        } else {
            let _ = element.as_integer();
            let _ = element.as_str();
        }
    }
}

/// Fuzz target for LDAP message decoding.
///
/// Decodes the envelope, the controls and the request grammar, and tries
/// the bytes as a response.
pub fn fuzz_message_decode(data: &[u8]) {
    let _ = Response::decode(data);
    let Ok(message) = LdapMessage::decode(data) else {
        return;
    };
    let _ = message.controls();
    decode_request(message.kind, message.op);
}

fn decode_request(kind: OperationKind, op: Element<'_>) {
    match kind {
        OperationKind::Add => {
            if let Ok(request) = AddRequest::decode(op) {
                if let Ok(attributes) = request.attributes() {
                    attributes.for_each(drop);
                }
            }
        }
        OperationKind::Modify => {
            let _ = ModifyRequest::decode(op);
        }
        OperationKind::Delete => {
            let _ = delete_dn(op);
        }
        OperationKind::Search => {
            let _ = SearchRequest::decode(op);
        }
        OperationKind::Bind => {
            let _ = BindRequest::decode(op);
        }
        OperationKind::Abandon => {
            let _ = abandon_id(op);
        }
        _ => {}
    }
}

/// Fuzz target for frame splitting.
///
/// Feeds the input in chunks whose sizes come from the input itself.
pub fn fuzz_frame_buffer(data: &[u8]) {
    let mut frames = FrameBuffer::new(4096);
    let mut rest = data;
    while let Some((&size, tail)) = rest.split_first() {
        let take = (size as usize % 17).min(tail.len());
        let (chunk, next) = tail.split_at(take);
        frames.extend(chunk);
        loop {
            match frames.next_frame() {
                Ok(Some(frame)) => fuzz_message_decode(&frame),
                Ok(None) => break,
                Err(_) => return,
            }
        }
        rest = next;
    }
}

/// Fuzz target for a server connection.
///
/// Feeds arbitrary bytes to a fixture connection and checks that a
/// closed connection stays silent.
pub fn fuzz_connection(data: &[u8]) {
    let dir = TestDirectory::new();
    let mut conn = dir.connect();
    for chunk in data.chunks(64) {
        let was_closed = conn.is_closed();
        let replies = conn.receive(chunk);
        assert!(
            !was_closed || replies.is_empty(),
            "closed connection answered"
        );
    }
}

/// Fuzz target for the replog reader.
pub fn fuzz_replog_reader(data: &[u8]) {
    let reader = ReplogReader::new(data);
    for entry in reader.take(1024) {
        if entry.is_err() {
            break;
        }
    }
}
