//! Property tests across the whole pipeline.

use dirsrv_core::Dn;
use dirsrv_protocol::{Request, Response, ResultCode};
use dirsrv_testkit::prelude::*;
use proptest::prelude::*;

fn target_dn(request: &Request) -> Option<Dn> {
    let raw = match request {
        Request::Add { name, .. } => name,
        Request::Modify(modify) => &modify.object,
        Request::Delete(dn) => dn,
        _ => return None,
    };
    Dn::parse(raw).ok()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_request_is_answered_and_unlocked(
        requests in prop::collection::vec(request_strategy(), 1..12)
    ) {
        let dir = TestDirectory::new();
        let mut conn = dir.connect();

        for (id, request) in (1..).zip(&requests) {
            let responses = dir.send(&mut conn, id, request);
            match request {
                Request::Abandon(_) => prop_assert!(responses.is_empty()),
                Request::Search(_) => {
                    let last = responses.last();
                    prop_assert!(matches!(last, Some(Response::SearchDone(_))), "{responses:?}");
                }
                _ => prop_assert_eq!(responses.len(), 1),
            }
            prop_assert!(!conn.is_closed());
            if let Some(dn) = target_dn(request) {
                prop_assert!(!dir.backend.is_locked(&dn));
            }
        }

        let sequences: Vec<u64> = dir.records().iter().map(|r| r.sequence).collect();
        let expected: Vec<u64> = (1..=dir.backend.last_sequence()).collect();
        prop_assert_eq!(sequences, expected);
    }

    #[test]
    fn added_entries_are_searchable(dn in dn_under_suffix_strategy()) {
        prop_assume!(Dn::parse(&dn).unwrap() != Dn::parse(ADMIN_DN).unwrap());
        let dir = TestDirectory::new();
        let mut conn = dir.connect();

        let code = dir.send_one(&mut conn, 1, &add_person(&dn));
        prop_assert_eq!(code, ResultCode::Success);

        let responses = dir.send(&mut conn, 2, &search_subtree(&dn, 0));
        prop_assert_eq!(responses.len(), 2);
        match &responses[0] {
            Response::SearchEntry(entry) => {
                prop_assert_eq!(entry.values("createTimestamp"), None);
                prop_assert!(entry.values("cn").is_some());
            }
            other => prop_assert!(false, "expected an entry, got {:?}", other),
        }
    }

    #[test]
    fn decoders_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        fuzz_ber_decode(&bytes);
        fuzz_message_decode(&bytes);
        fuzz_frame_buffer(&bytes);
        fuzz_replog_reader(&bytes);
    }

    #[test]
    fn connections_survive_arbitrary_input(bytes in frame_like_strategy()) {
        fuzz_connection(&bytes);
    }
}

#[test]
fn framing_error_closes_with_notice() {
    let dir = TestDirectory::new();
    let mut conn = dir.connect();

    let replies = conn.receive(&[0x30, 0x03, 0x04, 0x01, 0x00]);
    assert_eq!(replies.len(), 1);
    assert!(dirsrv_protocol::response::is_notice_of_disconnection(&replies[0]));
    assert!(conn.is_closed());

    let mut other = dir.connect();
    assert_eq!(
        dir.send_one(&mut other, 1, &add_person("cn=ok,dc=example,dc=com")),
        ResultCode::Success
    );
}
