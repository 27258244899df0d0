//! Integration tests for the registry and the in-memory backend.

use dirsrv_core::operational::{CREATE_TIMESTAMP, CREATORS_NAME, MODIFIERS_NAME};
use dirsrv_core::{
    Backend, BackendConfig, BackendRegistry, Dn, Entry, FixedClock, InMemoryBackend,
    Modification, Operation, ReleaseGuard, SearchParams, Stamp,
};
use dirsrv_protocol::{Filter, OperationKind, ResultCode};
use std::sync::Arc;

fn dn(s: &str) -> Dn {
    Dn::parse(s).unwrap()
}

fn seeded(id: &str, suffix: &str, rdn: (&str, &str)) -> Arc<InMemoryBackend> {
    let backend = InMemoryBackend::new(BackendConfig::new(id).with_suffix(suffix)).unwrap();
    backend.load(
        Entry::from_modifications(
            dn(suffix),
            vec![Modification::add(rdn.0, vec![rdn.1.as_bytes().to_vec()])],
        )
        .unwrap(),
    );
    Arc::new(backend)
}

#[test]
fn add_through_selected_backend_with_stamp() {
    let example = seeded("example", "dc=example,dc=com", ("dc", "example"));
    let people = seeded("people", "ou=people,dc=example,dc=com", ("ou", "people"));

    let mut registry = BackendRegistry::new();
    registry.register(example.clone()).unwrap();
    registry.register(people.clone()).unwrap();

    let target = dn("cn=Alice,OU=People,dc=example,dc=com");
    let backend = registry.select(&target).unwrap();
    assert_eq!(backend.id(), "people");

    let operator = dn("cn=admin,dc=example,dc=com");
    let op = Operation::new(7, 2, OperationKind::Add).with_bound(Some(operator));
    let clock = FixedClock::at_unix(1_700_000_000);
    let stamp = Stamp::new(op.bound_dn(), "<anonymous>", &clock);

    let mut mods = vec![
        Modification::add("cn", vec![b"Alice".to_vec()]),
        Modification::add("sn", vec![b"Liddell".to_vec()]),
    ];
    stamp.add_to_entry_mods(&mut mods);
    let entry = Entry::from_modifications(target.clone(), mods).unwrap();

    let commit = backend.apply_add(&op, entry).unwrap();
    {
        let _guard = ReleaseGuard::new(backend.as_ref(), &target);
    }
    assert_eq!(commit.sequence, 1);
    assert_eq!(example.last_sequence(), 0);

    let stored = people.get(&target).unwrap();
    assert_eq!(
        stored.get(CREATORS_NAME).unwrap().first_str(),
        Some("cn=admin,dc=example,dc=com")
    );
    assert_eq!(
        stored.get(CREATE_TIMESTAMP).unwrap().first_str(),
        Some("20231114221320Z")
    );
    assert!(!people.is_locked(&target));
}

#[test]
fn modify_then_search() {
    let backend = seeded("example", "dc=example,dc=com", ("dc", "example"));
    let op = Operation::new(1, 1, OperationKind::Add);
    let target = dn("cn=bob,dc=example,dc=com");
    backend
        .apply_add(
            &op,
            Entry::from_modifications(
                target.clone(),
                vec![
                    Modification::add("cn", vec![b"bob".to_vec()]),
                    Modification::add("mail", vec![b"bob@example.com".to_vec()]),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    backend.release(&target);

    let op = Operation::new(1, 2, OperationKind::Modify);
    let clock = FixedClock::at_unix(0);
    let mut mods = vec![Modification::replace_one("mail", "robert@example.com")];
    Stamp::new(None, "<anonymous>", &clock).add_to_modify_mods(&mut mods);
    let commit = backend.apply_modify(&op, &target, &mods).unwrap();
    backend.release(&target);
    assert_eq!(commit.sequence, 2);

    let mut params = SearchParams::subtree(dn("dc=example,dc=com"));
    params.filter = Filter::equality("mail", "Robert@Example.com");
    let found = backend
        .apply_search(&Operation::new(1, 3, OperationKind::Search), &params)
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].get(MODIFIERS_NAME).unwrap().first_str(),
        Some("<anonymous>")
    );

    let err = backend
        .apply_modify(&op, &target, &[Modification::delete("cn", vec![b"bob".to_vec()])])
        .unwrap_err();
    assert_eq!(err.code, ResultCode::NotAllowedOnRdn);
    assert!(!backend.is_locked(&target));
}
