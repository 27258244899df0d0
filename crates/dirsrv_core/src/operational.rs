//! Operational attributes and timestamps.

use crate::attribute::base_type;
use crate::dn::Dn;
use crate::error::EntryError;
use crate::modification::Modification;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// `creatorsName`
pub const CREATORS_NAME: &str = "creatorsName";
/// `createTimestamp`
pub const CREATE_TIMESTAMP: &str = "createTimestamp";
/// `modifiersName`
pub const MODIFIERS_NAME: &str = "modifiersName";
/// `modifyTimestamp`
pub const MODIFY_TIMESTAMP: &str = "modifyTimestamp";

/// Attribute types clients may never supply.
pub const NO_USER_MODIFICATION: &[&str] = &[
    CREATORS_NAME,
    CREATE_TIMESTAMP,
    MODIFIERS_NAME,
    MODIFY_TIMESTAMP,
    "subschemaSubentry",
    "entryDN",
    "hasSubordinates",
];

/// Name recorded for changes made by an unauthenticated client.
pub const ANONYMOUS: &str = "<anonymous>";

/// Serializes calendar conversions process-wide.
static CALENDAR_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// True if `attr_type` (options ignored) is a no-user-modification type.
pub fn is_no_user_modification(attr_type: &str) -> bool {
    let base = base_type(attr_type);
    NO_USER_MODIFICATION
        .iter()
        .any(|t| t.eq_ignore_ascii_case(base))
}

/// True for the operational types returned only on request.
pub fn is_operational(attr_type: &str) -> bool {
    is_no_user_modification(attr_type)
}

/// Fails on the first modification that touches a no-user-modification type.
pub fn check_user_modifications(mods: &[Modification]) -> Result<(), EntryError> {
    match mods.iter().find(|m| is_no_user_modification(&m.attr_type)) {
        Some(m) => Err(EntryError::NoUserModification {
            attr_type: m.attr_type.clone(),
        }),
        None => Ok(()),
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// A fixed clock at the given unix time.
    pub fn at_unix(seconds: i64) -> Self {
        Self(DateTime::from_timestamp(seconds, 0).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Formats an instant as GeneralizedTime, `YYYYMMDDHHMMSSZ`.
///
/// The conversion runs under a process-wide lock held only for the call.
pub fn generalized_time(instant: DateTime<Utc>) -> String {
    let _calendar = CALENDAR_LOCK.lock();
    instant.format("%Y%m%d%H%M%SZ").to_string()
}

/// Who an operational stamp names.
pub fn modifier_name(bound: Option<&Dn>, anonymous: &str) -> String {
    match bound {
        Some(dn) if !dn.is_root() => dn.raw().to_string(),
        _ => anonymous.to_string(),
    }
}

/// Values stamped on a new or changed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    /// Name of the modifier, or the anonymous marker.
    pub name: String,
    /// GeneralizedTime of the change.
    pub timestamp: String,
}

impl Stamp {
    /// Captures the modifier and the time.
    pub fn new(bound: Option<&Dn>, anonymous: &str, clock: &dyn Clock) -> Self {
        Self {
            name: modifier_name(bound, anonymous),
            timestamp: generalized_time(clock.now()),
        }
    }

    /// Appends the creator/modifier attributes of a new entry.
    pub fn add_to_entry_mods(&self, mods: &mut Vec<Modification>) {
        mods.push(Modification::add(CREATORS_NAME, vec![self.name.clone().into_bytes()]));
        mods.push(Modification::add(MODIFIERS_NAME, vec![self.name.clone().into_bytes()]));
        mods.push(Modification::add(
            CREATE_TIMESTAMP,
            vec![self.timestamp.clone().into_bytes()],
        ));
        mods.push(Modification::add(
            MODIFY_TIMESTAMP,
            vec![self.timestamp.clone().into_bytes()],
        ));
    }

    /// Appends the modifier attributes of a modify request.
    pub fn add_to_modify_mods(&self, mods: &mut Vec<Modification>) {
        mods.push(Modification::replace_one(MODIFIERS_NAME, self.name.clone()));
        mods.push(Modification::replace_one(MODIFY_TIMESTAMP, self.timestamp.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generalized_time_format() {
        let clock = FixedClock::at_unix(1_700_000_000);
        assert_eq!(generalized_time(clock.now()), "20231114221320Z");
    }

    #[test]
    fn generalized_time_from_many_threads() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || generalized_time(FixedClock::at_unix(i * 86_400).now()))
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let expected = format!("197001{:02}000000Z", i + 1);
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn no_user_modification_ignores_case_and_options() {
        assert!(is_no_user_modification("CREATORSNAME"));
        assert!(is_no_user_modification("modifyTimestamp;x-foo"));
        assert!(!is_no_user_modification("cn"));
    }

    #[test]
    fn check_finds_type_in_any_position() {
        let mods = vec![
            Modification::add("cn", vec![b"foo".to_vec()]),
            Modification::add("objectClass", vec![b"top".to_vec()]),
            Modification::add("createTimestamp", vec![b"19700101000000Z".to_vec()]),
        ];
        assert!(matches!(
            check_user_modifications(&mods),
            Err(EntryError::NoUserModification { .. })
        ));
        assert!(check_user_modifications(&mods[..2]).is_ok());
    }

    #[test]
    fn stamp_names_bound_dn_or_anonymous() {
        let clock = FixedClock::at_unix(0);
        let dn = Dn::parse("cn=Admin,dc=example,dc=com").unwrap();
        assert_eq!(Stamp::new(Some(&dn), ANONYMOUS, &clock).name, "cn=Admin,dc=example,dc=com");
        assert_eq!(Stamp::new(None, ANONYMOUS, &clock).name, "<anonymous>");
        assert_eq!(Stamp::new(Some(&Dn::root()), ANONYMOUS, &clock).name, "<anonymous>");

        let mut mods = Vec::new();
        Stamp::new(None, ANONYMOUS, &clock).add_to_entry_mods(&mut mods);
        assert_eq!(mods.len(), 4);
        assert!(mods.iter().all(|m| is_no_user_modification(&m.attr_type)));
    }
}
