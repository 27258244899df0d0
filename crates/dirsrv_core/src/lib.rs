//! # dirsrv Core
//!
//! Directory data model and backends for dirsrv.
//!
//! This crate provides:
//! - Distinguished names with RFC 4514 normalization ([`Dn`])
//! - Entries, attributes and modifications
//! - Operational attribute maintenance ([`operational`])
//! - Filter evaluation against entries ([`filter`])
//! - The [`Backend`] trait, the [`BackendRegistry`] and an in-memory backend
//!
//! ## Example
//!
//! ```rust
//! use dirsrv_core::{Dn, Entry, Modification};
//!
//! let dn = Dn::parse("CN=Foo, DC=Example, DC=Com").unwrap();
//! assert_eq!(dn.as_str(), "cn=foo,dc=example,dc=com");
//!
//! let entry = Entry::from_modifications(
//!     dn,
//!     vec![Modification::add("cn", vec![b"Foo".to_vec()])],
//! )
//! .unwrap();
//! assert!(entry.get("CN").unwrap().contains(b"foo"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attribute;
pub mod backend;
pub mod dn;
mod entry;
mod error;
pub mod filter;
mod modification;
mod operation;
pub mod operational;
pub mod search;

pub use attribute::{
    base_type, canonical_type, normalize_value, type_key, values_match, Attribute,
};
pub use backend::{
    check_controls, Backend, BackendConfig, BackendRegistry, Commit, InMemoryBackend, ReleaseGuard,
};
pub use dn::{normalize, Dn};
pub use entry::Entry;
pub use error::{
    BackendError, BackendResult, DnError, EntryError, RegistryError, RegistryResult,
};
pub use modification::{Modification, ModifyOperation};
pub use operation::Operation;
pub use operational::{Clock, FixedClock, Stamp, SystemClock};
pub use search::SearchParams;
