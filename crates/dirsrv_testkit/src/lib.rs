//! # dirsrv Testkit
//!
//! Test utilities for dirsrv.
//!
//! This crate provides:
//! - Test fixtures: a server with a writable `dc=example,dc=com` backend
//! - Request frame builders
//! - Property-based test generators using proptest
//! - Fuzz testing harnesses
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dirsrv_testkit::prelude::*;
//!
//! #[test]
//! fn add_entry() {
//!     let dir = TestDirectory::new();
//!     let mut conn = dir.connect();
//!     let code = dir.send_one(&mut conn, 1, &add_person("cn=foo,dc=example,dc=com"));
//!     assert_eq!(code, ResultCode::Success);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod builders;
pub mod fixtures;
pub mod fuzz;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::builders::*;
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use dirsrv_protocol::{Request, Response, ResultCode};
}

pub use builders::*;
pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
