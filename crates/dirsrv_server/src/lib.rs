//! # dirsrv Server
//!
//! The LDAP operation pipeline.
//!
//! This crate provides:
//! - Connection framing with notice of disconnection on decode failure
//! - Add, modify, delete, search and simple bind handlers
//! - The write policy gate (read-only, replicas, update identity)
//! - Operational attribute stamping
//! - Handoff of committed changes to the replication log
//!
//! # Architecture
//!
//! A [`Server`] is shared by every [`Connection`]. Connections own their
//! frame buffer and bound identity, and run one operation at a time. The
//! handlers never own backends; they borrow them from the registry for the
//! length of one operation and release the write lock on every exit path.
//!
//! # Add
//!
//! An add runs these steps in order, stopping at the first failure:
//! 1. Decode the request and normalize the DN
//! 2. Collect attributes, rejecting empty value sets
//! 3. Decode controls
//! 4. Select the backend, or refer the client
//! 5. Check critical controls and the write policy
//! 6. Stamp operational attributes
//! 7. Apply to the backend
//! 8. Submit the change for replication and release the entry

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod connection;
mod error;
mod ops;
mod policy;
mod server;

pub use config::ServerConfig;
pub use connection::Connection;
pub use error::{ServerError, ServerResult};
pub use policy::{check_write, lastmod_enabled, WriteAuthority};
pub use server::{Outcome, Server};
