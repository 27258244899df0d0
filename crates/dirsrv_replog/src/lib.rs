//! # dirsrv Replog
//!
//! Replication log handoff for dirsrv.
//!
//! Successful mutations are submitted as [`ReplicationRecord`]s to a
//! [`ReplicationLog`], which releases them in per-backend commit order to a
//! writer thread owning a [`ReplicationSink`]. Sink failures are logged and
//! counted and never reach the client.
//!
//! ## Sinks
//!
//! - [`MemorySink`] - keeps records in memory, for tests
//! - [`FileSink`] - appends slurpd-style replog text, read back with
//!   [`ReplogReader`]

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod file;
mod log;
mod reader;
mod record;
mod sink;

pub use config::ReplogConfig;
pub use error::{ReplogError, ReplogResult, SinkError};
pub use file::{format_record, is_safe_string, FileSink};
pub use log::{ReplicationLog, ReplogStats};
pub use reader::{ReplogEntry, ReplogReader};
pub use record::{Change, ReplicationRecord};
pub use sink::{MemorySink, ReplicationSink};
