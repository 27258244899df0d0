//! The operation in flight.

use crate::dn::Dn;
use dirsrv_protocol::{Control, OperationKind};

/// One request being processed.
///
/// Created when a frame is decoded and dropped after its response is sent.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Connection the request arrived on.
    pub conn_id: u64,
    /// Message id chosen by the client.
    pub message_id: i64,
    /// Operation kind.
    pub kind: OperationKind,
    /// Identity bound on the connection; `None` when anonymous.
    pub bound: Option<Dn>,
    /// Request controls.
    pub controls: Vec<Control>,
}

impl Operation {
    /// Creates an anonymous operation without controls.
    pub fn new(conn_id: u64, message_id: i64, kind: OperationKind) -> Self {
        Self {
            conn_id,
            message_id,
            kind,
            bound: None,
            controls: Vec::new(),
        }
    }

    /// Sets the bound identity.
    pub fn with_bound(mut self, bound: Option<Dn>) -> Self {
        self.bound = bound;
        self
    }

    /// Sets the controls.
    pub fn with_controls(mut self, controls: Vec<Control>) -> Self {
        self.controls = controls;
        self
    }

    /// The bound identity, if any.
    pub fn bound_dn(&self) -> Option<&Dn> {
        self.bound.as_ref().filter(|dn| !dn.is_root())
    }

    /// True if the bound identity is `dn`.
    pub fn is_identity(&self, dn: &Dn) -> bool {
        self.bound_dn() == Some(dn)
    }
}
