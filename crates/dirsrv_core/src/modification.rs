//! Modifications.

use dirsrv_protocol::Change;
pub use dirsrv_protocol::ModifyOperation;

/// A change to one attribute.
///
/// An add request is carried as a list of `Add` modifications until it is
/// merged into an [`Entry`](crate::Entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    /// The kind of change.
    pub op: ModifyOperation,
    /// Attribute description.
    pub attr_type: String,
    /// Values; may be empty for `Delete` and `Replace`.
    pub values: Vec<Vec<u8>>,
}

impl Modification {
    /// Creates a modification.
    pub fn new(op: ModifyOperation, attr_type: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self {
            op,
            attr_type: attr_type.into(),
            values,
        }
    }

    /// An `Add` modification.
    pub fn add(attr_type: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self::new(ModifyOperation::Add, attr_type, values)
    }

    /// A `Delete` modification. Empty `values` removes the attribute.
    pub fn delete(attr_type: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self::new(ModifyOperation::Delete, attr_type, values)
    }

    /// A `Replace` modification. Empty `values` removes the attribute.
    pub fn replace(attr_type: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self::new(ModifyOperation::Replace, attr_type, values)
    }

    /// A single-valued `Replace`.
    pub fn replace_one(attr_type: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::replace(attr_type, vec![value.into()])
    }
}

impl From<Change> for Modification {
    fn from(change: Change) -> Self {
        Self {
            op: change.operation,
            attr_type: change.attr_type,
            values: change.values,
        }
    }
}

impl From<Modification> for Change {
    fn from(modification: Modification) -> Self {
        Change::new(modification.op, modification.attr_type, modification.values)
    }
}
