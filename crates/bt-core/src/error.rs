//! Error types raised while assembling or restructuring a tree.
//!
//! Errors in this module are raised at assembly or mutation time and are
//! returned to the caller immediately; a failed operation never commits a
//! partial change. Misbehaving leaf code discovered *during* a tick is not an
//! error here: it is contained by the node and coerced to
//! [`Status::Invalid`](crate::Status::Invalid) with a logged diagnostic.

use thiserror::Error;

use crate::NodeId;

/// Errors surfaced by the tree manager and composite assembly.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TreeError {
    /// An argument had the right type but an unusable value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The target node is not of the kind the operation requires.
    #[error("type mismatch: expected {expected}, found {found} [node: '{name}']")]
    TypeMismatch {
        /// Kind the operation needed (e.g. `Composite`).
        expected: &'static str,
        /// Kind actually found at the target.
        found: &'static str,
        /// Name of the offending node.
        name: String,
    },

    /// The operation cannot be applied to this position in the tree.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// No node with this identity is owned by the tree.
    #[error("no node with id {0} in the tree")]
    NodeNotFound(NodeId),

    /// A node's `setup` reported failure.
    #[error("setup failed beneath '{name}'")]
    SetupFailed {
        /// Name of the node that `setup` was invoked on.
        name: String,
    },
}

impl TreeError {
    /// Returns a static string identifier for this error variant.
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "TREE_INVALID_ARGUMENT",
            Self::TypeMismatch { .. } => "TREE_TYPE_MISMATCH",
            Self::InvalidOperation(_) => "TREE_INVALID_OPERATION",
            Self::NodeNotFound(_) => "TREE_NODE_NOT_FOUND",
            Self::SetupFailed { .. } => "TREE_SETUP_FAILED",
        }
    }
}

pub type Result<T> = std::result::Result<T, TreeError>;
