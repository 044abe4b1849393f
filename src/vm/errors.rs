//! Error types for VM operations
//!
//! This module defines the error conditions raised by the value stack and the
//! introspection operations built on top of it.

use thiserror::Error;

/// Error variants that can occur while manipulating or calling into the VM
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VMError {
    /// Stack underflow occurs when trying to pop more values than are available
    #[error("Stack underflow during {op_name}")]
    StackUnderflow { op_name: String },

    /// A stack index that does not name a live slot
    #[error("Invalid stack index: {0}")]
    InvalidIndex(isize),

    /// Table operation attempted on a value of another type
    #[error("Expected a table, found {0}")]
    NotATable(String),

    /// Call attempted on a value that is not a function
    #[error("Attempt to call a {0} value")]
    NotCallable(String),

    /// Table traversal resumed from a key the table does not contain
    #[error("Invalid key to 'next'")]
    InvalidKey,

    /// Error raised by user code
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Native code panicked during a protected call
    #[error("Panic in native function: {0}")]
    Panic(String),
}
