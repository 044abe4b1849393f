//! Error types for value formatting

use thiserror::Error;

use crate::vm::VMError;

/// Failure while running a value's custom stringifier
///
/// Never leaves the dumper; it is rendered inline instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormatError {
    /// The stringifier could not be called or raised an error
    #[error("__tostring call failed: {0}")]
    Call(#[from] VMError),

    /// The stringifier returned something other than a string
    #[error("'__tostring' must return a string, got {type_name}")]
    NotAString { type_name: String },
}
