//! Virtual Machine for embedded scripting
//!
//! This module contains the value stack of the scripting VM together with the
//! introspection primitives the stack dumper relies on.

mod errors;
mod guard;
mod stack;
mod types;

pub use errors::VMError;
pub use guard::StackGuard;
pub use types::{Function, Kind, NativeFn, Table, TableRef, Thread, UserData, Value};

// Main VM struct that coordinates components
mod vm;
pub use vm::VM;
