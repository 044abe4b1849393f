//! VM Stack operations
//!
//! This module provides the value stack and its index arithmetic. Positive
//! indices are absolute and 1-based, negative indices count down from the top
//! (`-1` is the topmost slot).

use crate::vm::errors::VMError;
use crate::vm::types::Value;

/// Provides stack operations for the virtual machine
#[derive(Debug, Clone, Default)]
pub(crate) struct VMStack {
    /// The values on the stack
    stack: Vec<Value>,
}

impl VMStack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pop a value from the stack
    pub fn pop(&mut self, op_name: &str) -> Result<Value, VMError> {
        self.stack.pop().ok_or_else(|| VMError::StackUnderflow {
            op_name: op_name.to_string(),
        })
    }

    /// Pop `n` values from the stack
    pub fn pop_n(&mut self, n: usize, op_name: &str) -> Result<(), VMError> {
        if self.stack.len() < n {
            return Err(VMError::StackUnderflow {
                op_name: op_name.to_string(),
            });
        }
        self.stack.truncate(self.stack.len() - n);
        Ok(())
    }

    /// Convert an index into a position in the backing vector
    pub fn resolve(&self, index: isize) -> Result<usize, VMError> {
        let len = self.stack.len();
        let pos = if index > 0 {
            index.unsigned_abs() - 1
        } else if index < 0 && index.unsigned_abs() <= len {
            len - index.unsigned_abs()
        } else {
            return Err(VMError::InvalidIndex(index));
        };

        if pos < len {
            Ok(pos)
        } else {
            Err(VMError::InvalidIndex(index))
        }
    }

    /// Get the value at `index`
    pub fn get(&self, index: isize) -> Result<&Value, VMError> {
        let pos = self.resolve(index)?;
        Ok(&self.stack[pos])
    }

    /// Push a copy of the value at `index`
    pub fn dup_at(&mut self, index: isize) -> Result<(), VMError> {
        let value = self.get(index)?.clone();
        self.push(value);
        Ok(())
    }

    /// Drop every value above `len`
    ///
    /// Never grows the stack.
    pub fn truncate(&mut self, len: usize) {
        self.stack.truncate(len);
    }

    /// Remove and return every value from `pos` upwards
    pub fn split_off(&mut self, pos: usize) -> Vec<Value> {
        self.stack.split_off(pos)
    }

    /// Get the current stack values
    pub fn get_stack(&self) -> Vec<Value> {
        self.stack.clone()
    }

    /// Get the stack length
    pub fn len(&self) -> usize {
        self.stack.len()
    }
}
