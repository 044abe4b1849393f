//! RAII guard for transient stack use
//!
//! A `StackGuard` remembers the stack height when it is created and truncates
//! the stack back to that height when dropped, whatever path the scope exits
//! through.

use std::ops::{Deref, DerefMut};

use crate::vm::vm::VM;

/// Scoped access to a VM that restores the stack height on drop
pub struct StackGuard<'a> {
    vm: &'a mut VM,
    base: usize,
}

impl<'a> StackGuard<'a> {
    /// Create a new guard at the current stack height
    pub fn new(vm: &'a mut VM) -> Self {
        let base = vm.top();
        Self { vm, base }
    }
}

impl Deref for StackGuard<'_> {
    type Target = VM;

    fn deref(&self) -> &VM {
        &*self.vm
    }
}

impl DerefMut for StackGuard<'_> {
    fn deref_mut(&mut self) -> &mut VM {
        &mut *self.vm
    }
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.vm.stack.truncate(self.base);
    }
}
