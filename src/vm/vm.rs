//! Main Virtual Machine implementation
//!
//! The `VM` owns the value stack and exposes the introspection primitives the
//! dumper is built on: reading a slot's kind, copying a slot to the top,
//! traversing tables, reading metatable fields and protected calls.

use std::any::Any;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use log::trace;

use crate::vm::errors::VMError;
use crate::vm::stack::VMStack;
use crate::vm::types::{Kind, Value};

/// The scripting VM whose stack gets dumped
#[derive(Debug, Default)]
pub struct VM {
    /// Stack operations
    pub(crate) stack: VMStack,
}

impl VM {
    /// Create a new VM with an empty stack
    pub fn new() -> Self {
        Self {
            stack: VMStack::new(),
        }
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: impl Into<Value>) {
        self.stack.push(value.into());
    }

    /// Pop `n` values from the stack
    pub fn pop(&mut self, n: usize) -> Result<(), VMError> {
        self.stack.pop_n(n, "pop")
    }

    /// Number of values on the stack
    pub fn top(&self) -> usize {
        self.stack.len()
    }

    /// Get the value at `index`
    pub fn get(&self, index: isize) -> Result<&Value, VMError> {
        self.stack.get(index)
    }

    /// Classify the value at `index`
    pub fn kind(&self, index: isize) -> Result<Kind, VMError> {
        Ok(self.get(index)?.kind())
    }

    /// Push a copy of the value at `index` onto the stack
    pub fn push_value(&mut self, index: isize) -> Result<(), VMError> {
        self.stack.dup_at(index)
    }

    /// Advance a traversal of the table at `index`
    ///
    /// Pops a key from the top of the stack and pushes the next key and value.
    /// Returns `false`, pushing nothing, once the traversal is exhausted. Start
    /// a traversal by pushing nil.
    pub fn next(&mut self, index: isize) -> Result<bool, VMError> {
        let table = match self.get(index)? {
            Value::Table(table) => Rc::clone(table),
            other => return Err(VMError::NotATable(other.type_name().to_string())),
        };
        let key = self.stack.pop("next")?;

        let pair = table.borrow().next_pair(&key)?;
        match pair {
            Some((key, value)) => {
                self.stack.push(key);
                self.stack.push(value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether the value at `index` carries a metatable
    pub fn has_metatable(&self, index: isize) -> Result<bool, VMError> {
        Ok(self.get(index)?.metatable().is_some())
    }

    /// Push the metatable field `name` of the value at `index`
    ///
    /// Returns `false` and pushes nothing when the value has no metatable or
    /// the field is nil.
    pub fn get_metafield(&mut self, index: isize, name: &str) -> Result<bool, VMError> {
        let field = self
            .get(index)?
            .metatable()
            .map(|metatable| metatable.borrow().get_str(name))
            .unwrap_or(Value::Nil);

        if field.is_nil() {
            return Ok(false);
        }
        self.stack.push(field);
        Ok(true)
    }

    /// Call a function in protected mode
    ///
    /// The function sits below its `nargs` arguments at the top of the stack.
    /// Function and arguments are popped. On success `nresults` results are
    /// pushed, padded with nil or truncated as needed. On failure the error
    /// message is pushed as a string and the error is returned.
    ///
    /// The callee runs on a stack of its own and cannot see or disturb the
    /// caller's slots. Panics in native code are caught and reported as
    /// `VMError::Panic`. Catching happens after the panic hook has run, so the
    /// default hook still prints the panic message to stderr; hosts that want
    /// a quiet trace should install their own hook with
    /// [`std::panic::set_hook`].
    pub fn pcall(&mut self, nargs: usize, nresults: usize) -> Result<(), VMError> {
        if self.stack.len() < nargs + 1 {
            return Err(VMError::StackUnderflow {
                op_name: "pcall".to_string(),
            });
        }

        let base = self.stack.len() - nargs - 1;
        let mut args = self.stack.split_off(base);
        let func = args.remove(0);

        let outcome = match func {
            Value::Function(function) => {
                trace!("pcall {} with {} argument(s)", function.name, nargs);
                let caller_stack = mem::take(&mut self.stack);
                let result = panic::catch_unwind(AssertUnwindSafe(|| function.call(self, args)))
                    .unwrap_or_else(|payload| Err(VMError::Panic(panic_message(payload.as_ref()))));
                self.stack = caller_stack;
                result
            }
            other => Err(VMError::NotCallable(other.type_name().to_string())),
        };

        match outcome {
            Ok(mut results) => {
                results.resize(nresults, Value::Nil);
                for value in results {
                    self.stack.push(value);
                }
                Ok(())
            }
            Err(err) => {
                let message = match &err {
                    VMError::Runtime(message) => message.clone(),
                    other => other.to_string(),
                };
                self.stack.push(Value::from(message));
                Err(err)
            }
        }
    }

    /// Get a copy of the current stack
    pub fn snapshot(&self) -> Vec<Value> {
        self.stack.get_stack()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
