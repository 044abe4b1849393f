//! Type definitions for the virtual machine
//!
//! This module contains the runtime values that live on the VM stack: scalars,
//! tables, userdata handles, native functions and threads.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::vm::errors::VMError;
use crate::vm::vm::VM;

/// Shared, mutable table handle
pub type TableRef = Rc<RefCell<Table>>;

/// Signature of a function body callable from the VM
pub type NativeFn = dyn Fn(&mut VM, Vec<Value>) -> Result<Vec<Value>, VMError>;

/// Coarse classification of a runtime value
///
/// Light and heavy userdata both classify as `OpaqueHandle`; anything the
/// dumper has no dedicated rendering for classifies as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Nil,
    Boolean,
    Number,
    String,
    OpaqueHandle,
    Callable,
    Composite,
    Unknown,
}

/// A value that can be stored on the VM stack or inside a table
///
/// Reference kinds are `Rc`-shared, so cloning a value keeps its identity.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    /// A raw host pointer; carries no metatable
    LightUserData(usize),
    UserData(Rc<UserData>),
    Function(Rc<Function>),
    Table(TableRef),
    Thread(Rc<Thread>),
}

impl Value {
    /// Create a table value
    pub fn table(table: Table) -> Self {
        Value::Table(Rc::new(RefCell::new(table)))
    }

    /// Create a function value from a native body
    pub fn function<F>(name: &str, body: F) -> Self
    where
        F: Fn(&mut VM, Vec<Value>) -> Result<Vec<Value>, VMError> + 'static,
    {
        Value::Function(Rc::new(Function::new(name, body)))
    }

    /// Create a heavy userdata value
    pub fn userdata(userdata: UserData) -> Self {
        Value::UserData(Rc::new(userdata))
    }

    /// Create a new thread value
    pub fn thread() -> Self {
        Value::Thread(Rc::new(Thread::default()))
    }

    /// Classify the value
    pub fn kind(&self) -> Kind {
        match self {
            Value::Nil => Kind::Nil,
            Value::Boolean(_) => Kind::Boolean,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::LightUserData(_) | Value::UserData(_) => Kind::OpaqueHandle,
            Value::Function(_) => Kind::Callable,
            Value::Table(_) => Kind::Composite,
            Value::Thread(_) => Kind::Unknown,
        }
    }

    /// Get the type name as the scripting language spells it
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::LightUserData(_) | Value::UserData(_) => "userdata",
            Value::Function(_) => "function",
            Value::Table(_) => "table",
            Value::Thread(_) => "thread",
        }
    }

    /// Opaque identity of the value, only meaningful for telling instances apart
    pub fn identity(&self) -> usize {
        match self {
            Value::Nil | Value::Boolean(_) | Value::Number(_) => 0,
            Value::String(s) => Rc::as_ptr(s) as *const u8 as usize,
            Value::LightUserData(p) => *p,
            Value::UserData(u) => Rc::as_ptr(u) as usize,
            Value::Function(f) => Rc::as_ptr(f) as usize,
            Value::Table(t) => Rc::as_ptr(t) as usize,
            Value::Thread(t) => Rc::as_ptr(t) as usize,
        }
    }

    /// The metatable attached to this value, if any
    ///
    /// Only heavy userdata carry metatables.
    pub fn metatable(&self) -> Option<TableRef> {
        match self {
            Value::UserData(u) => u.metatable(),
            _ => None,
        }
    }

    /// Primitive equality: scalars by value, strings by content, the rest by identity
    pub fn raw_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::LightUserData(a), Value::LightUserData(b)) => a == b,
            (Value::UserData(a), Value::UserData(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Thread(a), Value::Thread(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Borrow the string contents if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.raw_equals(other)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Rc::from(value))
    }
}

impl From<Table> for Value {
    fn from(value: Table) -> Self {
        Value::table(value)
    }
}

/// Associative container used both as an array and as a dictionary
///
/// Pairs are kept in insertion order, which is also the traversal order.
/// Assigning nil to a present key leaves a nil-valued slot behind, so a
/// traversal can still step past a key that was cleared under it.
#[derive(Default)]
pub struct Table {
    entries: Vec<(Value, Value)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from key/value pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut table = Self::new();
        for (key, value) in pairs {
            table.set(key, value);
        }
        table
    }

    /// Assign `value` to `key`
    ///
    /// Assigning nil removes the pair from traversal. Nil keys are ignored.
    pub fn set(&mut self, key: impl Into<Value>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if key.is_nil() {
            return;
        }

        match self.position(&key) {
            Some(pos) => self.entries[pos].1 = value,
            None if value.is_nil() => {}
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a string key, returning nil when absent
    pub fn get_str(&self, key: &str) -> Value {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Nil)
    }

    /// The live pair following `key` in traversal order
    ///
    /// A nil key starts the traversal; `Ok(None)` ends it. A key cleared since
    /// it was returned still resumes the traversal.
    pub fn next_pair(&self, key: &Value) -> Result<Option<(Value, Value)>, VMError> {
        let start = if key.is_nil() {
            0
        } else {
            self.position(key).ok_or(VMError::InvalidKey)? + 1
        };
        Ok(self.entries[start..]
            .iter()
            .find(|(_, v)| !v.is_nil())
            .cloned())
    }

    fn live_len(&self) -> usize {
        self.entries.iter().filter(|(_, v)| !v.is_nil()).count()
    }

    fn position(&self, key: &Value) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k.raw_equals(key))
    }
}

// Tables may contain themselves, so the derived impl would recurse forever.
impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table").field("len", &self.live_len()).finish()
    }
}

/// Host-owned blob exposed to scripts, optionally carrying a metatable
#[derive(Debug)]
pub struct UserData {
    /// Host-side type tag
    pub tag: String,
    metatable: Option<TableRef>,
}

impl UserData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            metatable: None,
        }
    }

    pub fn with_metatable(tag: &str, metatable: TableRef) -> Self {
        Self {
            tag: tag.to_string(),
            metatable: Some(metatable),
        }
    }

    pub fn metatable(&self) -> Option<TableRef> {
        self.metatable.clone()
    }
}

/// A function implemented by the host
pub struct Function {
    pub name: String,
    body: Box<NativeFn>,
}

impl Function {
    pub fn new<F>(name: &str, body: F) -> Self
    where
        F: Fn(&mut VM, Vec<Value>) -> Result<Vec<Value>, VMError> + 'static,
    {
        Self {
            name: name.to_string(),
            body: Box::new(body),
        }
    }

    /// Run the function body
    pub fn call(&self, vm: &mut VM, args: Vec<Value>) -> Result<Vec<Value>, VMError> {
        (self.body)(vm, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}

/// A coroutine handle
///
/// The VM never runs coroutines; threads only exist so hosts can place them on
/// the stack.
#[derive(Debug, Default)]
pub struct Thread {
    _private: (),
}
