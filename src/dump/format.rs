//! Recursive value formatter
//!
//! Renders one stack slot, descending into tables up to the configured depth.
//! Each call works on a copy of its value pushed under a [`StackGuard`], so the
//! stack is back at its original height whenever a call returns, including
//! when a user-supplied `__tostring` fails.

use log::debug;

use crate::config::{DumpConfig, INDENT_STEP};
use crate::dump::errors::FormatError;
use crate::dump::number::format_number;
use crate::dump::sink::TextSink;
use crate::vm::{Kind, StackGuard, VMError, Value, VM};

/// Metatable key of the custom stringifier
pub const TOSTRING: &str = "__tostring";

/// Inline note written when a `__tostring` entry cannot be called
const TOSTRING_FAILED: &str = " (failed to call __tostring)";

/// Per-value formatting state threaded through the recursion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatContext {
    /// Label of the stack slot the value hangs off
    pub slot: isize,
    /// Nesting depth below the stack slot
    pub depth: usize,
    /// Visual indent in columns
    pub indent_level: usize,
    /// The value starts its own line and gets a label or padding
    pub line_start: bool,
    /// Terminate the value's text with a newline
    pub newline: bool,
}

impl FormatContext {
    /// Context of a top-level stack slot
    pub fn slot(slot: isize) -> Self {
        Self {
            slot,
            depth: 0,
            indent_level: 0,
            line_start: true,
            newline: true,
        }
    }

    pub fn is_top_level_slot(&self) -> bool {
        self.depth == 0
    }

    /// Context of a table key, which opens a new line
    pub fn key(&self) -> Self {
        Self {
            depth: self.depth + 1,
            indent_level: self.indent_level + INDENT_STEP,
            line_start: true,
            newline: false,
            ..*self
        }
    }

    /// Context of a table value, printed inline after ` = `
    pub fn value(&self) -> Self {
        Self {
            line_start: false,
            ..self.key()
        }
    }
}

/// Write the value at `index` to `sink`
///
/// Stringifier failures are rendered inline. An error is only returned for an
/// index that does not name a live slot; the stack height is restored either way.
pub fn format_value(
    vm: &mut VM,
    index: isize,
    ctx: FormatContext,
    config: &DumpConfig,
    sink: &mut dyn TextSink,
) -> Result<(), VMError> {
    let mut scope = StackGuard::new(vm);
    scope.push_value(index)?;
    let at = scope.top() as isize;

    let value = scope.get(at)?.clone();
    let text = match (value.kind(), &value) {
        (Kind::Number, Value::Number(n)) => {
            format!("{} ({})", format_number(*n), value.type_name())
        }
        (Kind::String, Value::String(s)) => format!("{} ({})", s, value.type_name()),
        (Kind::Boolean, Value::Boolean(b)) => b.to_string(),
        (Kind::Nil, _) => "nil".to_string(),
        (Kind::OpaqueHandle, _) => handle_text(&mut scope, at)?,
        (Kind::Composite, _) => return format_composite(&mut scope, at, ctx, config, sink),
        // Functions are identified by address only
        (Kind::Callable, _) => identity_text(&value),
        // threads and anything else without a dedicated rendering
        (Kind::Unknown, _) => identity_text(&value),
        // unreachable, kind() always agrees with the variant
        (Kind::Number | Kind::String | Kind::Boolean, _) => identity_text(&value),
    };

    write_prefix(&ctx, sink);
    let width = if ctx.line_start {
        config.field_width.saturating_sub(ctx.indent_level)
    } else {
        config.field_width
    };
    write!(sink, "{:<width$}", text, width = width);
    if ctx.newline {
        writeln!(sink);
    }
    Ok(())
}

fn format_composite(
    vm: &mut VM,
    at: isize,
    ctx: FormatContext,
    config: &DumpConfig,
    sink: &mut dyn TextSink,
) -> Result<(), VMError> {
    write_prefix(&ctx, sink);

    let mut len = 0;
    vm.push(Value::Nil);
    while vm.next(at)? {
        vm.pop(1)?;
        len += 1;
    }
    let table = vm.get(at)?;
    write!(sink, "{}: {:#x} (size: {})", table.type_name(), table.identity(), len);

    if ctx.depth < config.max_depth {
        vm.push(Value::Nil);
        while vm.next(at)? {
            let value = vm.top() as isize;
            let key = value - 1;

            writeln!(sink);
            format_value(vm, key, ctx.key(), config, sink)?;
            write!(sink, " = ");
            format_value(vm, value, ctx.value(), config, sink)?;

            if is_stringifier_entry(vm, key, value)? {
                match call_stringifier(vm, value, None) {
                    Ok(text) => write!(sink, "{}", text),
                    Err(err) => {
                        debug!("{} entry of slot {} failed: {}", TOSTRING, ctx.slot, err);
                        write!(sink, "{}", TOSTRING_FAILED);
                    }
                }
            }

            // keep the key for the next traversal step
            vm.pop(1)?;
        }
    }

    if ctx.newline {
        writeln!(sink);
    }
    Ok(())
}

/// Text of a userdata handle, preferring its `__tostring` metamethod
fn handle_text(vm: &mut VM, at: isize) -> Result<String, VMError> {
    let identity = identity_text(vm.get(at)?);
    if !vm.has_metatable(at)? {
        return Ok(format!("{} (no metatable)", identity));
    }

    let mut scope = StackGuard::new(vm);
    if !scope.get_metafield(at, TOSTRING)? || scope.kind(-1)? != Kind::Callable {
        return Ok(identity);
    }

    let func = scope.top() as isize;
    match call_stringifier(&mut scope, func, Some(at)) {
        Ok(text) => Ok(text),
        Err(err) => {
            debug!("{} metamethod of {} failed: {}", TOSTRING, identity, err);
            Ok(identity)
        }
    }
}

/// Call the function at `func` for a single string result
///
/// When `receiver` is given, the value at that index is passed as the only
/// argument. Numbers are accepted and converted like any other number.
pub fn call_stringifier(
    vm: &mut VM,
    func: isize,
    receiver: Option<isize>,
) -> Result<String, FormatError> {
    let mut scope = StackGuard::new(vm);
    scope.push_value(func)?;
    let nargs = match receiver {
        Some(receiver) => {
            scope.push_value(receiver)?;
            1
        }
        None => 0,
    };
    scope.pcall(nargs, 1)?;

    match scope.get(-1)? {
        Value::String(s) => Ok(s.to_string()),
        Value::Number(n) => Ok(format_number(*n)),
        other => Err(FormatError::NotAString {
            type_name: other.type_name().to_string(),
        }),
    }
}

fn is_stringifier_entry(vm: &VM, key: isize, value: isize) -> Result<bool, VMError> {
    Ok(vm.kind(value)? == Kind::Callable && vm.get(key)?.as_str() == Some(TOSTRING))
}

fn identity_text(value: &Value) -> String {
    format!("{} [{:#x}]", value.type_name(), value.identity())
}

fn write_prefix(ctx: &FormatContext, sink: &mut dyn TextSink) {
    if !ctx.line_start {
        return;
    }
    if ctx.is_top_level_slot() {
        write!(sink, "{:<5} | ", ctx.slot);
    } else {
        write!(sink, "{:8}", "");
    }
    if ctx.indent_level >= INDENT_STEP {
        write!(sink, "{:pad$}\\-- ", "", pad = ctx.indent_level - INDENT_STEP);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{Table, UserData};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn render_with(vm: &mut VM, config: &DumpConfig) -> String {
        let mut out = String::new();
        format_value(vm, -1, FormatContext::slot(-1), config, &mut out).unwrap();
        out
    }

    fn render(value: Value) -> String {
        let mut vm = VM::new();
        vm.push(value);
        render_with(&mut vm, &DumpConfig::default())
    }

    fn row(text: &str) -> String {
        format!("-1    | {:<20}\n", text)
    }

    fn metatable(pairs: Vec<(&str, Value)>) -> Rc<RefCell<Table>> {
        Rc::new(RefCell::new(Table::from_pairs(pairs)))
    }

    #[test]
    fn test_context_descent() {
        let slot = FormatContext::slot(-3);
        assert!(slot.is_top_level_slot());

        let key = slot.key();
        assert_eq!((key.depth, key.indent_level, key.line_start, key.newline), (1, 4, true, false));
        assert_eq!(key.slot, -3);

        let value = key.value();
        assert_eq!((value.depth, value.indent_level, value.line_start), (2, 8, false));
        assert!(!value.is_top_level_slot());
    }

    #[test]
    fn test_scalar_rows() {
        assert_eq!(render(Value::Nil), row("nil"));
        assert_eq!(render(Value::from(true)), row("true"));
        assert_eq!(render(Value::from(false)), row("false"));
        assert_eq!(render(Value::from(3.5)), row("3.5 (number)"));
        assert_eq!(render(Value::from("x")), row("x (string)"));
    }

    #[test]
    fn test_identity_rows() {
        let function = Value::function("f", |_, _| Ok(vec![]));
        let expected = row(&format!("function [{:#x}]", function.identity()));
        assert_eq!(render(function), expected);

        let thread = Value::thread();
        let expected = row(&format!("thread [{:#x}]", thread.identity()));
        assert_eq!(render(thread), expected);

        assert_eq!(
            render(Value::LightUserData(0xbeef)),
            row("userdata [0xbeef] (no metatable)")
        );
    }

    #[test]
    fn test_long_text_is_not_truncated() {
        let text = "a string longer than the field";
        assert_eq!(render(Value::from(text)), format!("-1    | {} (string)\n", text));
    }

    #[test]
    fn test_userdata_metamethod() {
        let tostring = Value::function("tostring", |_, args| match args.first() {
            Some(Value::UserData(u)) => Ok(vec![Value::from(format!("<{}>", u.tag))]),
            _ => Err(VMError::Runtime("bad self".to_string())),
        });
        let handle = Value::userdata(UserData::with_metatable(
            "file",
            metatable(vec![(TOSTRING, tostring)]),
        ));
        assert_eq!(render(handle), row("<file>"));
    }

    #[test]
    fn test_userdata_metamethod_failure_falls_back() {
        let failing = Value::function("tostring", |_, _| Err(VMError::Runtime("nope".to_string())));
        let handle = Value::userdata(UserData::with_metatable(
            "file",
            metatable(vec![(TOSTRING, failing)]),
        ));
        let expected = row(&format!("userdata [{:#x}]", handle.identity()));
        assert_eq!(render(handle), expected);

        let non_string = Value::function("tostring", |_, _| Ok(vec![Value::from(true)]));
        let handle = Value::userdata(UserData::with_metatable(
            "file",
            metatable(vec![(TOSTRING, non_string)]),
        ));
        let expected = row(&format!("userdata [{:#x}]", handle.identity()));
        assert_eq!(render(handle), expected);
    }

    #[test]
    fn test_userdata_metatable_without_tostring() {
        let handle = Value::userdata(UserData::with_metatable(
            "file",
            metatable(vec![("__index", Value::table(Table::new()))]),
        ));
        let expected = row(&format!("userdata [{:#x}]", handle.identity()));
        assert_eq!(render(handle), expected);
    }

    #[test]
    fn test_table_children_are_indented() {
        let table = Value::table(Table::from_pairs([("a", 1)]));
        let expected = format!(
            "-1    | table: {:#x} (size: 1)\n        \\-- {:<16} = {:<20}\n",
            table.identity(),
            "a (string)",
            "1 (number)"
        );
        assert_eq!(render(table), expected);
    }

    #[test]
    fn test_empty_table() {
        let table = Value::table(Table::new());
        let expected = format!("-1    | table: {:#x} (size: 0)\n", table.identity());
        assert_eq!(render(table), expected);
    }

    #[test]
    fn test_tostring_entry_is_called() {
        let mut table = Table::new();
        let function = Value::function("tostring", |_, _| Ok(vec![Value::from("custom")]));
        table.set(TOSTRING, function.clone());
        let table = Value::table(table);

        let expected = format!(
            "-1    | table: {:#x} (size: 1)\n        \\-- {:<16} = {:<20}custom\n",
            table.identity(),
            "__tostring (string)",
            format!("function [{:#x}]", function.identity())
        );
        assert_eq!(render(table), expected);
    }

    #[test]
    fn test_tostring_entry_failure_is_reported_inline() {
        let mut table = Table::new();
        table.set(TOSTRING, Value::function("tostring", |_, _| panic!("user code")));
        table.set("after", 1);
        let mut vm = VM::new();
        vm.push(table);

        let out = render_with(&mut vm, &DumpConfig::default());
        assert!(out.contains(TOSTRING_FAILED));
        assert!(out.contains("after (string)"));
        assert_eq!(vm.top(), 1);
    }

    #[test]
    fn test_tostring_entry_clearing_itself_keeps_traversal() {
        let table = Rc::new(RefCell::new(Table::new()));
        let weak = Rc::downgrade(&table);
        let clear_self = Value::function("tostring", move |_, _| {
            if let Some(table) = weak.upgrade() {
                table.borrow_mut().set(TOSTRING, Value::Nil);
            }
            Ok(vec![Value::from("T")])
        });
        table.borrow_mut().set(TOSTRING, clear_self.clone());
        table.borrow_mut().set("after", 1);
        let table = Value::Table(table);
        let mut vm = VM::new();
        vm.push(table.clone());

        let expected = format!(
            "-1    | table: {:#x} (size: 2)\n\
             \x20       \\-- {:<16} = {:<20}T\n\
             \x20       \\-- {:<16} = {:<20}\n",
            table.identity(),
            "__tostring (string)",
            format!("function [{:#x}]", clear_self.identity()),
            "after (string)",
            "1 (number)"
        );
        assert_eq!(render_with(&mut vm, &DumpConfig::default()), expected);
        assert_eq!(vm.top(), 1);
    }

    #[test]
    fn test_width_clamps_at_zero() {
        let table = Value::table(Table::from_pairs([("a", 1)]));
        let mut vm = VM::new();
        vm.push(table.clone());
        let config = DumpConfig::default().with_field_width(2);

        let expected = format!(
            "-1    | table: {:#x} (size: 1)\n        \\-- a (string) = 1 (number)\n",
            table.identity()
        );
        assert_eq!(render_with(&mut vm, &config), expected);
    }

    #[test]
    fn test_depth_limit_keeps_summary() {
        let inner = Value::table(Table::from_pairs([("x", 1)]));
        let mut outer = Table::new();
        outer.set("inner", inner.clone());
        let mut vm = VM::new();
        vm.push(outer);

        let out = render_with(&mut vm, &DumpConfig::default().with_max_depth(1));
        assert!(out.contains(&format!("table: {:#x} (size: 1)", inner.identity())));
        assert!(!out.contains("x (string)"));
    }

    #[test]
    fn test_call_stringifier_errors() {
        let mut vm = VM::new();
        vm.push(Value::function("num", |_, _| Ok(vec![Value::from(2.5)])));
        vm.push(Value::function("nil", |_, _| Ok(vec![])));
        vm.push(7);

        assert_eq!(call_stringifier(&mut vm, 1, None), Ok("2.5".to_string()));
        assert_eq!(
            call_stringifier(&mut vm, 2, None),
            Err(FormatError::NotAString { type_name: "nil".to_string() })
        );
        assert_eq!(
            call_stringifier(&mut vm, 3, None),
            Err(FormatError::Call(VMError::NotCallable("number".to_string())))
        );
        assert_eq!(
            call_stringifier(&mut vm, 9, None),
            Err(FormatError::Call(VMError::InvalidIndex(9)))
        );
        assert_eq!(vm.top(), 3);
    }
}
