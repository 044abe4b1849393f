//! Output sinks for rendered stack traces

use std::fmt;
use std::io::{self, Write};

use log::warn;

/// Destination for rendered text
///
/// `write_fmt` makes any sink usable with `write!` and `writeln!`. Sinks
/// swallow their own failures; a dump never reports errors to its caller.
pub trait TextSink {
    fn write_fmt(&mut self, args: fmt::Arguments<'_>);
}

/// Writes to the process's standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl TextSink for StdoutSink {
    fn write_fmt(&mut self, args: fmt::Arguments<'_>) {
        if let Err(err) = io::stdout().lock().write_fmt(args) {
            warn!("failed to write stack dump to stdout: {}", err);
        }
    }
}

impl TextSink for String {
    fn write_fmt(&mut self, args: fmt::Arguments<'_>) {
        // Writing into a String cannot fail
        let _ = fmt::Write::write_fmt(self, args);
    }
}

impl<F> TextSink for F
where
    F: FnMut(fmt::Arguments<'_>),
{
    fn write_fmt(&mut self, args: fmt::Arguments<'_>) {
        self(args)
    }
}
