//! Human-readable stack traces
//!
//! The entry points here walk the VM stack from the top slot down to the
//! bottom one and hand each slot to the value formatter, framing the rows with
//! fixed banner lines:
//!
//! ```text
//!
//! --------------------start-of-stacktrace----------------
//! index | details (2 entries)
//! -1    | hi (string)
//! -2    | 42 (number)
//! ----------------------end-of-stacktrace----------------
//! ```

mod errors;
mod format;
mod number;
mod sink;

pub use errors::FormatError;
pub use format::{call_stringifier, format_value, FormatContext, TOSTRING};
pub use number::format_number;
pub use sink::{StdoutSink, TextSink};

use log::{debug, error, trace};

use crate::config::DumpConfig;
use crate::vm::VM;

const START_BANNER: &str = "\n--------------------start-of-stacktrace----------------";
const END_BANNER: &str = "----------------------end-of-stacktrace----------------\n";

/// Dump every stack slot to `sink` using the process-wide configuration
pub fn dump(vm: &mut VM, sink: &mut dyn TextSink) {
    dump_with_config(vm, sink, DumpConfig::global());
}

/// Dump every stack slot to `sink`
///
/// The stack is left exactly as it was found.
pub fn dump_with_config(vm: &mut VM, sink: &mut dyn TextSink, config: &DumpConfig) {
    let top = vm.top();
    debug!("dumping {} stack entries (max depth {})", top, config.max_depth);

    writeln!(sink, "{}", START_BANNER);
    writeln!(sink, "index | details ({} entries)", top);
    for offset in 1..=top {
        let index = -(offset as isize);
        trace!("formatting stack slot {}", index);
        if let Err(err) = format_value(vm, index, FormatContext::slot(index), config, sink) {
            error!("failed to format stack slot {}: {}", index, err);
            writeln!(sink, "<error: {}>", err);
        }
    }
    writeln!(sink, "{}", END_BANNER);
}

/// Dump every stack slot to standard output
pub fn dump_default(vm: &mut VM) {
    dump(vm, &mut StdoutSink);
}

/// Render the dump into a string
pub fn dump_to_string(vm: &mut VM) -> String {
    let mut out = String::new();
    dump(vm, &mut out);
    out
}
