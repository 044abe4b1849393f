pub mod config;
pub mod dump;
pub mod vm;

pub use crate::config::DumpConfig;
pub use crate::dump::{dump, dump_default, dump_to_string, dump_with_config, TextSink};
pub use crate::vm::{Value, VMError, VM};
