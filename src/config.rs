use log::warn;
use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;

/// Levels of nesting expanded below a stack slot
pub const MAX_DEPTH: usize = 2;

/// Column width scalar values are padded to
pub const FIELD_WIDTH: usize = 20;

/// Columns added per nesting level
pub const INDENT_STEP: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpConfig {
    /// Composites at this depth or deeper print their summary line only
    pub max_depth: usize,
    pub field_width: usize,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            field_width: FIELD_WIDTH,
        }
    }
}

impl DumpConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_field_width(mut self, field_width: usize) -> Self {
        self.field_width = field_width;
        self
    }

    /// Defaults overridden by `STACKDUMP_MAX_DEPTH` and `STACKDUMP_FIELD_WIDTH`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_depth: env_or("STACKDUMP_MAX_DEPTH", defaults.max_depth),
            field_width: env_or("STACKDUMP_FIELD_WIDTH", defaults.field_width),
        }
    }

    /// The process-wide configuration
    pub fn global() -> &'static DumpConfig {
        &CONFIG
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} must be a non-negative integer, got {:?}; using {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

pub static CONFIG: Lazy<DumpConfig> = Lazy::new(DumpConfig::from_env);

pub fn init() {
    Lazy::force(&CONFIG);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DumpConfig::default();
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.field_width, 20);
    }

    #[test]
    fn test_builders() {
        let config = DumpConfig::default().with_max_depth(5).with_field_width(30);
        assert_eq!(config, DumpConfig { max_depth: 5, field_width: 30 });
    }

    #[test]
    fn test_env_fallback() {
        env::set_var("STACKDUMP_TEST_DEPTH", "7");
        assert_eq!(env_or("STACKDUMP_TEST_DEPTH", 2usize), 7);

        env::set_var("STACKDUMP_TEST_DEPTH", "deep");
        assert_eq!(env_or("STACKDUMP_TEST_DEPTH", 2usize), 2);

        env::remove_var("STACKDUMP_TEST_DEPTH");
        assert_eq!(env_or("STACKDUMP_TEST_DEPTH", 2usize), 2);
    }
}
