//! Runtime configuration.
//!
//! Defaults can be overridden from the environment (or a `.env` file loaded
//! by the binary); CLI flags override both.
//!
//! | Variable                 | Default    |
//! |--------------------------|------------|
//! | `META2_CUTOFF_YEAR`      | `2021`     |
//! | `META2_PORT`             | `3000`     |
//! | `META2_MAX_UPLOAD_BYTES` | 50 MiB     |

use std::env;
use std::str::FromStr;

use crate::api::logs::log_warning;
use crate::transform::DEFAULT_CUTOFF_YEAR;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum accepted upload size (in bytes).
///
/// 50 MB limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub cutoff_year: i64,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cutoff_year: DEFAULT_CUTOFF_YEAR,
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`; unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            cutoff_year: parse_or(&lookup, "META2_CUTOFF_YEAR", defaults.cutoff_year),
            port: parse_or(&lookup, "META2_PORT", defaults.port),
            max_upload_bytes: parse_or(&lookup, "META2_MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log_warning(format!("Ignoring invalid {}={:?}", key, raw));
            default
        }),
    }
}
