//! Environment-based runtime configuration.
//!
//! Loaded once when [`HttpServer::new`] is called; all values can also be set
//! programmatically through [`HttpServer::with_config`].
//!
//! | Variable                    | Meaning                            | Default |
//! |-----------------------------|------------------------------------|---------|
//! | `EMBEDHTTP_STACK_SIZE`      | coroutine stack size in bytes, decimal or `0x` hex | `0x4000` |
//! | `EMBEDHTTP_MAX_HEADER_BYTES`| request header section cap         | 32 KiB  |
//! | `EMBEDHTTP_MAX_BODY_BYTES`  | request body cap                   | 1 MiB   |
//!
//! Requests exceeding either cap receive a `400 Bad Request` stock reply.
//! Stack size trades memory for call depth: total virtual memory is roughly
//! `stack_size` times the number of concurrent connections, so tune it to the
//! deepest handler rather than defaulting large.
//!
//! [`HttpServer::new`]: crate::server::HttpServer::new
//! [`HttpServer::with_config`]: crate::server::HttpServer::with_config

use std::env;

const DEFAULT_STACK_SIZE: usize = 0x4000;
const DEFAULT_MAX_HEADER_BYTES: usize = 32 * 1024;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Runtime knobs for the server's coroutines and request caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for the accept and connection coroutines, in bytes.
    pub stack_size: usize,
    /// Maximum size of a request's header section before it is rejected.
    pub max_header_bytes: usize,
    /// Maximum declared `Content-Length` before a request is rejected.
    pub max_body_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        Self {
            stack_size: parse_env("EMBEDHTTP_STACK_SIZE").unwrap_or(DEFAULT_STACK_SIZE),
            max_header_bytes: parse_env("EMBEDHTTP_MAX_HEADER_BYTES")
                .unwrap_or(DEFAULT_MAX_HEADER_BYTES),
            max_body_bytes: parse_env("EMBEDHTTP_MAX_BODY_BYTES").unwrap_or(DEFAULT_MAX_BODY_BYTES),
        }
    }
}

fn parse_env(name: &str) -> Option<usize> {
    let val = env::var(name).ok()?;
    if let Some(hex) = val.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.stack_size, 0x4000);
        assert_eq!(config.max_header_bytes, 32 * 1024);
        assert_eq!(config.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn test_parse_env_accepts_hex_and_decimal() {
        env::set_var("EMBEDHTTP_TEST_PARSE", "0x8000");
        assert_eq!(parse_env("EMBEDHTTP_TEST_PARSE"), Some(0x8000));
        env::set_var("EMBEDHTTP_TEST_PARSE", "32768");
        assert_eq!(parse_env("EMBEDHTTP_TEST_PARSE"), Some(32768));
        env::set_var("EMBEDHTTP_TEST_PARSE", "not-a-number");
        assert_eq!(parse_env("EMBEDHTTP_TEST_PARSE"), None);
        env::remove_var("EMBEDHTTP_TEST_PARSE");
    }
}
