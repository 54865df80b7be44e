//! Per-connection configuration.

use std::env;

use crate::error::EconnError;

pub const DEFAULT_TIMEOUT_SETUP_MS: u64 = 30_000;
pub const DEFAULT_TIMEOUT_TERM_MS: u64 = 5_000;

/// The default config, a constant rather than a mutable global.
pub const DEFAULT_CONFIG: Config = Config {
    timeout_setup_ms: DEFAULT_TIMEOUT_SETUP_MS,
    timeout_term_ms: DEFAULT_TIMEOUT_TERM_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub timeout_setup_ms: u64,
    pub timeout_term_ms: u64,
}

impl Config {
    /// Construct and validate a config. `timeout_setup_ms == 0` is illegal
    /// — rejected here, at construction, rather than deferred to the
    /// first `start()` call.
    pub fn new(timeout_setup_ms: u64, timeout_term_ms: u64) -> Result<Self, EconnError> {
        if timeout_setup_ms == 0 {
            return Err(EconnError::Protocol(
                "timeout_setup_ms must be nonzero".into(),
            ));
        }
        Ok(Self {
            timeout_setup_ms,
            timeout_term_ms,
        })
    }

    /// Environment-variable overrides, for the `demo` binary — mirrors the
    /// teacher's `Config::from_env` (typed fallback per variable). Falls
    /// back to [`DEFAULT_CONFIG`] if the environment supplies an invalid
    /// (zero) setup timeout.
    pub fn from_env() -> Self {
        let timeout_setup_ms = env::var("ECONN_TIMEOUT_SETUP_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SETUP_MS);
        let timeout_term_ms = env::var("ECONN_TIMEOUT_TERM_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_TERM_MS);

        Self::new(timeout_setup_ms, timeout_term_ms).unwrap_or(DEFAULT_CONFIG)
    }
}

impl Default for Config {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_setup_timeout_is_rejected() {
        let err = Config::new(0, 5_000).unwrap_err();
        assert!(matches!(err, EconnError::Protocol(_)));
    }

    #[test]
    fn default_matches_spec_constants() {
        let c = Config::default();
        assert_eq!(c.timeout_setup_ms, 30_000);
        assert_eq!(c.timeout_term_ms, 5_000);
    }
}
