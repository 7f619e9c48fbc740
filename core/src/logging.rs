//! Idempotent logger initialization.
//!
//! Library consumers that install their own `log` backend are unaffected:
//! `env_logger::try_init` is a no-op once any logger is registered.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize `env_logger` once per process. Safe to call from every entry
/// point; later calls do nothing.
pub(crate) fn init() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_default_env().try_init();
    });
}
