//! Logging initialization utilities.

use env_logger::Env;

/// Initialize logging with a default filter level.
pub fn init() {
    let env = Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env).init();
}

/// Initialize logging for tests; safe to call more than once.
pub fn try_init_for_tests() {
    let env = Env::default().default_filter_or("debug");
    let _ = env_logger::Builder::from_env(env).is_test(true).try_init();
}
