//! Tracing subscriber setup.

/// Installs the global fmt subscriber.
///
/// Returns `false` when a subscriber was already installed.
pub fn init() -> bool {
    tracing_subscriber::fmt().with_target(false).try_init().is_ok()
}
