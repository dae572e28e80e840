//! Logging macros that set target to "dbauth_bridge" for all log calls.
//!
//! The bridge runs embedded in a larger gateway process whose log routing
//! keys off the target name. Without an explicit target, tracing uses the
//! full module path (e.g., "dbauth_bridge::ticket::bridge"), creating overly
//! verbose logger names. These macros ensure all logs from this crate use a
//! single "dbauth_bridge" target.

macro_rules! trace {
    ($($arg:tt)*) => { ::tracing::trace!(target: "dbauth_bridge", $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { ::tracing::debug!(target: "dbauth_bridge", $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { ::tracing::info!(target: "dbauth_bridge", $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { ::tracing::warn!(target: "dbauth_bridge", $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { ::tracing::error!(target: "dbauth_bridge", $($arg)*) };
}
