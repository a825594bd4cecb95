//! Logging macros gated by a per-module `ENABLE_LOGS` switch.
//!
//! A module opts in by declaring the flag and importing the macros from the crate root:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_info, log_warn};
//!
//! log_info!("Session {} analyzing", session_id);
//! ```
//! Flipping the flag to `false` silences a chatty module (the tick driver, for
//! instance) without touching the global `RUST_LOG` filter.

#[doc(hidden)]
#[macro_export]
macro_rules! gated_log {
    ($level:ident, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::$level!($($arg)*);
        }
    };
}

/// `log::debug!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::gated_log!(debug, $($arg)*) };
}

/// `log::info!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::gated_log!(info, $($arg)*) };
}

/// `log::warn!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::gated_log!(warn, $($arg)*) };
}

/// `log::error!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::gated_log!(error, $($arg)*) };
}
