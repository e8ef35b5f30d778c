//! Debug macros for driver subsystems
//!
//! These macros compile to nothing when debug features are disabled. When
//! enabled, they forward through a sink registered at boot with
//! [`set_debug_sink`] (normally the kernel's serial console); until a sink
//! is registered the output is dropped.

use spin::Mutex;

/// Debug print for the storage subsystem
#[macro_export]
#[cfg(feature = "debug-storage")]
macro_rules! debug_storage {
    ($($arg:tt)*) => {
        $crate::_debug_print("[STORAGE] ", format_args!($($arg)*))
    };
}

#[macro_export]
#[cfg(not(feature = "debug-storage"))]
macro_rules! debug_storage {
    ($($arg:tt)*) => {{
        // Arguments still typecheck when the feature is off
        let _ = format_args!($($arg)*);
    }};
}

/// Debug print for bus enumeration
#[macro_export]
#[cfg(feature = "debug-bus")]
macro_rules! debug_bus {
    ($($arg:tt)*) => {
        $crate::_debug_print("[BUS] ", format_args!($($arg)*))
    };
}

#[macro_export]
#[cfg(not(feature = "debug-bus"))]
macro_rules! debug_bus {
    ($($arg:tt)*) => {{
        let _ = format_args!($($arg)*);
    }};
}

/// Sink signature: subsystem prefix plus the formatted message.
pub type DebugSink = fn(&str, core::fmt::Arguments);

static DEBUG_SINK: Mutex<Option<DebugSink>> = Mutex::new(None);

/// Register the output sink used by the debug macros.
///
/// Later registrations replace earlier ones.
pub fn set_debug_sink(sink: DebugSink) {
    *DEBUG_SINK.lock() = Some(sink);
}

/// Debug output function - dispatches to the registered sink
#[doc(hidden)]
pub fn _debug_print(prefix: &str, args: core::fmt::Arguments) {
    if let Some(sink) = *DEBUG_SINK.lock() {
        sink(prefix, args);
    }
}
