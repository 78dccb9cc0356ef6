//! Logging facade for the synchronization primitives.
//!
//! With the `tracing-integration` feature (on by default) the macros below are
//! the ones from the `tracing` crate. Without it they expand to nothing, so
//! the primitives carry no logging cost at all.
//!
//! ```rust,ignore
//! use coopsync::tracing_compat::{debug, trace};
//!
//! trace!(waiters = 3, "semaphore acquire parked");
//! debug!("queue closed");
//! ```

#[cfg(feature = "tracing-integration")]
pub use tracing::{debug, info, trace, warn};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    //! Macros that swallow their arguments.

    /// No-op trace-level logging macro.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// No-op debug-level logging macro.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// No-op info-level logging macro.
    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    /// No-op warn-level logging macro.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }

    pub use crate::{debug, info, trace, warn};
}

#[cfg(not(feature = "tracing-integration"))]
pub use noop::*;
