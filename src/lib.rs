//! Coopsync: backpressure primitives for async task runtimes.
//!
//! # Overview
//!
//! A task client that multiplexes many logical tasks on shared executors
//! needs two building blocks to avoid overload without busy-waiting:
//!
//! - a [`Semaphore`](sync::Semaphore) to cap how many tasks run at once, and
//! - a [`BoundedQueue`](sync::BoundedQueue) to hand work between producers
//!   and consumers with backpressure and a graceful, draining shutdown.
//!
//! Both are plain futures and work under any executor that honours `Waker`s.
//!
//! # Core Guarantees
//!
//! - **Fair hand-off**: each semaphore release wakes exactly one waiter, oldest first
//! - **Bounded buffering**: an open queue never holds more than its capacity
//! - **FIFO delivery**: items come out of the queue in the order they went in
//! - **No silent drops**: a rejected push hands its item back to the caller
//! - **Cancel safety**: dropping any future at an await point leaves no stale state
//!
//! # Module Structure
//!
//! - [`sync`]: The condition flag, semaphore and bounded queue
//! - [`error`]: Error types
//! - [`config`]: Sizing configuration with env and TOML overrides
//! - [`tracing_compat`]: Structured logging facade

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod error;
pub mod sync;
pub mod tracing_compat;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::SyncConfig;
pub use error::{
    AcquireError, ConfigError, Error, ErrorKind, PushError, Result, TryPushError, TryTakeError,
};
pub use sync::{BoundedQueue, Condition, QueueState, Semaphore, SemaphorePermit};
