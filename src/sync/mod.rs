//! Backpressure primitives for cooperative async tasks.
//!
//! # Primitives
//!
//! - [`Condition`]: Level-triggered boolean flag with broadcast wake-up
//! - [`Semaphore`]: Counting semaphore with FIFO, one-wake-per-release hand-off
//! - [`BoundedQueue`]: Capacity-bounded FIFO queue with drain-to-completion close
//!
//! # Suspension Points
//!
//! Only `Semaphore::acquire`, `BoundedQueue::push` (when full) and
//! `BoundedQueue::take` (when empty) ever wait. Every other operation runs to
//! completion inside one short critical section.
//!
//! # Cancel Safety
//!
//! All futures in this module may be dropped at any await point. A dropped
//! waiter deregisters itself; a dropped acquirer that was already handed a
//! permit passes it on. A dropped `push` drops its item with it.

mod condition;
mod queue;
mod semaphore;

pub use condition::{Condition, WaitTrue};
pub use queue::{BoundedQueue, Push, QueueState, QueueStream, Take};
pub use semaphore::{Acquire, OwnedSemaphorePermit, Semaphore, SemaphorePermit};
