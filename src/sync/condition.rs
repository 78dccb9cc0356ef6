//! Level-triggered boolean condition with broadcast wake-up.
//!
//! A [`Condition`] holds a boolean. Tasks await [`Condition::wait_true`];
//! setting the value to `true` wakes every task parked at that moment.
//!
//! Completion of a wait only means the value *was* raised after the task
//! parked. It may have been lowered again by the time the task runs, so
//! callers re-check their real predicate in a loop:
//!
//! ```ignore
//! loop {
//!     if predicate() {
//!         break;
//!     }
//!     condition.wait_true().await;
//! }
//! ```
//!
//! # Cancel Safety
//!
//! Dropping a parked [`WaitTrue`] removes its registration.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

/// A boolean that tasks can wait on until it becomes `true`.
#[derive(Debug)]
pub struct Condition {
    state: Mutex<ConditionState>,
}

#[derive(Debug)]
struct ConditionState {
    value: bool,
    /// Bumped on every `set(true)`; a parked waiter whose generation is
    /// stale has been released.
    generation: u64,
    waiters: Vec<Waiter>,
    next_waiter_id: u64,
}

#[derive(Debug)]
struct Waiter {
    id: u64,
    waker: Waker,
}

impl Condition {
    /// Creates a condition with the given initial value.
    #[must_use]
    pub fn new(value: bool) -> Self {
        Self {
            state: Mutex::new(ConditionState {
                value,
                generation: 0,
                waiters: Vec::new(),
                next_waiter_id: 0,
            }),
        }
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> bool {
        self.state.lock().value
    }

    /// Sets the value. Raising it to `true` wakes every parked waiter.
    pub fn set(&self, value: bool) {
        let wakers = {
            let mut state = self.state.lock();
            state.value = value;
            if !value || state.waiters.is_empty() {
                return;
            }
            state.generation = state.generation.wrapping_add(1);
            std::mem::take(&mut state.waiters)
        };
        for waiter in wakers {
            waiter.waker.wake();
        }
    }

    /// Waits until the value is `true`.
    ///
    /// Completes on the first poll if the value is already `true`.
    pub fn wait_true(&self) -> WaitTrue<'_> {
        WaitTrue {
            condition: self,
            registration: None,
        }
    }

    /// Returns the number of parked waiters.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::new(false)
    }
}

#[derive(Debug, Clone, Copy)]
struct Registration {
    id: u64,
    generation: u64,
}

/// Future returned by [`Condition::wait_true`].
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct WaitTrue<'a> {
    condition: &'a Condition,
    registration: Option<Registration>,
}

impl Future for WaitTrue<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let condition = self.condition;
        let mut state = condition.state.lock();

        if let Some(registration) = self.registration {
            if state.generation != registration.generation {
                // Released by `set(true)`; the entry is already gone.
                drop(state);
                self.registration = None;
                return Poll::Ready(());
            }
            if let Some(waiter) = state
                .waiters
                .iter_mut()
                .find(|waiter| waiter.id == registration.id)
            {
                if !waiter.waker.will_wake(cx.waker()) {
                    waiter.waker.clone_from(cx.waker());
                }
            }
            return Poll::Pending;
        }

        if state.value {
            return Poll::Ready(());
        }

        let id = state.next_waiter_id;
        state.next_waiter_id = state.next_waiter_id.wrapping_add(1);
        let generation = state.generation;
        state.waiters.push(Waiter {
            id,
            waker: cx.waker().clone(),
        });
        drop(state);
        self.registration = Some(Registration { id, generation });
        Poll::Pending
    }
}

impl Drop for WaitTrue<'_> {
    fn drop(&mut self) {
        if let Some(registration) = self.registration.take() {
            let mut state = self.condition.state.lock();
            if state.generation == registration.generation {
                state.waiters.retain(|waiter| waiter.id != registration.id);
            }
        }
    }
}
