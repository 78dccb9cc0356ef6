//! Counting semaphore with FIFO hand-off.
//!
//! A [`Semaphore`] bounds concurrent access to a pool of permits. Waiting
//! acquirers form a FIFO queue. Each [`Semaphore::release`] either hands its
//! permit straight to the acquirer at the head of the queue, waking exactly
//! that one task, or returns it to the pool when nobody is waiting. There is
//! no wake-all on release, so a contended semaphore does not stampede.
//!
//! # Cancel Safety
//!
//! - Dropping a parked [`Acquire`] removes it from the queue.
//! - Dropping an [`Acquire`] that was handed a permit but never polled to
//!   completion passes the permit on, so permits never leak.
//!
//! # Abort
//!
//! [`Semaphore::abort`] shuts the wake channel for good. Every parked
//! acquirer resolves with [`AcquireError::Aborted`], as does any later
//! acquirer that would have to park. Permits already in the pool can still be
//! taken, and `release` keeps working so teardown code can return resources.
//!
//! # Example
//!
//! ```ignore
//! use coopsync::sync::Semaphore;
//!
//! let sem = Semaphore::new(2);
//!
//! sem.acquire().await?;
//! run_activity().await;
//! sem.release();
//!
//! // Or let a guard release on drop.
//! let _permit = sem.permit().await?;
//! ```

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::error::AcquireError;
use crate::tracing_compat::{debug, trace};

/// A counting semaphore for limiting concurrent access.
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<SemaphoreState>,
}

#[derive(Debug)]
struct SemaphoreState {
    /// Permits in the pool. Always zero while `waiters` is non-empty.
    permits: usize,
    /// Set once by `abort`.
    aborted: bool,
    /// Parked acquirers, oldest first.
    waiters: VecDeque<Waiter>,
    /// Acquirers that were handed a permit but have not observed it yet.
    granted: HashSet<u64>,
    next_waiter_id: u64,
}

#[derive(Debug)]
struct Waiter {
    id: u64,
    waker: Waker,
}

impl SemaphoreState {
    /// Returns one permit: hands it to the oldest waiter if there is one.
    fn release_one(&mut self) -> Option<Waker> {
        if let Some(waiter) = self.waiters.pop_front() {
            self.granted.insert(waiter.id);
            Some(waiter.waker)
        } else {
            self.permits = self.permits.saturating_add(1);
            None
        }
    }
}

impl Semaphore {
    /// Creates a new semaphore with the given number of permits.
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(SemaphoreState {
                permits,
                aborted: false,
                waiters: VecDeque::new(),
                granted: HashSet::new(),
                next_waiter_id: 0,
            }),
        }
    }

    /// Returns the number of permits currently in the pool.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.state.lock().permits
    }

    /// Returns the number of parked acquirers.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Returns true once [`abort`](Self::abort) has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.state.lock().aborted
    }

    /// Waits for a permit and consumes it.
    ///
    /// The caller owns the permit afterwards and gives it back with
    /// [`release`](Self::release).
    pub fn acquire(&self) -> Acquire<'_> {
        Acquire {
            semaphore: self,
            waiter_id: None,
        }
    }

    /// Takes a permit if one is in the pool, without waiting.
    ///
    /// Returns `false`, changing nothing, when the pool is empty.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.permits == 0 {
            return false;
        }
        state.permits -= 1;
        true
    }

    /// Returns one permit.
    ///
    /// Wakes at most one parked acquirer. The pool may grow past its initial
    /// size if callers release more than they acquired.
    pub fn release(&self) {
        let waker = self.state.lock().release_one();
        if let Some(waker) = waker {
            trace!("semaphore permit handed to parked acquirer");
            waker.wake();
        }
    }

    /// Returns `count` permits at once.
    pub fn add_permits(&self, count: usize) {
        let wakers: Vec<Waker> = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let handed = count.min(state.waiters.len());
            let granted = &mut state.granted;
            let wakers = state
                .waiters
                .drain(..handed)
                .map(|waiter| {
                    granted.insert(waiter.id);
                    waiter.waker
                })
                .collect();
            state.permits = state.permits.saturating_add(count - handed);
            wakers
        };
        trace!(count, handed_off = wakers.len(), "semaphore permits added");
        for waker in wakers {
            waker.wake();
        }
    }

    /// Permanently disables waiting on this semaphore.
    ///
    /// Parked acquirers resolve with [`AcquireError::Aborted`].
    pub fn abort(&self) {
        let wakers: Vec<Waker> = {
            let mut state = self.state.lock();
            if state.aborted {
                return;
            }
            state.aborted = true;
            state.waiters.drain(..).map(|waiter| waiter.waker).collect()
        };
        debug!(parked = wakers.len(), "semaphore aborted");
        for waker in wakers {
            waker.wake();
        }
    }

    /// Waits for a permit and wraps it in a guard that releases on drop.
    pub async fn permit(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.acquire().await?;
        Ok(SemaphorePermit { semaphore: self })
    }

    /// Takes a guarded permit if one is in the pool.
    pub fn try_permit(&self) -> Option<SemaphorePermit<'_>> {
        self.try_acquire()
            .then(|| SemaphorePermit { semaphore: self })
    }

    /// Like [`permit`](Self::permit), but the guard keeps the semaphore alive.
    pub async fn permit_owned(self: Arc<Self>) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.acquire().await?;
        Ok(OwnedSemaphorePermit { semaphore: self })
    }
}

/// Future returned by [`Semaphore::acquire`].
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Acquire<'a> {
    semaphore: &'a Semaphore,
    /// Set while this acquirer sits in the wait queue or holds a grant.
    waiter_id: Option<u64>,
}

impl Future for Acquire<'_> {
    type Output = Result<(), AcquireError>;

    fn poll(mut self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
        let semaphore = self.semaphore;
        let mut state = semaphore.state.lock();

        if let Some(waiter_id) = self.waiter_id {
            if state.granted.remove(&waiter_id) {
                drop(state);
                self.waiter_id = None;
                return Poll::Ready(Ok(()));
            }
            if state.aborted {
                state.waiters.retain(|waiter| waiter.id != waiter_id);
                drop(state);
                self.waiter_id = None;
                return Poll::Ready(Err(AcquireError::Aborted));
            }
            if let Some(existing) = state
                .waiters
                .iter_mut()
                .find(|waiter| waiter.id == waiter_id)
            {
                if !existing.waker.will_wake(context.waker()) {
                    existing.waker.clone_from(context.waker());
                }
            }
            return Poll::Pending;
        }

        if state.permits > 0 {
            debug_assert!(state.waiters.is_empty(), "permits pooled while waiters parked");
            state.permits -= 1;
            return Poll::Ready(Ok(()));
        }

        if state.aborted {
            return Poll::Ready(Err(AcquireError::Aborted));
        }

        let waiter_id = state.next_waiter_id;
        state.next_waiter_id = state.next_waiter_id.wrapping_add(1);
        state.waiters.push_back(Waiter {
            id: waiter_id,
            waker: context.waker().clone(),
        });
        trace!(waiters = state.waiters.len(), "semaphore acquire parked");
        drop(state);
        self.waiter_id = Some(waiter_id);
        Poll::Pending
    }
}

impl Drop for Acquire<'_> {
    fn drop(&mut self) {
        let Some(waiter_id) = self.waiter_id.take() else {
            return;
        };
        let waker = {
            let mut state = self.semaphore.state.lock();
            if state.granted.remove(&waiter_id) {
                // Handed a permit we will never use: pass it on.
                state.release_one()
            } else {
                state.waiters.retain(|waiter| waiter.id != waiter_id);
                None
            }
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// A permit that is released when dropped.
#[derive(Debug)]
#[must_use = "permit will be immediately released if not held"]
pub struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
}

impl SemaphorePermit<'_> {
    /// Keeps the permit consumed instead of releasing it on drop.
    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

/// An owned permit that is released when dropped.
#[derive(Debug)]
#[must_use = "permit will be immediately released if not held"]
pub struct OwnedSemaphorePermit {
    semaphore: Arc<Semaphore>,
}

impl OwnedSemaphorePermit {
    /// Returns the semaphore this permit belongs to.
    #[must_use]
    pub fn semaphore(&self) -> &Arc<Semaphore> {
        &self.semaphore
    }
}

impl Drop for OwnedSemaphorePermit {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}
