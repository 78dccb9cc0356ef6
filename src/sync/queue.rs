//! Bounded FIFO queue with backpressure and drain-to-completion shutdown.
//!
//! [`BoundedQueue`] holds at most `capacity` items. Producers wait in
//! [`push`](BoundedQueue::push) while the buffer is full; consumers wait in
//! [`take`](BoundedQueue::take) while it is empty.
//!
//! # Lifecycle
//!
//! ```text
//! Open ──close()──▶ Closing ──take() finds it empty──▶ Closed
//! ```
//!
//! - `Open`: pushes and takes proceed normally.
//! - `Closing`: new pushes are rejected; buffered items still drain.
//! - `Closed`: drained. Every `take` returns `None` (end of stream) at once,
//!   and pushes still waiting for space fail.
//!
//! # Zero capacity
//!
//! With `capacity == 0` nothing is ever buffered. A push registers its item
//! and stays pending until a consumer takes that exact item (rendezvous).
//! Dropping the pending push withdraws the item, so an item never outlives
//! its producer inside the queue. [`try_push`](BoundedQueue::try_push)
//! cannot wait for a consumer and always reports `Full`.
//!
//! # Wake-ups
//!
//! Two [`Condition`] flags track whether a take (`not_empty`) or a push
//! (`not_full`) can make progress. They are refreshed inside the queue's
//! critical section after every change, and waiters register on them while
//! still holding that lock, so no wake-up is lost between the check and the
//! park. A zero-capacity push is woken directly by the take that consumes
//! its item.
//!
//! # Example
//!
//! ```ignore
//! use coopsync::sync::BoundedQueue;
//!
//! let queue = BoundedQueue::new(16);
//!
//! queue.push(task).await?;
//! while let Some(task) = queue.take().await {
//!     run(task).await;
//! }
//! ```

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use futures_lite::Stream;
use parking_lot::Mutex;

use crate::error::{PushError, TryPushError, TryTakeError};
use crate::sync::condition::{Condition, WaitTrue};
use crate::tracing_compat::{debug, trace};

/// Lifecycle state of a [`BoundedQueue`]. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueueState {
    /// Accepting pushes.
    Open,
    /// `close()` was called; draining buffered items.
    Closing,
    /// Closed and drained.
    Closed,
}

/// A capacity-bounded FIFO queue that can be awaited on both ends.
pub struct BoundedQueue<T> {
    capacity: usize,
    inner: Mutex<QueueInner<T>>,
    not_empty: Condition,
    not_full: Condition,
}

struct QueueInner<T> {
    state: QueueState,
    buffer: VecDeque<T>,
    /// Zero-capacity pushes waiting for a taker, oldest first.
    rendezvous: VecDeque<Offer<T>>,
    /// Offers taken but not yet observed by their push.
    delivered: HashSet<u64>,
    next_offer_id: u64,
}

/// An item still owned by a pending zero-capacity push.
struct Offer<T> {
    id: u64,
    item: T,
    waker: Waker,
}

impl<T> QueueInner<T> {
    fn has_room(&self, capacity: usize) -> bool {
        self.buffer.len() < capacity
    }

    /// Removes the head item. A consumed offer is marked delivered and its
    /// push's waker is returned so the caller can wake it after unlocking.
    fn pop(&mut self) -> Option<(T, Option<Waker>)> {
        if let Some(item) = self.buffer.pop_front() {
            return Some((item, None));
        }
        let offer = self.rendezvous.pop_front()?;
        self.delivered.insert(offer.id);
        Some((offer.item, Some(offer.waker)))
    }

    /// A take can finish: an item is available or the queue is shutting down.
    fn take_ready(&self) -> bool {
        !self.buffer.is_empty() || !self.rendezvous.is_empty() || self.state != QueueState::Open
    }

    /// A buffered push can finish: there is room, or the queue is closed and
    /// the push must fail.
    fn push_ready(&self, capacity: usize) -> bool {
        self.state == QueueState::Closed || self.has_room(capacity)
    }

    /// Marks the queue drained. Returns true on the transition.
    fn mark_closed(&mut self) -> bool {
        if self.state == QueueState::Closed {
            return false;
        }
        self.state = QueueState::Closed;
        true
    }
}

impl<T> BoundedQueue<T> {
    /// Creates an open, empty queue holding at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(QueueInner {
                state: QueueState::Open,
                buffer: VecDeque::new(),
                rendezvous: VecDeque::new(),
                delivered: HashSet::new(),
                next_offer_id: 0,
            }),
            not_empty: Condition::new(false),
            not_full: Condition::new(capacity > 0),
        }
    }

    /// Returns the fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of buffered items. Never exceeds the capacity.
    ///
    /// Items offered by pending zero-capacity pushes still belong to those
    /// pushes and are not counted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().buffer.len()
    }

    /// Returns true if no items are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> QueueState {
        self.inner.lock().state
    }

    /// Returns true once the queue is closed and drained.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == QueueState::Closed
    }

    /// Appends `item` at the tail, waiting while the queue is full.
    ///
    /// Fails with [`PushError::NotOpen`] if the queue is not open at the time
    /// of this call, and with [`PushError::ClosedWhileWaiting`] if it becomes
    /// closed while the push waits for space. The item is handed back in
    /// both cases. A push issued while open may still land during `Closing`.
    pub fn push(&self, item: T) -> Push<'_, T> {
        let open_at_call = self.inner.lock().state == QueueState::Open;
        Push {
            queue: self,
            item: Some(item),
            open_at_call,
            offer: None,
            wait: None,
        }
    }

    /// Appends `item` if there is room right now.
    ///
    /// A zero-capacity queue never has room; use [`push`](Self::push) to
    /// rendezvous with a consumer.
    pub fn try_push(&self, item: T) -> Result<(), TryPushError<T>> {
        let mut inner = self.inner.lock();
        if inner.state != QueueState::Open {
            return Err(TryPushError::NotOpen(item));
        }
        if !inner.has_room(self.capacity) {
            return Err(TryPushError::Full(item));
        }
        inner.buffer.push_back(item);
        self.refresh(&inner);
        Ok(())
    }

    /// Removes and returns the head item, waiting while the queue is empty.
    ///
    /// Returns `None` once the queue has been closed and fully drained; from
    /// then on every call returns `None` immediately.
    pub fn take(&self) -> Take<'_, T> {
        Take {
            queue: self,
            wait: None,
        }
    }

    /// Removes the head item if one is available right now.
    ///
    /// On a zero-capacity queue this completes the oldest pending push.
    pub fn try_take(&self) -> Result<T, TryTakeError> {
        let mut inner = self.inner.lock();
        if let Some((item, waker)) = inner.pop() {
            self.refresh(&inner);
            drop(inner);
            if let Some(waker) = waker {
                waker.wake();
            }
            return Ok(item);
        }
        if inner.state == QueueState::Open {
            return Err(TryTakeError::Empty);
        }
        if inner.mark_closed() {
            debug!(capacity = self.capacity, "bounded queue drained and closed");
        }
        self.refresh(&inner);
        Err(TryTakeError::Closed)
    }

    /// Requests shutdown.
    ///
    /// No new push succeeds afterwards. Buffered items remain available to
    /// `take` until the buffer is empty, then `take` returns `None`. Calling
    /// `close` on a queue that is already closing or closed does nothing.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.state != QueueState::Open {
            return;
        }
        inner.state = QueueState::Closing;
        debug!(
            buffered = inner.buffer.len(),
            offered = inner.rendezvous.len(),
            capacity = self.capacity,
            "bounded queue closing"
        );
        self.refresh(&inner);
    }

    /// Returns a [`Stream`] that yields items until end of stream.
    pub fn stream(&self) -> QueueStream<'_, T> {
        QueueStream {
            queue: self,
            take: None,
            done: false,
        }
    }

    /// Re-derives both readiness flags. Must run under the `inner` lock.
    fn refresh(&self, inner: &QueueInner<T>) {
        self.not_empty.set(inner.take_ready());
        self.not_full.set(inner.push_ready(self.capacity));
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("state", &inner.state)
            .field("len", &inner.buffer.len())
            .field("offered", &inner.rendezvous.len())
            .finish_non_exhaustive()
    }
}

/// Polls a freshly registered wait. If the flag is already up the predicate
/// changed under us; yield once and let the caller re-check.
fn park(wait: &mut WaitTrue<'_>, cx: &mut Context<'_>) {
    if Pin::new(wait).poll(cx).is_ready() {
        cx.waker().wake_by_ref();
    }
}

/// Future returned by [`BoundedQueue::push`].
#[must_use = "futures do nothing unless polled"]
pub struct Push<'a, T> {
    queue: &'a BoundedQueue<T>,
    item: Option<T>,
    /// Queue state was `Open` when `push` was called.
    open_at_call: bool,
    /// Id of our offer while it sits in the rendezvous list.
    offer: Option<u64>,
    wait: Option<WaitTrue<'a>>,
}

// The item is only ever moved out by value, never pinned.
impl<T> Unpin for Push<'_, T> {}

impl<T> fmt::Debug for Push<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Push")
            .field("pending_item", &self.item.is_some())
            .field("open_at_call", &self.open_at_call)
            .field("offer", &self.offer)
            .field("waiting", &self.wait.is_some())
            .finish()
    }
}

impl<T> Future for Push<'_, T> {
    type Output = Result<(), PushError<T>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let queue = this.queue;
        this.wait = None;

        let mut inner = queue.inner.lock();

        if let Some(id) = this.offer {
            if inner.delivered.remove(&id) {
                this.offer = None;
                return Poll::Ready(Ok(()));
            }
            if let Some(offer) = inner.rendezvous.iter_mut().find(|offer| offer.id == id) {
                if !offer.waker.will_wake(cx.waker()) {
                    offer.waker.clone_from(cx.waker());
                }
            }
            return Poll::Pending;
        }

        let Some(item) = this.item.take() else {
            unreachable!("Push polled after completion");
        };

        if !this.open_at_call {
            return Poll::Ready(Err(PushError::NotOpen(item)));
        }

        if inner.state == QueueState::Closed {
            return Poll::Ready(Err(PushError::ClosedWhileWaiting(item)));
        }

        if queue.capacity == 0 {
            let id = inner.next_offer_id;
            inner.next_offer_id = inner.next_offer_id.wrapping_add(1);
            inner.rendezvous.push_back(Offer {
                id,
                item,
                waker: cx.waker().clone(),
            });
            this.offer = Some(id);
            trace!(offered = inner.rendezvous.len(), "bounded queue push offered for rendezvous");
            queue.refresh(&inner);
            return Poll::Pending;
        }

        if inner.has_room(queue.capacity) {
            inner.buffer.push_back(item);
            queue.refresh(&inner);
            return Poll::Ready(Ok(()));
        }

        this.item = Some(item);
        trace!(
            capacity = queue.capacity,
            state = ?inner.state,
            "bounded queue push parked"
        );
        let mut wait = queue.not_full.wait_true();
        park(&mut wait, cx);
        this.wait = Some(wait);
        Poll::Pending
    }
}

impl<T> Drop for Push<'_, T> {
    fn drop(&mut self) {
        let Some(id) = self.offer.take() else {
            return;
        };
        let queue = self.queue;
        let mut inner = queue.inner.lock();
        if inner.delivered.remove(&id) {
            return;
        }
        // Withdraw the offer; the item is dropped with the push.
        inner.rendezvous.retain(|offer| offer.id != id);
        queue.refresh(&inner);
    }
}

/// Future returned by [`BoundedQueue::take`].
#[must_use = "futures do nothing unless polled"]
pub struct Take<'a, T> {
    queue: &'a BoundedQueue<T>,
    wait: Option<WaitTrue<'a>>,
}

impl<T> fmt::Debug for Take<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Take")
            .field("waiting", &self.wait.is_some())
            .finish_non_exhaustive()
    }
}

impl<T> Future for Take<'_, T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let queue = this.queue;
        this.wait = None;

        let mut inner = queue.inner.lock();

        if let Some((item, waker)) = inner.pop() {
            queue.refresh(&inner);
            drop(inner);
            if let Some(waker) = waker {
                waker.wake();
            }
            return Poll::Ready(Some(item));
        }

        if inner.state != QueueState::Open {
            if inner.mark_closed() {
                debug!(capacity = queue.capacity, "bounded queue drained and closed");
            }
            queue.refresh(&inner);
            return Poll::Ready(None);
        }

        trace!(capacity = queue.capacity, "bounded queue take parked");
        let mut wait = queue.not_empty.wait_true();
        park(&mut wait, cx);
        this.wait = Some(wait);
        Poll::Pending
    }
}

/// Stream returned by [`BoundedQueue::stream`].
#[must_use = "streams do nothing unless polled"]
pub struct QueueStream<'a, T> {
    queue: &'a BoundedQueue<T>,
    take: Option<Take<'a, T>>,
    done: bool,
}

impl<T> fmt::Debug for QueueStream<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueStream")
            .field("queue", self.queue)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<T> Stream for QueueStream<'_, T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }
        let queue = this.queue;
        let take = this.take.get_or_insert_with(|| queue.take());
        let Poll::Ready(next) = Pin::new(take).poll(cx) else {
            return Poll::Pending;
        };
        this.take = None;
        this.done = next.is_none();
        Poll::Ready(next)
    }
}
