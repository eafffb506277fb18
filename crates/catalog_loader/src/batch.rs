use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

struct BufferState<S, I> {
    /// Items discovered since the last delivery, in discovery order.
    pending: Vec<I>,
    uncommitted: HashMap<S, Vec<I>>,
    /// Sources in the order they were first seen, for a stable snapshot.
    source_order: Vec<S>,
    /// Deliveries that took a batch but have not returned from the callback yet.
    in_flight: usize,
    delivered: usize,
}

impl<S, I> BufferState<S, I> {
    fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.in_flight == 0
    }
}

/// Pending batch plus per-source uncommitted tracking, behind one lock.
///
/// Items are cloned into both collections, so `I` should be a cheap handle
/// (an `Arc`, an id) when the payload is large.
pub struct ItemBuffer<S, I> {
    state: Mutex<BufferState<S, I>>,
    drained: Condvar,
}

impl<S, I> Default for ItemBuffer<S, I>
where
    S: Clone + Eq + Hash,
    I: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, I> ItemBuffer<S, I>
where
    S: Clone + Eq + Hash,
    I: Clone,
{
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BufferState {
                pending: Vec::new(),
                uncommitted: HashMap::new(),
                source_order: Vec::new(),
                in_flight: 0,
                delivered: 0,
            }),
            drained: Condvar::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, BufferState<S, I>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_item(&self, source: &S, item: I) {
        let mut state = self.state();
        state.pending.push(item.clone());
        match state.uncommitted.get_mut(source) {
            Some(items) => items.push(item),
            None => {
                state.source_order.push(source.clone());
                state.uncommitted.insert(source.clone(), vec![item]);
            }
        }
    }

    /// Marks everything reported so far for `source` as final. The pending
    /// batch is untouched. Returns how many items were released.
    pub fn commit_items(&self, source: &S) -> usize {
        let mut state = self.state();
        state
            .uncommitted
            .get_mut(source)
            .map(|items| std::mem::take(items).len())
            .unwrap_or(0)
    }

    /// Hands the pending batch to `update` and wakes drain waiters once it
    /// returns or unwinds. An empty batch skips `update`. Returns the batch
    /// size.
    ///
    /// The batch is detached under the lock and `update` runs without it, so
    /// `update` may call back into the buffer.
    pub fn deliver(&self, update: impl FnOnce(Vec<I>)) -> usize {
        let batch = {
            let mut state = self.state();
            let batch = std::mem::take(&mut state.pending);
            state.in_flight += 1;
            batch
        };

        let count = batch.len();
        let _delivery = InFlight {
            buffer: self,
            count,
        };
        if count > 0 {
            update(batch);
        }
        count
    }

    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    /// Total number of items handed to delivery callbacks so far.
    pub fn delivered(&self) -> usize {
        self.state().delivered
    }

    /// Blocks until the pending batch is empty and no delivery is running.
    pub fn wait_drained(&self) {
        let state = self.state();
        let _state = self
            .drained
            .wait_while(state, |state| !state.is_drained())
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Like [`wait_drained`](Self::wait_drained) with an upper bound. Returns
    /// `true` if the buffer drained in time.
    pub fn wait_drained_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state();
        while !state.is_drained() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .drained
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// Every uncommitted item once, sources in first-seen order. An item
    /// reported more than once keeps its first position.
    pub fn uncommitted_snapshot(&self) -> Vec<I>
    where
        I: Eq + Hash,
    {
        let state = self.state();
        let mut seen = HashSet::new();
        state
            .source_order
            .iter()
            .filter_map(|source| state.uncommitted.get(source))
            .flatten()
            .filter(|item| seen.insert(*item))
            .cloned()
            .collect()
    }
}

/// Settles one delivery when dropped, including when the callback panics.
struct InFlight<'a, S, I> {
    buffer: &'a ItemBuffer<S, I>,
    count: usize,
}

impl<S, I> Drop for InFlight<'_, S, I> {
    fn drop(&mut self) {
        let mut state = self
            .buffer
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.in_flight -= 1;
        state.delivered += self.count;
        drop(state);
        self.buffer.drained.notify_all();
    }
}
