//! Mailbox: mutex-guarded FIFO
//!
//! Producers post from any thread; a consumer polls. Nothing here blocks
//! waiting for messages. Arrival listeners are a hint to re-poll and carry no
//! data; they run after the lock is released, once per post call.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Identifies one arrival listener
pub type ListenerId = u64;

/// Global listener ID counter
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

type Listener = Arc<dyn Fn() + Send + Sync>;

struct MailboxState<T> {
    items: VecDeque<T>,
    listeners: Vec<(ListenerId, Listener)>,
}

/// Ordered, thread-safe message queue with filtered removal
pub struct Mailbox<T> {
    state: Mutex<MailboxState<T>>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(MailboxState {
                items: VecDeque::with_capacity(capacity),
                listeners: Vec::new(),
            }),
        }
    }

    /// Pending message count
    pub fn num_messages(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_messages() == 0
    }

    /// Append one message, then notify listeners
    pub fn post_message(&self, message: T) {
        let listeners = {
            let mut state = self.state.lock();
            state.items.push_back(message);
            Self::listeners_of(&state)
        };
        Self::notify(&listeners);
    }

    /// Append a batch in order, then notify listeners once
    pub fn post_messages(&self, messages: impl IntoIterator<Item = T>) {
        let listeners = {
            let mut state = self.state.lock();
            state.items.extend(messages);
            Self::listeners_of(&state)
        };
        Self::notify(&listeners);
    }

    /// Remove and return the first message accepted by `filter` (or the first
    /// message at all). Leaves the mailbox untouched when nothing matches.
    pub fn get_message(&self, filter: Option<&dyn Fn(&T) -> bool>) -> Option<T> {
        let mut state = self.state.lock();
        let index = match filter {
            Some(accept) => state.items.iter().position(|item| accept(item))?,
            None => 0,
        };
        state.items.remove(index)
    }

    /// Remove every message accepted by `filter`, in mailbox order.
    ///
    /// Pulls one message at a time until none matches; returns an empty vec
    /// when nothing matched.
    pub fn get_messages(&self, filter: Option<&dyn Fn(&T) -> bool>) -> Vec<T> {
        let mut taken = Vec::new();
        while let Some(message) = self.get_message(filter) {
            taken.push(message);
        }
        taken
    }

    /// Drop every pending message, returns how many were dropped
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.items.len();
        state.items.clear();
        dropped
    }

    /// Register an arrival listener
    pub fn on_arrival(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed);
        self.state.lock().listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove an arrival listener
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        state.listeners.len() != before
    }

    fn listeners_of(state: &MailboxState<T>) -> Vec<Listener> {
        state.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
    }

    fn notify(listeners: &[Listener]) {
        for listener in listeners {
            listener();
        }
    }
}

impl<T> fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Mailbox")
            .field("pending", &state.items.len())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}
