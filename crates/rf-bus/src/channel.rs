//! Channel: one direction of cross-context traffic
//!
//! ```text
//!   producer thread                         consumer thread
//!   ───────────────                         ───────────────
//!   send(m) ───────────────┐
//!                          ▼
//!   enqueue(m) ──▶ [batch] ──flush──▶ Mailbox ──dispatch──▶ handlers by view
//! ```
//!
//! Messages become visible to dispatch in the order they reach the mailbox.
//! A flushed batch lands as one block behind whatever was already visible.
//! Dispatch removes messages first, then runs handlers with no lock held, so a
//! handler may send, subscribe or unsubscribe freely.

use std::fmt;

use parking_lot::Mutex;
use rf_core::BusConfig;

use crate::mailbox::{ListenerId, Mailbox};
use crate::message::{Delivery, HandlerId, HandlerTable, Message};

/// Predicate over pending messages
pub type MessageFilter<'a> = &'a dyn Fn(&dyn Message) -> bool;

/// Directional message channel
pub struct Channel {
    name: String,
    mailbox: Mailbox<Box<dyn Message>>,
    /// Enqueued but not yet flushed
    batch: Mutex<Vec<Box<dyn Message>>>,
    handlers: HandlerTable,
    trace: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>, config: &BusConfig) -> Self {
        Self {
            name: name.into(),
            mailbox: Mailbox::with_capacity(config.initial_capacity),
            batch: Mutex::new(Vec::new()),
            handlers: HandlerTable::new(),
            trace: config.trace_traffic,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PRODUCER SIDE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Post a message for immediate visibility
    pub fn send<M: Message>(&self, message: M) {
        self.send_boxed(Box::new(message));
    }

    /// Post an already boxed message for immediate visibility
    pub fn send_boxed(&self, message: Box<dyn Message>) {
        if self.trace {
            log::trace!("[{}] send {:?}", self.name, message);
        }
        self.mailbox.post_message(message);
    }

    /// Hold a message back until [`send_enqueued_messages`](Self::send_enqueued_messages)
    pub fn enqueue_message<M: Message>(&self, message: M) {
        self.enqueue_boxed(Box::new(message));
    }

    pub fn enqueue_boxed(&self, message: Box<dyn Message>) {
        if self.trace {
            log::trace!("[{}] enqueue {:?}", self.name, message);
        }
        self.batch.lock().push(message);
    }

    /// Make every enqueued message visible as one block.
    ///
    /// Returns the number of messages flushed; an empty buffer posts nothing.
    pub fn send_enqueued_messages(&self) -> usize {
        let batch = std::mem::take(&mut *self.batch.lock());
        let count = batch.len();
        if count > 0 {
            if self.trace {
                log::trace!("[{}] flush {} enqueued message(s)", self.name, count);
            }
            self.mailbox.post_messages(batch);
        }
        count
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SUBSCRIPTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Subscribe to every message viewable as `T`.
    ///
    /// `T` is a concrete message type, a capability trait object the message
    /// lists in its [`Message::deliver`], or `dyn Message` for all traffic.
    pub fn add_handler<T, F>(&self, handler: F) -> HandlerId
    where
        T: ?Sized + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.handlers.add::<T, F>(handler)
    }

    /// Unsubscribe one handler registered under `T`
    pub fn remove_handler<T: ?Sized + 'static>(&self, id: HandlerId) -> bool {
        self.handlers.remove::<T>(id)
    }

    /// Handlers currently registered under `T`
    pub fn handler_count<T: ?Sized + 'static>(&self) -> usize {
        self.handlers.count::<T>()
    }

    /// Drop every subscription
    pub fn clear_handlers(&self) {
        self.handlers.clear();
    }

    /// Arrival hint, fired once per send or flush
    pub fn on_arrival(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        self.mailbox.on_arrival(listener)
    }

    pub fn remove_arrival_listener(&self, id: ListenerId) -> bool {
        self.mailbox.remove_listener(id)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONSUMER SIDE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Dispatch the first visible message accepted by `filter`.
    ///
    /// Returns `false` when nothing matched. A message without subscribers is
    /// still consumed.
    pub fn dispatch_one(&self, filter: Option<MessageFilter<'_>>) -> bool {
        let message = match filter {
            Some(accept) => self
                .mailbox
                .get_message(Some(&|m: &Box<dyn Message>| accept(&**m))),
            None => self.mailbox.get_message(None),
        };
        match message {
            Some(message) => {
                self.route(&*message);
                true
            }
            None => false,
        }
    }

    /// Dispatch every visible message accepted by `filter`, in order.
    ///
    /// Messages sent by handlers during this call are left for the next one.
    pub fn dispatch_all(&self, filter: Option<MessageFilter<'_>>) -> bool {
        let batch = match filter {
            Some(accept) => self
                .mailbox
                .get_messages(Some(&|m: &Box<dyn Message>| accept(&**m))),
            None => self.mailbox.get_messages(None),
        };
        for message in &batch {
            self.route(&**message);
        }
        !batch.is_empty()
    }

    /// Drop everything pending, visible or enqueued, without dispatching
    pub fn force_clear_messages(&self) -> usize {
        let enqueued = {
            let mut batch = self.batch.lock();
            let count = batch.len();
            batch.clear();
            count
        };
        let visible = self.mailbox.clear();
        if enqueued + visible > 0 {
            log::debug!(
                "[{}] force-cleared {} visible and {} enqueued message(s)",
                self.name,
                visible,
                enqueued
            );
        }
        enqueued + visible
    }

    /// Messages visible to dispatch
    pub fn pending_count(&self) -> usize {
        self.mailbox.num_messages()
    }

    /// Messages waiting for a flush
    pub fn enqueued_count(&self) -> usize {
        self.batch.lock().len()
    }

    fn route(&self, message: &dyn Message) {
        let mut delivery = Delivery::new(&self.handlers);
        message.deliver(&mut delivery);
        delivery.offer::<dyn Message>(message);

        if self.trace {
            log::trace!(
                "[{}] dispatched {} to {} handler(s)",
                self.name,
                message.type_name(),
                delivery.invoked()
            );
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("pending", &self.pending_count())
            .field("enqueued", &self.enqueued_count())
            .field("handlers", &self.handlers)
            .finish()
    }
}
