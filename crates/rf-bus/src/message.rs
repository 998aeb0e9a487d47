//! Messages and type-aware routing
//!
//! A message is an immutable value that crosses between the logic and
//! presentation contexts. Subscribers register under a *view type*:
//! - the concrete message type (`SpinStarted`)
//! - a capability trait object the message implements (`dyn ReelEvent`)
//! - the common tag `dyn Message`, which sees everything
//!
//! Rust has no runtime ancestor walk, so each message type lists its
//! capabilities once, in its [`Message::deliver`] impl. [`impl_message!`]
//! writes that impl.
//!
//! ```rust
//! use rf_bus::{Message, impl_message};
//!
//! pub trait ReelEvent: Message {
//!     fn reel(&self) -> usize;
//! }
//!
//! #[derive(Debug)]
//! pub struct ReelStopped {
//!     pub reel: usize,
//! }
//!
//! impl ReelEvent for ReelStopped {
//!     fn reel(&self) -> usize {
//!         self.reel
//!     }
//! }
//!
//! impl_message!(ReelStopped: dyn ReelEvent);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

// ═══════════════════════════════════════════════════════════════════════════════
// MESSAGE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Type-erasure helper, implemented for every `'static` type.
///
/// Call through `&dyn Message`, never on a `Box<dyn Message>` directly.
#[doc(hidden)]
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn any_type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn any_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Cross-context notification
pub trait Message: AsAny + Send + Sync + fmt::Debug + 'static {
    /// Offer this message to every view type it can be delivered as.
    ///
    /// The default offers the concrete type only. Types with capabilities
    /// offer themselves once per capability (see [`impl_message!`]). The
    /// channel adds the `dyn Message` view itself.
    fn deliver(&self, delivery: &mut Delivery<'_>) {
        delivery.offer::<Self>(self);
    }
}

impl dyn Message {
    /// Concrete type check
    #[inline]
    pub fn is<T: Message>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast to the concrete type
    #[inline]
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Concrete type name, for diagnostics
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.any_type_name()
    }
}

/// Implement [`Message`] for a type, optionally listing the capability views
/// it is delivered under, most specific first.
///
/// Views are not closed over supertraits: list every ancestor view that
/// should receive the message. `impl_message!(BigWin: dyn BigWinEvent)`
/// alone never reaches `dyn WinEvent` subscribers, even when `BigWinEvent:
/// WinEvent`; write `impl_message!(BigWin: dyn BigWinEvent, dyn WinEvent)`.
#[macro_export]
macro_rules! impl_message {
    ($ty:ty : $($view:ty),+ $(,)?) => {
        impl $crate::Message for $ty {
            fn deliver(&self, delivery: &mut $crate::Delivery<'_>) {
                delivery.offer::<$ty>(self);
                $( delivery.offer::<$view>(self); )+
            }
        }
    };
    ($ty:ty) => {
        impl $crate::Message for $ty {}
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLER TABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifies one registered handler
pub type HandlerId = u64;

/// Global handler ID counter
static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct HandlerList<T: ?Sized + 'static> {
    entries: Vec<(HandlerId, Handler<T>)>,
}

/// Multicast subscribers keyed by view type
#[derive(Default)]
pub struct HandlerTable {
    lists: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to messages viewable as `T`
    pub fn add<T, F>(&self, handler: F) -> HandlerId
    where
        T: ?Sized + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed);
        let mut lists = self.lists.write();
        let slot = lists.entry(TypeId::of::<T>()).or_insert_with(|| {
            Box::new(HandlerList::<T> {
                entries: Vec::new(),
            }) as Box<dyn Any + Send + Sync>
        });
        if let Some(list) = slot.downcast_mut::<HandlerList<T>>() {
            list.entries.push((id, Arc::new(handler)));
        }
        id
    }

    /// Unsubscribe one handler; others for the same view are unaffected
    pub fn remove<T: ?Sized + 'static>(&self, id: HandlerId) -> bool {
        let mut lists = self.lists.write();
        let Some(list) = lists
            .get_mut(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_mut::<HandlerList<T>>())
        else {
            return false;
        };

        let before = list.entries.len();
        list.entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = list.entries.len() != before;
        if list.entries.is_empty() {
            lists.remove(&TypeId::of::<T>());
        }
        removed
    }

    /// Handlers registered for `T`
    pub fn count<T: ?Sized + 'static>(&self) -> usize {
        self.lists
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_ref::<HandlerList<T>>())
            .map_or(0, |list| list.entries.len())
    }

    /// Drop every subscription
    pub fn clear(&self) {
        self.lists.write().clear();
    }

    /// Copy of the current handlers for `T`, so none of them runs under the lock
    fn snapshot<T: ?Sized + 'static>(&self) -> Vec<Handler<T>> {
        self.lists
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_ref::<HandlerList<T>>())
            .map(|list| list.entries.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("view_types", &self.lists.read().len())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DELIVERY
// ═══════════════════════════════════════════════════════════════════════════════

/// Routes one message to the handlers of each view it is offered as
pub struct Delivery<'a> {
    table: &'a HandlerTable,
    invoked: usize,
}

impl<'a> Delivery<'a> {
    pub(crate) fn new(table: &'a HandlerTable) -> Self {
        Self { table, invoked: 0 }
    }

    /// Invoke every handler registered for view type `T`
    pub fn offer<T: ?Sized + 'static>(&mut self, view: &T) {
        for handler in self.table.snapshot::<T>() {
            handler(view);
            self.invoked += 1;
        }
    }

    /// Handler invocations so far
    pub fn invoked(&self) -> usize {
        self.invoked
    }
}
