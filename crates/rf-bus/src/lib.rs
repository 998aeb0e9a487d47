//! ReelForge Message Bus
//!
//! Typed, thread-safe notifications between the logic context (game rules)
//! and the presentation context (visuals/audio):
//! - Mailbox: mutex-guarded FIFO with filtered, non-blocking removal
//! - Channel: immediate and batched sends, type-aware multicast dispatch
//! - ChannelPair: the two fixed directions, with explicit init/deinit
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   Logic context                         Presentation context     │
//! │   ┌─────────────────┐                  ┌─────────────────┐       │
//! │   │ send()          │──logic->pres────▶│ dispatch_all()  │       │
//! │   │ enqueue()+flush │   (Mailbox)      │  └─ handlers    │       │
//! │   │                 │                  │                 │       │
//! │   │ dispatch_all()  │◀──pres->logic────│ send()          │       │
//! │   └─────────────────┘   (Mailbox)      └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The mailbox lock is only held to mutate or read the queue; handlers run
//! after their message has been removed, with no lock held.
//!
//! ## Usage
//!
//! ```rust
//! use rf_bus::{ChannelPair, Context, impl_message};
//!
//! #[derive(Debug)]
//! struct WinPresented {
//!     amount: u64,
//! }
//! impl_message!(WinPresented);
//!
//! let pair = ChannelPair::default();
//! pair.init().unwrap();
//!
//! let logic = pair.link(Context::Logic).unwrap();
//! let presentation = pair.link(Context::Presentation).unwrap();
//!
//! presentation.inbound.add_handler::<WinPresented, _>(|win| {
//!     assert_eq!(win.amount, 250);
//! });
//!
//! logic.outbound.send(WinPresented { amount: 250 });
//! assert!(presentation.inbound.dispatch_all(None));
//!
//! pair.deinit();
//! ```

pub mod channel;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod pair;

// Re-exports
pub use channel::{Channel, MessageFilter};
pub use error::{BusError, BusResult};
pub use mailbox::{ListenerId, Mailbox};
pub use message::{Delivery, HandlerId, HandlerTable, Message};
pub use pair::{ChannelPair, Context, ContextLink, Direction};
