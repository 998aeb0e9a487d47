//! ReelForge Coroutine Scheduler
//!
//! Cooperative, tick-driven execution of multi-step workflows (win displays,
//! stage transitions, gamble flows) without threads or blocking waits:
//! - Routines yield instructions describing what they wait on
//! - Coroutines drive routines one step per tick and nest transparently
//! - Task handles expose start/stop; hosts decide the tick cadence
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │   Host (UpdateRoot, per-object list, ...)                         │
//! │   tick(delta) ──▶ TaskHandle::do_step(delta)                      │
//! │                      │                                            │
//! │                      ▼                                            │
//! │                root Coroutine ──check──▶ current Instruction      │
//! │                      │                    ├── Delay               │
//! │                      │ exhausted?         ├── DelayOrUntil        │
//! │                      ▼                    └── Coroutine (nested)  │
//! │                task stops, host detaches                          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use rf_coroutine::{Sequence, UpdateRoot};
//!
//! let mut root = UpdateRoot::default();
//!
//! let reels = Sequence::new().wait(0.2).wait(0.2);
//! let task = root.start(Sequence::new().nest(reels).wait(0.1));
//!
//! while task.is_running() {
//!     root.tick(0.1).unwrap();
//! }
//! assert!(root.is_empty());
//! ```
//!
//! The scheduler is single-threaded: handles and routines are `!Send` and
//! belong to the thread that ticks them.

pub mod coroutine;
pub mod error;
pub mod host;
pub mod instruction;
pub mod routine;
pub mod task;

// Re-exports
pub use coroutine::{Coroutine, nested};
pub use error::{SchedulerError, SchedulerResult};
pub use host::UpdateRoot;
pub use instruction::{
    BoxedInstruction, Delay, DelayOrUntil, Instruction, NextTick, WaitUntil, WaitWhile,
    next_tick, wait, wait_or_until, wait_until, wait_while,
};
pub use routine::{Routine, Sequence};
pub use task::{TaskHandle, TaskHost, TaskId, TaskState, generate_task_id};
