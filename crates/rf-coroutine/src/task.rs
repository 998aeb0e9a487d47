//! Scheduling handles
//!
//! A [`TaskHandle`] is the externally visible "running task". It owns the root
//! [`Coroutine`] of one routine and is stepped by whichever host started it.
//! Handles are cheap to clone; all clones refer to the same task.
//!
//! Handles are `!Send`: a task belongs to exactly one host tick loop.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use rf_core::SharedClock;

use crate::coroutine::Coroutine;
use crate::error::{SchedulerError, SchedulerResult};
use crate::instruction::Instruction;
use crate::routine::Routine;

// ═══════════════════════════════════════════════════════════════════════════════
// TASK ID GENERATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Unique identifier for a scheduled task
pub type TaskId = u64;

/// Global task ID counter
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Generate unique task ID
#[inline]
pub fn generate_task_id() -> TaskId {
    NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TASK STATE / HOST HOOK
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle of a task (one-way)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Running,
    Stopped,
}

/// Whatever owns the list a task is ticked from
pub trait TaskHost {
    /// Remove the task from the host's update list
    fn detach(&self, id: TaskId);
}

// ═══════════════════════════════════════════════════════════════════════════════
// TASK HANDLE
// ═══════════════════════════════════════════════════════════════════════════════

struct TaskInner {
    id: TaskId,
    label: Option<String>,
    state: Cell<TaskState>,
    root: RefCell<Coroutine>,
    clock: SharedClock,
    host: Option<Weak<dyn TaskHost>>,
}

/// Handle to a running routine
#[derive(Clone)]
pub struct TaskHandle {
    inner: Rc<TaskInner>,
}

impl TaskHandle {
    /// Wrap `routine` in an eager root coroutine owned by `host`.
    ///
    /// The routine's first step runs here, before the host ever ticks it.
    pub fn new<R: Routine + 'static>(
        routine: R,
        clock: SharedClock,
        host: Option<Weak<dyn TaskHost>>,
    ) -> Self {
        Self::with_label(None, routine, clock, host)
    }

    /// Same as [`TaskHandle::new`] with a label for diagnostics
    pub fn with_label<R: Routine + 'static>(
        label: Option<String>,
        routine: R,
        clock: SharedClock,
        host: Option<Weak<dyn TaskHost>>,
    ) -> Self {
        let id = generate_task_id();
        log::debug!("Task {} started ({})", id, label.as_deref().unwrap_or("-"));
        Self {
            inner: Rc::new(TaskInner {
                id,
                label,
                state: Cell::new(TaskState::Running),
                root: RefCell::new(Coroutine::new(routine)),
                clock,
                host,
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        self.inner.state.get()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    /// Advance the task by one tick.
    ///
    /// Checks the root coroutine against the host clock; the task stops itself
    /// once the routine is exhausted. Stepping a stopped task is a no-op.
    /// Panics raised by routine code propagate to the caller.
    pub fn do_step(&self, delta: f64) -> SchedulerResult<TaskState> {
        if !self.is_running() {
            return Ok(TaskState::Stopped);
        }

        let done = {
            let mut root = self
                .inner
                .root
                .try_borrow_mut()
                .map_err(|_| SchedulerError::Reentrant(self.inner.id))?;
            root.check(self.inner.clock.now(), delta)
        };

        if done {
            log::trace!("Task {} finished", self.inner.id);
            self.stop();
        }
        Ok(self.state())
    }

    /// Stop the task immediately.
    ///
    /// Detaches from the host and abandons the routine at its current
    /// suspension point. Idempotent: the host hook runs at most once.
    pub fn stop(&self) {
        if !self.is_running() {
            return;
        }
        self.inner.state.set(TaskState::Stopped);

        if let Some(host) = self.inner.host.as_ref().and_then(Weak::upgrade) {
            host.detach(self.inner.id);
        }
    }

    /// Both handles refer to the same task
    pub fn ptr_eq(&self, other: &TaskHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("state", &self.inner.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::{self, Sequence};
    use rf_core::ManualClock;
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingHost {
        detached: RefCell<Vec<TaskId>>,
    }

    impl TaskHost for CountingHost {
        fn detach(&self, id: TaskId) {
            self.detached.borrow_mut().push(id);
        }
    }

    fn clock() -> SharedClock {
        Arc::new(ManualClock::default())
    }

    fn hosted<R: Routine + 'static>(routine: R) -> (Rc<CountingHost>, TaskHandle) {
        let host = Rc::new(CountingHost::default());
        let weak: Weak<dyn TaskHost> = Rc::downgrade(&host) as Weak<dyn TaskHost>;
        let task = TaskHandle::new(routine, clock(), Some(weak));
        (host, task)
    }

    #[test]
    fn test_task_runs_to_completion() {
        let (host, task) = hosted(Sequence::new().wait(0.5).wait(0.5));
        assert!(task.is_running());

        assert_eq!(task.do_step(0.25).unwrap(), TaskState::Running);
        assert_eq!(task.do_step(0.25).unwrap(), TaskState::Running);
        assert_eq!(task.do_step(0.25).unwrap(), TaskState::Running);
        assert_eq!(task.do_step(0.25).unwrap(), TaskState::Stopped);
        assert!(host.detached.borrow().len() == 1);
        task.do_step(0.25).unwrap();
        assert_eq!(*host.detached.borrow(), vec![task.id()]);
    }

    #[test]
    fn test_zero_step_task_finishes_on_first_step() {
        let (host, task) = hosted(routine::empty());
        // not finished at start
        assert!(task.is_running());
        assert!(host.detached.borrow().is_empty());

        assert_eq!(task.do_step(0.0).unwrap(), TaskState::Stopped);
        assert_eq!(host.detached.borrow().len(), 1);
    }

    #[test]
    fn test_double_stop_detaches_once() {
        let (host, task) = hosted(Sequence::new().wait(10.0));
        task.stop();
        task.stop();
        assert!(!task.is_running());
        assert_eq!(host.detached.borrow().len(), 1);
    }

    #[test]
    fn test_stopped_task_ignores_steps() {
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let (_host, task) = hosted(Sequence::new().wait(0.1).then(move || flag.set(true)));

        task.stop();
        assert_eq!(task.do_step(1.0).unwrap(), TaskState::Stopped);
        assert!(!ran.get());
    }

    #[test]
    fn test_self_stop_from_routine() {
        let slot: Rc<RefCell<Option<TaskHandle>>> = Rc::new(RefCell::new(None));
        let inner_slot = Rc::clone(&slot);
        let (host, task) = hosted(
            Sequence::new()
                .wait(0.1)
                .then(move || {
                    if let Some(me) = inner_slot.borrow().as_ref() {
                        me.stop();
                    }
                })
                .wait(0.1),
        );
        *slot.borrow_mut() = Some(task.clone());

        assert_eq!(task.do_step(0.1).unwrap(), TaskState::Stopped);
        assert_eq!(host.detached.borrow().len(), 1);
        slot.borrow_mut().take();
    }

    #[test]
    fn test_reentrant_step_is_rejected() {
        let slot: Rc<RefCell<Option<TaskHandle>>> = Rc::new(RefCell::new(None));
        let result = Rc::new(RefCell::new(None));

        let inner_slot = Rc::clone(&slot);
        let inner_result = Rc::clone(&result);
        let (_host, task) = hosted(Sequence::new().wait(0.1).then(move || {
            if let Some(me) = inner_slot.borrow().as_ref() {
                *inner_result.borrow_mut() = Some(me.do_step(0.1));
            }
        }));
        *slot.borrow_mut() = Some(task.clone());

        task.do_step(0.1).unwrap();
        assert_eq!(
            *result.borrow(),
            Some(Err(SchedulerError::Reentrant(task.id())))
        );
        slot.borrow_mut().take();
    }

    #[test]
    fn test_dropped_host_is_tolerated() {
        let (host, task) = hosted(Sequence::new().wait(1.0));
        drop(host);
        task.stop();
        assert_eq!(task.state(), TaskState::Stopped);
    }

    #[test]
    fn test_instructions_see_host_clock() {
        let clock = Arc::new(ManualClock::new(100.0));
        let seen = Rc::new(Cell::new(0.0));
        let recorder = Rc::clone(&seen);

        struct RecordNow(Rc<Cell<f64>>);
        impl Instruction for RecordNow {
            fn check(&mut self, now: f64, _delta: f64) -> bool {
                self.0.set(now);
                true
            }
        }

        let task = TaskHandle::new(
            std::iter::once(Box::new(RecordNow(recorder)) as Box<dyn Instruction>),
            clock.clone(),
            None,
        );
        clock.advance(0.5);
        task.do_step(0.5).unwrap();
        assert_eq!(seen.get(), 100.5);
        assert!(!task.is_running());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = TaskHandle::new(routine::empty(), clock(), None);
        let b = TaskHandle::new(routine::empty(), clock(), None);
        assert_ne!(a.id(), b.id());
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }
}
