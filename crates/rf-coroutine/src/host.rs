//! Per-frame update host
//!
//! [`UpdateRoot`] is the reference tick driver: it owns a list of tasks and
//! steps each of them once per [`UpdateRoot::tick`], keeping its own scaled
//! game clock. Other hosts (per-object lists, fixed-rate loops) follow the
//! same shape: hold handles, implement [`TaskHost`], call `do_step`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use rf_core::{ManualClock, SchedulerConfig, SharedClock, TimeSource};

use crate::error::SchedulerResult;
use crate::routine::Routine;
use crate::task::{TaskHandle, TaskHost, TaskId};

/// Task list shared between the root and its handles
#[derive(Default)]
struct TaskList {
    tasks: RefCell<Vec<TaskHandle>>,
}

impl TaskHost for TaskList {
    fn detach(&self, id: TaskId) {
        self.tasks.borrow_mut().retain(|task| task.id() != id);
    }
}

/// Host that ticks its tasks once per frame
pub struct UpdateRoot {
    list: Rc<TaskList>,
    clock: Arc<ManualClock>,
    config: SchedulerConfig,
    frame: u64,
}

impl Default for UpdateRoot {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl UpdateRoot {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            list: Rc::new(TaskList::default()),
            clock: Arc::new(ManualClock::default()),
            config,
            frame: 0,
        }
    }

    /// Start a routine on this root.
    ///
    /// The routine's first step runs now; its first check happens on the next
    /// [`tick`](Self::tick).
    pub fn start<R: Routine + 'static>(&self, routine: R) -> TaskHandle {
        self.spawn(None, routine)
    }

    /// Start a routine with a diagnostic label
    pub fn start_labeled<R: Routine + 'static>(
        &self,
        label: impl Into<String>,
        routine: R,
    ) -> TaskHandle {
        self.spawn(Some(label.into()), routine)
    }

    fn spawn<R: Routine + 'static>(&self, label: Option<String>, routine: R) -> TaskHandle {
        let host: Weak<dyn TaskHost> = Rc::downgrade(&self.list) as Weak<dyn TaskHost>;
        let task = TaskHandle::with_label(label, routine, self.clock(), Some(host));
        self.list.tasks.borrow_mut().push(task.clone());
        task
    }

    /// Advance the game clock and step every task once.
    ///
    /// Tasks started or stopped while ticking take effect from the next tick.
    /// Returns the number of tasks stepped.
    pub fn tick(&mut self, raw_delta: f64) -> SchedulerResult<usize> {
        let delta = self.config.effective_delta(raw_delta);
        self.clock.advance(delta);
        self.frame += 1;

        let snapshot: Vec<TaskHandle> = self.list.tasks.borrow().clone();
        let mut stepped = 0;
        for task in &snapshot {
            if task.is_running() {
                task.do_step(delta)?;
                stepped += 1;
            }
        }

        log::trace!(
            "Frame {}: stepped {} task(s), {} live",
            self.frame,
            stepped,
            self.len()
        );
        Ok(stepped)
    }

    /// Stop every task on this root
    pub fn stop_all(&self) {
        let snapshot: Vec<TaskHandle> = self.list.tasks.borrow().clone();
        for task in &snapshot {
            task.stop();
        }
        log::debug!("Stopped {} task(s)", snapshot.len());
    }

    /// Live task count
    pub fn len(&self) -> usize {
        self.list.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Game clock seen by this root's tasks
    pub fn clock(&self) -> SharedClock {
        self.clock.clone()
    }

    /// Seconds of scaled game time since creation
    pub fn time(&self) -> f64 {
        self.clock.now()
    }

    /// Ticks performed so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

impl Drop for UpdateRoot {
    fn drop(&mut self) {
        // Outstanding handles must not keep ticking against a dead root.
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::{self, Sequence};
    use approx::assert_relative_eq;
    use std::cell::Cell;

    fn unclamped() -> SchedulerConfig {
        SchedulerConfig {
            time_scale: 1.0,
            max_delta_secs: None,
        }
    }

    #[test]
    fn test_tasks_detach_when_finished() {
        let mut root = UpdateRoot::new(unclamped());
        let short = root.start(Sequence::new().wait(0.5));
        let long = root.start(Sequence::new().wait(1.5));
        assert_eq!(root.len(), 2);

        assert_eq!(root.tick(0.5).unwrap(), 2);
        assert!(!short.is_running());
        assert_eq!(root.len(), 1);

        root.tick(0.5).unwrap();
        root.tick(0.5).unwrap();
        assert!(!long.is_running());
        assert!(root.is_empty());
    }

    #[test]
    fn test_zero_step_task_finishes_on_next_tick() {
        let mut root = UpdateRoot::new(unclamped());
        let task = root.start(routine::empty());
        assert!(task.is_running());
        assert_eq!(root.len(), 1);

        root.tick(0.016).unwrap();
        assert!(!task.is_running());
        assert!(root.is_empty());
    }

    #[test]
    fn test_task_started_during_tick_runs_next_tick() {
        let root = Rc::new(RefCell::new(UpdateRoot::new(unclamped())));
        let child_steps = Rc::new(Cell::new(0u32));

        let spawned: Rc<RefCell<Option<TaskHandle>>> = Rc::new(RefCell::new(None));
        let spawn_slot = Rc::clone(&spawned);
        let counter = Rc::clone(&child_steps);
        let list = Rc::clone(&root.borrow().list);
        let clock = root.borrow().clock();

        // spawn through the shared list, as a routine on the same root would
        root.borrow().start(Sequence::new().next_tick().then(move || {
            let host: Weak<dyn TaskHost> = Rc::downgrade(&list) as Weak<dyn TaskHost>;
            let child = TaskHandle::new(
                routine::from_fn(move || {
                    counter.set(counter.get() + 1);
                    None
                }),
                clock.clone(),
                Some(host),
            );
            list.tasks.borrow_mut().push(child.clone());
            *spawn_slot.borrow_mut() = Some(child);
        }));

        assert_eq!(root.borrow_mut().tick(0.1).unwrap(), 1);
        assert_eq!(root.borrow_mut().tick(0.1).unwrap(), 1);
        let child = spawned.borrow().clone().unwrap();
        // first step ran in the constructor, not yet ticked
        assert_eq!(child_steps.get(), 1);
        assert!(child.is_running());

        assert_eq!(root.borrow_mut().tick(0.1).unwrap(), 1);
        assert!(!child.is_running());
        assert!(root.borrow().is_empty());
    }

    #[test]
    fn test_stop_all() {
        let mut root = UpdateRoot::default();
        let a = root.start(Sequence::new().wait(1.0));
        let b = root.start_labeled("rollup", Sequence::new().wait(1.0));
        assert_eq!(b.label(), Some("rollup"));

        root.stop_all();
        assert!(!a.is_running());
        assert!(!b.is_running());
        assert!(root.is_empty());
        assert_eq!(root.tick(0.1).unwrap(), 0);
    }

    #[test]
    fn test_external_stop_detaches() {
        let mut root = UpdateRoot::new(unclamped());
        let task = root.start(Sequence::new().wait(1.0));
        let keep = root.start(Sequence::new().wait(1.0));

        task.stop();
        assert_eq!(root.len(), 1);
        assert_eq!(root.tick(0.1).unwrap(), 1);
        assert!(keep.is_running());
    }

    #[test]
    fn test_clock_uses_scaled_clamped_delta() {
        let mut root = UpdateRoot::new(SchedulerConfig {
            time_scale: 0.5,
            max_delta_secs: Some(0.1),
        });

        root.tick(0.1).unwrap();
        assert_relative_eq!(root.time(), 0.05);

        // a 3 second stall is clamped
        root.tick(3.0).unwrap();
        assert_relative_eq!(root.time(), 0.15);
        assert_eq!(root.frame(), 2);
    }

    #[test]
    fn test_dropping_root_stops_tasks() {
        let root = UpdateRoot::default();
        let task = root.start(Sequence::new().wait(1.0));
        drop(root);
        assert!(!task.is_running());
    }
}
