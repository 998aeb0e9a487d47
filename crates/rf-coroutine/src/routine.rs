//! Routines: resumable step producers
//!
//! A routine is pulled one step at a time. Each pull runs the routine's code up
//! to its next suspension point and returns what it now waits for, or `None`
//! once it is exhausted. Routines are single-pass and cannot be restarted.
//!
//! Any `Iterator<Item = BoxedInstruction>` is a routine, so plain iterator
//! adapters and `std::iter::from_fn` state machines work directly. [`Sequence`]
//! is a builder for the common "do this, wait, do that" shape.

use std::collections::VecDeque;
use std::fmt;

use crate::coroutine::Coroutine;
use crate::instruction::{self, BoxedInstruction};

/// Resumable step producer
pub trait Routine {
    /// Run to the next suspension point
    fn resume(&mut self) -> Option<BoxedInstruction>;
}

impl<I> Routine for I
where
    I: Iterator<Item = BoxedInstruction>,
{
    #[inline]
    fn resume(&mut self) -> Option<BoxedInstruction> {
        self.next()
    }
}

/// Routine driven by a closure, one call per step
pub fn from_fn<F>(step: F) -> std::iter::FromFn<F>
where
    F: FnMut() -> Option<BoxedInstruction>,
{
    std::iter::from_fn(step)
}

/// Routine that yields nothing
pub fn empty() -> std::iter::Empty<BoxedInstruction> {
    std::iter::empty()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEQUENCE
// ═══════════════════════════════════════════════════════════════════════════════

type Step = Box<dyn FnOnce() -> Option<BoxedInstruction>>;

/// Linear routine built from closures and waits
///
/// Actions run back to back within one pull until a step yields something
/// to wait on.
///
/// ```rust
/// use rf_coroutine::{Sequence, UpdateRoot};
///
/// let root = UpdateRoot::default();
/// let task = root.start(
///     Sequence::new()
///         .then(|| log::info!("reels spinning"))
///         .wait(0.5)
///         .then(|| log::info!("reel 1 stopped")),
/// );
/// assert!(task.is_running());
/// ```
#[derive(Default)]
pub struct Sequence {
    steps: VecDeque<Step>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run an action without suspending
    pub fn then(mut self, action: impl FnOnce() + 'static) -> Self {
        self.steps.push_back(Box::new(move || {
            action();
            None
        }));
        self
    }

    /// Run a step that decides for itself what to wait on
    pub fn step(mut self, step: impl FnOnce() -> Option<BoxedInstruction> + 'static) -> Self {
        self.steps.push_back(Box::new(step));
        self
    }

    /// Suspend for `seconds` of tick time
    pub fn wait(self, seconds: f64) -> Self {
        self.step(move || Some(instruction::wait(seconds)))
    }

    /// Suspend for `seconds`, or less if `predicate` turns true
    pub fn wait_or_until(self, seconds: f64, predicate: impl FnMut() -> bool + 'static) -> Self {
        self.step(move || Some(instruction::wait_or_until(seconds, predicate)))
    }

    /// Suspend until `predicate` turns true
    pub fn wait_until(self, predicate: impl FnMut() -> bool + 'static) -> Self {
        self.step(move || Some(instruction::wait_until(predicate)))
    }

    /// Suspend for exactly one tick
    pub fn next_tick(self) -> Self {
        self.step(|| Some(instruction::next_tick()))
    }

    /// Run another routine to completion before continuing.
    ///
    /// The nested routine's first step runs when this point is reached.
    pub fn nest<R: Routine + 'static>(self, routine: R) -> Self {
        self.step(move || Some(Box::new(Coroutine::new(routine))))
    }

    /// Number of steps not yet pulled
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("remaining", &self.steps.len())
            .finish()
    }
}

impl Iterator for Sequence {
    type Item = BoxedInstruction;

    fn next(&mut self) -> Option<BoxedInstruction> {
        while let Some(step) = self.steps.pop_front() {
            if let Some(wait) = step() {
                return Some(wait);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_iterator_is_routine() {
        let mut routine = vec![instruction::wait(1.0), instruction::wait(2.0)].into_iter();
        assert!(routine.resume().is_some());
        assert!(routine.resume().is_some());
        assert!(routine.resume().is_none());
    }

    #[test]
    fn test_from_fn_state_machine() {
        let mut remaining = 3;
        let mut routine = from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            Some(instruction::next_tick())
        });

        let mut pulls = 0;
        while routine.resume().is_some() {
            pulls += 1;
        }
        assert_eq!(pulls, 3);
    }

    #[test]
    fn test_sequence_runs_actions_until_wait() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b, c) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));

        let mut seq = Sequence::new()
            .then(move || a.borrow_mut().push("a"))
            .then(move || b.borrow_mut().push("b"))
            .wait(1.0)
            .then(move || c.borrow_mut().push("c"));

        assert_eq!(seq.remaining(), 4);
        assert!(seq.resume().is_some());
        assert_eq!(*log.borrow(), vec!["a", "b"]);

        // trailing action runs on the final pull
        assert!(seq.resume().is_none());
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_sequence() {
        assert!(Sequence::new().resume().is_none());
        assert!(empty().resume().is_none());
    }
}
