//! Composite runner
//!
//! A [`Coroutine`] drives one routine and is itself an [`Instruction`], so a
//! routine can yield another coroutine and wait for it to finish. Nesting depth
//! is unbounded; an inner coroutine is a transparent pass-through of whatever
//! its own current child is waiting on.

use std::fmt;

use crate::instruction::{BoxedInstruction, Instruction};
use crate::routine::Routine;

/// Instruction that runs a routine step by step
pub struct Coroutine {
    routine: Box<dyn Routine>,
    /// What the routine is currently waiting on
    current: Option<BoxedInstruction>,
    finished: bool,
}

impl Coroutine {
    /// Wrap a routine and pull its first step immediately.
    ///
    /// A routine that yields nothing leaves the coroutine finished before its
    /// first check.
    pub fn new<R: Routine + 'static>(routine: R) -> Self {
        let mut routine: Box<dyn Routine> = Box::new(routine);
        let current = routine.resume();
        let finished = current.is_none();
        Self {
            routine,
            current,
            finished,
        }
    }

    /// Wrap a routine without pulling anything; the first step runs on the
    /// first check.
    pub fn deferred<R: Routine + 'static>(routine: R) -> Self {
        Self {
            routine: Box::new(routine),
            current: None,
            finished: false,
        }
    }

    /// Routine exhausted
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Currently suspended on a child instruction
    #[inline]
    pub fn is_waiting(&self) -> bool {
        self.current.is_some()
    }

    /// Box as a yieldable instruction
    pub fn boxed(self) -> BoxedInstruction {
        Box::new(self)
    }
}

impl Instruction for Coroutine {
    fn check(&mut self, now: f64, delta: f64) -> bool {
        if self.finished {
            return true;
        }

        let advance = match self.current.as_mut() {
            Some(child) => child.check(now, delta),
            None => true,
        };
        if !advance {
            return false;
        }

        // The new child is first checked on the next tick.
        match self.routine.resume() {
            Some(next) => {
                self.current = Some(next);
                false
            }
            None => {
                self.current = None;
                self.finished = true;
                true
            }
        }
    }
}

impl fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coroutine")
            .field("waiting", &self.current.is_some())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Boxed eager [`Coroutine`] for yielding from iterator-style routines
pub fn nested<R: Routine + 'static>(routine: R) -> BoxedInstruction {
    Coroutine::new(routine).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{next_tick, wait};
    use crate::routine::{self, Sequence};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Checks until done, returns the number of checks
    fn run_to_completion(runner: &mut Coroutine, dt: f64) -> u32 {
        let mut ticks = 0;
        let mut now = 0.0;
        loop {
            ticks += 1;
            now += dt;
            if runner.check(now, dt) {
                return ticks;
            }
            assert!(ticks < 10_000, "runner never finished");
        }
    }

    /// Routine of `delays`, each nested `depth` coroutines deep
    fn nested_delays(delays: &[f64], depth: usize) -> Vec<BoxedInstruction> {
        delays
            .iter()
            .map(|&d| {
                let mut inst = wait(d);
                for _ in 0..depth {
                    inst = nested(std::iter::once(inst));
                }
                inst
            })
            .collect()
    }

    #[test]
    fn test_empty_routine_finishes_on_first_check() {
        let mut runner = Coroutine::new(routine::empty());
        assert!(runner.is_finished());
        assert!(!runner.is_waiting());
        assert!(runner.check(0.0, 0.016));
        assert!(!runner.is_waiting());
    }

    #[test]
    fn test_eager_pulls_first_step_in_constructor() {
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let runner = Coroutine::new(Sequence::new().then(move || flag.set(true)).wait(1.0));
        assert!(ran.get());
        assert!(runner.is_waiting());
    }

    #[test]
    fn test_deferred_pulls_on_first_check() {
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let mut runner =
            Coroutine::deferred(Sequence::new().then(move || flag.set(true)).wait(1.0));
        assert!(!ran.get());
        assert!(!runner.is_waiting());

        assert!(!runner.check(0.0, 0.1));
        assert!(ran.get());
        assert!(runner.is_waiting());
    }

    #[test]
    fn test_deferred_empty_routine() {
        let mut runner = Coroutine::deferred(routine::empty());
        assert!(!runner.is_finished());
        assert!(runner.check(0.0, 0.1));
        assert!(runner.is_finished());
    }

    #[test]
    fn test_new_child_not_checked_on_same_tick() {
        let mut runner = Coroutine::new(vec![next_tick(), next_tick()].into_iter());
        // first NextTick: false
        assert!(!runner.check(0.0, 0.1));
        // first NextTick done, second pulled but not checked
        assert!(!runner.check(0.1, 0.1));
        assert!(!runner.check(0.2, 0.1));
        // second done, routine exhausted
        assert!(runner.check(0.3, 0.1));
    }

    #[test]
    fn test_ticks_equal_total_delay_regardless_of_depth() {
        let delays = [0.5, 0.25, 1.0, 0.75];
        let dt = 0.25;
        let expected = (delays.iter().sum::<f64>() / dt).ceil() as u32;

        for depth in 0..5 {
            let mut runner = Coroutine::new(nested_delays(&delays, depth).into_iter());
            assert_eq!(
                run_to_completion(&mut runner, dt),
                expected,
                "depth {depth}"
            );
        }
    }

    #[test]
    fn test_deeply_nested_sequences() {
        let inner = Sequence::new().wait(0.5).wait(0.5);
        let middle = Sequence::new().nest(inner).wait(1.0);
        let outer = Sequence::new().wait(0.5).nest(middle).wait(0.5);

        let mut runner = Coroutine::new(outer);
        assert_eq!(run_to_completion(&mut runner, 0.5), 6);
    }

    #[test]
    fn test_steps_run_in_yield_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let push = |tag: &'static str| {
            let log = Rc::clone(&log);
            move || log.borrow_mut().push(tag)
        };

        let inner = Sequence::new().then(push("inner-1")).wait(0.1).then(push("inner-2"));
        let outer = Sequence::new()
            .then(push("outer-1"))
            .nest(inner)
            .then(push("outer-2"));

        let mut runner = Coroutine::new(outer);
        run_to_completion(&mut runner, 0.1);
        assert_eq!(
            *log.borrow(),
            vec!["outer-1", "inner-1", "inner-2", "outer-2"]
        );
    }

    #[test]
    fn test_finished_state_is_sticky() {
        let pulls = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&pulls);
        let mut runner = Coroutine::new(routine::from_fn(move || {
            counter.set(counter.get() + 1);
            None
        }));
        assert!(runner.check(0.0, 0.1));
        assert!(runner.check(0.1, 0.1));
        assert_eq!(pulls.get(), 1);
    }

    #[test]
    #[should_panic(expected = "reel strip missing")]
    fn test_panic_in_step_propagates() {
        let mut runner = Coroutine::new(
            Sequence::new()
                .wait(0.1)
                .then(|| panic!("reel strip missing")),
        );
        runner.check(0.1, 0.1);
    }
}
