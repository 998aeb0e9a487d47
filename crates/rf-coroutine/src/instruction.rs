//! Suspension instructions
//!
//! A routine yields an [`Instruction`] to say what it is waiting for. The
//! owning runner re-checks it once per tick until it reports the wait is over.

use std::fmt;

/// Boxed instruction as yielded by routines
pub type BoxedInstruction = Box<dyn Instruction>;

/// Something a routine can wait on
pub trait Instruction {
    /// Returns `true` once the wait is over and the routine may advance.
    ///
    /// `now` is the host clock in seconds, `delta` the seconds elapsed since
    /// the previous tick.
    fn check(&mut self, now: f64, delta: f64) -> bool;
}

// ═══════════════════════════════════════════════════════════════════════════════
// DELAY
// ═══════════════════════════════════════════════════════════════════════════════

/// Waits for a fixed amount of tick time
///
/// Counts down by subtracting each tick's delta. Deltas that are not exact in
/// binary accumulate rounding, so a delay may finish one tick after the tick
/// where the summed deltas first reach it. It never finishes early.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delay {
    remaining: f64,
}

impl Delay {
    pub fn new(seconds: f64) -> Self {
        Self { remaining: seconds }
    }

    /// Seconds still to wait (may be negative after overshoot)
    #[inline]
    pub fn remaining(&self) -> f64 {
        self.remaining
    }
}

impl Instruction for Delay {
    #[inline]
    fn check(&mut self, _now: f64, delta: f64) -> bool {
        self.remaining -= delta;
        self.remaining <= 0.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DELAY OR UNTIL
// ═══════════════════════════════════════════════════════════════════════════════

/// Waits for a delay, or less if the predicate turns true first
///
/// The predicate is evaluated on every check, also while time remains.
pub struct DelayOrUntil {
    delay: Delay,
    predicate: Box<dyn FnMut() -> bool>,
}

impl DelayOrUntil {
    pub fn new(seconds: f64, predicate: impl FnMut() -> bool + 'static) -> Self {
        Self {
            delay: Delay::new(seconds),
            predicate: Box::new(predicate),
        }
    }
}

impl fmt::Debug for DelayOrUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayOrUntil")
            .field("remaining", &self.delay.remaining)
            .finish_non_exhaustive()
    }
}

impl Instruction for DelayOrUntil {
    fn check(&mut self, now: f64, delta: f64) -> bool {
        let elapsed = self.delay.check(now, delta);
        let released = (self.predicate)();
        elapsed || released
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PREDICATE WAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Waits until the predicate returns `true`
pub struct WaitUntil {
    predicate: Box<dyn FnMut() -> bool>,
}

impl WaitUntil {
    pub fn new(predicate: impl FnMut() -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl Instruction for WaitUntil {
    #[inline]
    fn check(&mut self, _now: f64, _delta: f64) -> bool {
        (self.predicate)()
    }
}

/// Waits while the predicate returns `true`
pub struct WaitWhile {
    predicate: Box<dyn FnMut() -> bool>,
}

impl WaitWhile {
    pub fn new(predicate: impl FnMut() -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl Instruction for WaitWhile {
    #[inline]
    fn check(&mut self, _now: f64, _delta: f64) -> bool {
        !(self.predicate)()
    }
}

/// Skips exactly one tick
#[derive(Debug, Default, Clone, Copy)]
pub struct NextTick {
    seen: bool,
}

impl Instruction for NextTick {
    #[inline]
    fn check(&mut self, _now: f64, _delta: f64) -> bool {
        std::mem::replace(&mut self.seen, true)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTRUCTORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Boxed [`Delay`]
pub fn wait(seconds: f64) -> BoxedInstruction {
    Box::new(Delay::new(seconds))
}

/// Boxed [`DelayOrUntil`]
pub fn wait_or_until(seconds: f64, predicate: impl FnMut() -> bool + 'static) -> BoxedInstruction {
    Box::new(DelayOrUntil::new(seconds, predicate))
}

/// Boxed [`WaitUntil`]
pub fn wait_until(predicate: impl FnMut() -> bool + 'static) -> BoxedInstruction {
    Box::new(WaitUntil::new(predicate))
}

/// Boxed [`WaitWhile`]
pub fn wait_while(predicate: impl FnMut() -> bool + 'static) -> BoxedInstruction {
    Box::new(WaitWhile::new(predicate))
}

/// Boxed [`NextTick`]
pub fn next_tick() -> BoxedInstruction {
    Box::new(NextTick::default())
}
