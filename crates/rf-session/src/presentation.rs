//! Presentation context: per-spin visual flows
//!
//! Owns the coroutine scheduler. Each frame it dispatches inbound results,
//! starts one routine per new spin and ticks the routines. A routine lands
//! the reels one by one, rolls up the win, then acknowledges the spin and
//! requests the next one.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result, bail};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use rf_bus::{Channel, ContextLink, HandlerId};
use rf_core::SchedulerConfig;
use rf_coroutine::routine::from_fn;
use rf_coroutine::{Routine, Sequence, UpdateRoot, nested, wait_or_until};

use crate::messages::{
    PresentationDone, REELS, ReelStopped, SpinEvent, SpinRequested, SpinStarted, WinAwarded,
};

/// Unsubscribes one handler under the view it was registered with
type Unsubscribe = fn(&Channel, HandlerId) -> bool;

/// Rollup increments for a non-zero win
const ROLLUP_STEPS: u64 = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// SPIN BOARD
// ═══════════════════════════════════════════════════════════════════════════════

/// What the presentation knows about one spin so far
#[derive(Debug, Clone, Default)]
pub struct SpinView {
    pub bet: u64,
    pub reels: [Option<u8>; REELS],
    pub win: Option<u64>,
}

/// Spin results written by channel handlers, read by routines
#[derive(Debug, Default)]
pub struct SpinBoard {
    spins: HashMap<u32, SpinView>,
    started: VecDeque<u32>,
    total_won: u64,
}

impl SpinBoard {
    fn begin(&mut self, spin: u32, bet: u64) {
        self.spins.insert(
            spin,
            SpinView {
                bet,
                ..SpinView::default()
            },
        );
        self.started.push_back(spin);
    }

    fn land(&mut self, spin: u32, reel: usize, symbol: u8) {
        if let Some(slot) = self
            .spins
            .get_mut(&spin)
            .and_then(|view| view.reels.get_mut(reel))
        {
            *slot = Some(symbol);
        }
    }

    fn award(&mut self, spin: u32, amount: u64) {
        if let Some(view) = self.spins.get_mut(&spin) {
            view.win = Some(amount);
            self.total_won += amount;
        }
    }

    /// Spins announced since the last call, in arrival order
    fn take_started(&mut self) -> Vec<u32> {
        self.started.drain(..).collect()
    }

    fn retire(&mut self, spin: u32) -> Option<SpinView> {
        self.spins.remove(&spin)
    }

    pub fn view(&self, spin: u32) -> Option<&SpinView> {
        self.spins.get(&spin)
    }

    pub fn reel(&self, spin: u32, reel: usize) -> Option<u8> {
        self.view(spin)
            .and_then(|view| view.reels.get(reel).copied().flatten())
    }

    pub fn win(&self, spin: u32) -> Option<u64> {
        self.view(spin).and_then(|view| view.win)
    }

    pub fn total_won(&self) -> u64 {
        self.total_won
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRESENTATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Timing and pacing of the visual flows
#[derive(Debug, Clone, Copy)]
pub struct PresentationOptions {
    /// Spins to present before the session ends
    pub spins: u32,
    /// Seconds each reel takes to land
    pub reel_land: f64,
    /// Seconds per rollup increment
    pub rollup_step: f64,
    /// Release every rollup wait on its first check
    pub skip_rollups: bool,
}

impl Default for PresentationOptions {
    fn default() -> Self {
        Self {
            spins: 10,
            reel_land: 0.3,
            rollup_step: 0.05,
            skip_rollups: false,
        }
    }
}

/// Totals reported when the presentation finishes
#[derive(Debug, Default, Clone, Copy)]
pub struct PresentationReport {
    pub frames: u64,
    pub completed: u32,
    pub shown_won: u64,
    pub game_time: f64,
}

pub struct PresentationContext {
    link: ContextLink,
    root: UpdateRoot,
    board: Arc<Mutex<SpinBoard>>,
    completed: Rc<Cell<u32>>,
    options: PresentationOptions,
    handlers: Vec<(Unsubscribe, HandlerId)>,
}

impl PresentationContext {
    pub fn new(link: ContextLink, scheduler: SchedulerConfig, options: PresentationOptions) -> Self {
        let board = Arc::new(Mutex::new(SpinBoard::default()));
        let mut handlers: Vec<(Unsubscribe, HandlerId)> = Vec::new();

        let sink = Arc::clone(&board);
        handlers.push((
            |channel: &Channel, id| channel.remove_handler::<SpinStarted>(id),
            link.inbound
                .add_handler::<SpinStarted, _>(move |m| sink.lock().begin(m.spin, m.bet)),
        ));
        let sink = Arc::clone(&board);
        handlers.push((
            |channel: &Channel, id| channel.remove_handler::<ReelStopped>(id),
            link.inbound
                .add_handler::<ReelStopped, _>(move |m| sink.lock().land(m.spin, m.reel, m.symbol)),
        ));
        let sink = Arc::clone(&board);
        handlers.push((
            |channel: &Channel, id| channel.remove_handler::<WinAwarded>(id),
            link.inbound
                .add_handler::<WinAwarded, _>(move |m| sink.lock().award(m.spin, m.amount)),
        ));
        handlers.push((
            |channel: &Channel, id| channel.remove_handler::<dyn SpinEvent>(id),
            link.inbound.add_handler::<dyn SpinEvent, _>(|event| {
                log::trace!("spin {} <- {:?}", event.spin(), event);
            }),
        ));

        Self {
            link,
            root: UpdateRoot::new(scheduler),
            board,
            completed: Rc::new(Cell::new(0)),
            options,
            handlers,
        }
    }

    /// Ask logic for the first spin
    pub fn request_first_spin(&self) {
        self.link.outbound.send(SpinRequested { spin: 0 });
    }

    /// Dispatch inbound results, start new spin flows, tick once
    pub fn frame(&mut self, delta: f64) -> Result<()> {
        self.link.inbound.dispatch_all(None);

        let started = self.board.lock().take_started();
        for spin in started {
            let routine = spin_flow(
                spin,
                Arc::clone(&self.board),
                Arc::clone(&self.link.outbound),
                Rc::clone(&self.completed),
                self.options,
            );
            self.root.start_labeled(format!("spin-{spin}"), routine);
        }

        self.root.tick(delta)?;
        Ok(())
    }

    pub fn completed(&self) -> u32 {
        self.completed.get()
    }

    pub fn is_done(&self) -> bool {
        self.completed() >= self.options.spins
    }

    /// Run frames until every spin is presented.
    ///
    /// `wake` carries arrival hints from the inbound channel; with no flow
    /// running the loop waits on it instead of ticking. `realtime` paces
    /// frames to `fps`.
    pub fn run(
        &mut self,
        fps: f64,
        realtime: bool,
        timeout: Duration,
        wake: &Receiver<()>,
    ) -> Result<PresentationReport> {
        if !fps.is_finite() || fps <= 0.0 {
            bail!("fps must be finite and positive, got {fps}");
        }
        let frame_time = 1.0 / fps;
        let pacing = Duration::try_from_secs_f64(frame_time)
            .with_context(|| format!("fps {fps} gives an unrepresentable frame time"))?;
        let started = Instant::now();
        let mut frames = 0u64;

        if !self.is_done() {
            self.request_first_spin();
        }
        while !self.is_done() {
            if started.elapsed() > timeout {
                bail!(
                    "presentation timed out after {frames} frame(s) with {}/{} spin(s) shown",
                    self.completed(),
                    self.options.spins
                );
            }

            if self.root.is_empty() && self.link.inbound.pending_count() == 0 {
                let _ = wake.recv_timeout(Duration::from_millis(10));
                continue;
            }

            self.frame(frame_time)?;
            frames += 1;
            if realtime {
                std::thread::sleep(pacing);
            }
        }

        let report = PresentationReport {
            frames,
            completed: self.completed(),
            shown_won: self.board.lock().total_won(),
            game_time: self.root.time(),
        };
        log::info!("Presentation finished: {report:?}");
        Ok(report)
    }
}

impl Drop for PresentationContext {
    fn drop(&mut self) {
        self.root.stop_all();
        for &(unsubscribe, id) in &self.handlers {
            if !unsubscribe(&self.link.inbound, id) {
                log::warn!("Handler {id} was already gone at teardown");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTINES
// ═══════════════════════════════════════════════════════════════════════════════

/// Land reels, roll up the win, acknowledge and request the next spin
fn spin_flow(
    spin: u32,
    board: Arc<Mutex<SpinBoard>>,
    outbound: Arc<Channel>,
    completed: Rc<Cell<u32>>,
    options: PresentationOptions,
) -> Sequence {
    let mut flow = Sequence::new();
    for reel in 0..REELS {
        let landed = Arc::clone(&board);
        flow = flow
            .wait_until(move || landed.lock().reel(spin, reel).is_some())
            .wait(options.reel_land)
            .then(move || log::debug!("spin {spin}: reel {reel} landed"));
    }

    let known = Arc::clone(&board);
    let amount = Arc::clone(&board);
    flow.wait_until(move || known.lock().win(spin).is_some())
        .step(move || {
            let win = amount.lock().win(spin).unwrap_or(0);
            Some(nested(rollup(win, options.rollup_step, options.skip_rollups)))
        })
        .then(move || {
            if let Some(view) = board.lock().retire(spin) {
                log::debug!(
                    "spin {spin}: presented {:?} for bet {}, win {:?}",
                    view.reels,
                    view.bet,
                    view.win
                );
            }
            completed.set(completed.get() + 1);
            outbound.send(PresentationDone { spin });
            if spin + 1 < options.spins {
                outbound.send(SpinRequested { spin: spin + 1 });
            }
        })
}

/// Count a win up in fixed increments
fn rollup(amount: u64, step: f64, skip: bool) -> impl Routine {
    let increments = if amount == 0 { 0 } else { ROLLUP_STEPS };
    let mut shown = 0;
    from_fn(move || {
        if shown >= increments {
            return None;
        }
        shown += 1;
        log::trace!("rollup {}/{amount}", amount * shown / increments);
        Some(wait_or_until(step, move || skip))
    })
}
