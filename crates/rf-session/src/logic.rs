//! Logic context: spin outcomes
//!
//! Runs on its own thread. Sleeps until the inbound channel signals arrival
//! (or shutdown), answers each spin request with one flushed batch of
//! results.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, select};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rf_bus::{Channel, ContextLink};

use crate::messages::{PresentationDone, REELS, ReelStopped, SpinRequested, SpinStarted, WinAwarded};

/// Distinct symbols per reel
const SYMBOLS: u8 = 6;

/// Idle poll interval when no arrival hint comes in
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Totals reported when the logic thread exits
#[derive(Debug, Default, Clone, Copy)]
pub struct LogicReport {
    pub spins: u32,
    pub wagered: u64,
    pub won: u64,
    pub acknowledged: u32,
}

pub struct LogicContext {
    link: ContextLink,
    rng: ChaCha8Rng,
    bet: u64,
    report: LogicReport,
}

impl LogicContext {
    pub fn new(link: ContextLink, seed: u64, bet: u64) -> Self {
        Self {
            link,
            rng: ChaCha8Rng::seed_from_u64(seed),
            bet,
            report: LogicReport::default(),
        }
    }

    /// Serve spin requests until `shutdown` fires or disconnects
    pub fn run(mut self, shutdown: Receiver<()>) -> LogicReport {
        let (wake_tx, wake_rx) = crossbeam_channel::bounded::<()>(1);
        let listener = self.link.inbound.on_arrival(move || {
            // full means a wake-up is already pending
            let _ = wake_tx.try_send(());
        });

        let requests = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&requests);
        let request_handler = self
            .link
            .inbound
            .add_handler::<SpinRequested, _>(move |request| sink.lock().push(request.spin));

        let acknowledged = Arc::new(Mutex::new(0u32));
        let acks = Arc::clone(&acknowledged);
        let done_handler = self
            .link
            .inbound
            .add_handler::<PresentationDone, _>(move |_| *acks.lock() += 1);

        log::info!("Logic context running (bet {})", self.bet);
        loop {
            select! {
                recv(wake_rx) -> _ => {}
                recv(shutdown) -> _ => break,
                default(IDLE_POLL) => {}
            }

            self.link.inbound.dispatch_all(None);
            let pending: Vec<u32> = std::mem::take(&mut *requests.lock());
            for spin in pending {
                self.play_spin(spin);
            }
        }

        self.link.inbound.remove_arrival_listener(listener);
        self.link.inbound.remove_handler::<SpinRequested>(request_handler);
        self.link.inbound.remove_handler::<PresentationDone>(done_handler);

        self.report.acknowledged = *acknowledged.lock();
        log::info!("Logic context stopped: {:?}", self.report);
        self.report
    }

    fn play_spin(&mut self, spin: u32) {
        let symbols: [u8; REELS] = std::array::from_fn(|_| self.rng.random_range(0..SYMBOLS));
        let amount = evaluate(&symbols, self.bet);

        self.report.spins += 1;
        self.report.wagered = self.report.wagered.saturating_add(self.bet);
        self.report.won = self.report.won.saturating_add(amount);
        log::debug!("Spin {spin}: {symbols:?} pays {amount}");

        publish(&self.link.outbound, spin, self.bet, &symbols, amount);
    }
}

/// Leading run of identical symbols, three or more pays `bet × run × (symbol + 1)`.
/// Saturates at `u64::MAX`.
pub fn evaluate(symbols: &[u8; REELS], bet: u64) -> u64 {
    let first = symbols[0];
    let run = symbols.iter().take_while(|&&s| s == first).count() as u64;
    if run >= 3 {
        bet.saturating_mul(run).saturating_mul(first as u64 + 1)
    } else {
        0
    }
}

/// One spin's results as a single visible batch
fn publish(outbound: &Channel, spin: u32, bet: u64, symbols: &[u8; REELS], amount: u64) {
    outbound.enqueue_message(SpinStarted { spin, bet });
    for (reel, &symbol) in symbols.iter().enumerate() {
        outbound.enqueue_message(ReelStopped { spin, reel, symbol });
    }
    outbound.enqueue_message(WinAwarded { spin, amount });
    outbound.send_enqueued_messages();
}
