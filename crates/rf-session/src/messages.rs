//! Spin-cycle messages exchanged by the session contexts

use rf_bus::{Message, impl_message};

/// Number of reels on the simulated machine
pub const REELS: usize = 5;

/// Anything that belongs to one spin
pub trait SpinEvent: Message {
    fn spin(&self) -> u32;
}

/// Presentation → logic: start the next spin
#[derive(Debug, Clone, Copy)]
pub struct SpinRequested {
    pub spin: u32,
}

/// Logic → presentation: spin accepted, bet deducted
#[derive(Debug, Clone, Copy)]
pub struct SpinStarted {
    pub spin: u32,
    pub bet: u64,
}

/// Logic → presentation: one reel's final symbol
#[derive(Debug, Clone, Copy)]
pub struct ReelStopped {
    pub spin: u32,
    pub reel: usize,
    pub symbol: u8,
}

/// Logic → presentation: evaluated win for the spin (0 = no win)
#[derive(Debug, Clone, Copy)]
pub struct WinAwarded {
    pub spin: u32,
    pub amount: u64,
}

/// Presentation → logic: all visuals for the spin finished
#[derive(Debug, Clone, Copy)]
pub struct PresentationDone {
    pub spin: u32,
}

macro_rules! spin_event {
    ($($ty:ty),+) => {
        $(
            impl SpinEvent for $ty {
                fn spin(&self) -> u32 {
                    self.spin
                }
            }
            impl_message!($ty: dyn SpinEvent);
        )+
    };
}

spin_event!(SpinRequested, SpinStarted, ReelStopped, WinAwarded, PresentationDone);
