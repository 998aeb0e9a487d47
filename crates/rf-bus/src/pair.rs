//! Channel pair: the logic ⇄ presentation link
//!
//! Exactly two channels with fixed roles. The pair is an explicit context
//! object: create it at session start, `init()` it, hand [`ContextLink`]s to
//! each side, and `deinit()` it at teardown. No global state.

use std::sync::Arc;

use parking_lot::RwLock;
use rf_core::BusConfig;

use crate::channel::Channel;
use crate::error::{BusError, BusResult};

/// Execution context on one side of the pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// Game rules
    Logic,
    /// Visuals and audio
    Presentation,
}

impl Context {
    /// The context on the other side
    pub fn peer(self) -> Self {
        match self {
            Self::Logic => Self::Presentation,
            Self::Presentation => Self::Logic,
        }
    }
}

/// Fixed channel roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    LogicToPresentation,
    PresentationToLogic,
}

impl Direction {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::LogicToPresentation => "logic->presentation",
            Self::PresentationToLogic => "presentation->logic",
        }
    }

    /// Direction a context sends on
    pub fn outbound_from(context: Context) -> Self {
        match context {
            Context::Logic => Self::LogicToPresentation,
            Context::Presentation => Self::PresentationToLogic,
        }
    }
}

/// One context's view of the pair
#[derive(Debug, Clone)]
pub struct ContextLink {
    pub context: Context,
    /// Channel this context sends on
    pub outbound: Arc<Channel>,
    /// Channel this context dispatches from
    pub inbound: Arc<Channel>,
}

struct Channels {
    to_presentation: Arc<Channel>,
    to_logic: Arc<Channel>,
}

/// The two directional channels between logic and presentation
pub struct ChannelPair {
    channels: RwLock<Option<Channels>>,
    config: BusConfig,
}

impl Default for ChannelPair {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl ChannelPair {
    /// Create an uninitialized pair
    pub fn new(config: BusConfig) -> Self {
        Self {
            channels: RwLock::new(None),
            config,
        }
    }

    /// Create both channels
    pub fn init(&self) -> BusResult<()> {
        let mut channels = self.channels.write();
        if channels.is_some() {
            return Err(BusError::AlreadyInitialized);
        }
        *channels = Some(Channels {
            to_presentation: Arc::new(Channel::new(
                Direction::LogicToPresentation.display_name(),
                &self.config,
            )),
            to_logic: Arc::new(Channel::new(
                Direction::PresentationToLogic.display_name(),
                &self.config,
            )),
        });
        log::info!("Channel pair initialized");
        Ok(())
    }

    /// Drop both channels.
    ///
    /// Pending messages are discarded undelivered; outstanding `Arc<Channel>`
    /// clones are left empty. Returns `false` if the pair was not initialized.
    pub fn deinit(&self) -> bool {
        let Some(channels) = self.channels.write().take() else {
            return false;
        };
        let dropped = channels.to_presentation.force_clear_messages()
            + channels.to_logic.force_clear_messages();
        log::info!("Channel pair deinitialized ({dropped} pending message(s) discarded)");
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.channels.read().is_some()
    }

    /// Channel for one direction
    pub fn channel(&self, direction: Direction) -> BusResult<Arc<Channel>> {
        let channels = self.channels.read();
        let channels = channels.as_ref().ok_or(BusError::NotInitialized)?;
        Ok(match direction {
            Direction::LogicToPresentation => Arc::clone(&channels.to_presentation),
            Direction::PresentationToLogic => Arc::clone(&channels.to_logic),
        })
    }

    pub fn logic_to_presentation(&self) -> BusResult<Arc<Channel>> {
        self.channel(Direction::LogicToPresentation)
    }

    pub fn presentation_to_logic(&self) -> BusResult<Arc<Channel>> {
        self.channel(Direction::PresentationToLogic)
    }

    /// Outbound and inbound channels for `context`
    pub fn link(&self, context: Context) -> BusResult<ContextLink> {
        Ok(ContextLink {
            context,
            outbound: self.channel(Direction::outbound_from(context))?,
            inbound: self.channel(Direction::outbound_from(context.peer()))?,
        })
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }
}

impl Drop for ChannelPair {
    fn drop(&mut self) {
        self.deinit();
    }
}
