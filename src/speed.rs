//! Demo-speed control for the status poller
//!
//! The speed multiplier shortens the poll cadence and fast-forwards the
//! backend's reported charge progress. Because accelerating irreversibly
//! fast-forwards a live session's reported energy, switching up requires an
//! explicit propose/confirm handshake; dropping back to normal does not.

use crate::config::PollingConfig;
use crate::error::{PhorosError, Result};
use crate::logging::get_logger;
use std::time::Duration;

/// Bounded progress multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedMultiplier {
    /// Real-time progress
    Normal,

    /// Demo acceleration
    Accelerated,
}

impl SpeedMultiplier {
    /// Numeric factor sent to the backend with each status request
    pub fn factor(self) -> u32 {
        match self {
            SpeedMultiplier::Normal => 1,
            SpeedMultiplier::Accelerated => 100,
        }
    }
}

/// Outcome of a speed-change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedChange {
    /// The change took effect immediately
    Applied(SpeedMultiplier),

    /// The change is staged and needs an explicit confirmation
    AwaitingConfirmation(SpeedMultiplier),
}

/// Gated speed configuration
pub struct SpeedController {
    active: SpeedMultiplier,
    proposed: Option<SpeedMultiplier>,
    logger: crate::logging::StructuredLogger,
}

impl SpeedController {
    /// Create a controller running at normal speed
    pub fn new() -> Self {
        let logger = get_logger("speed");
        Self {
            active: SpeedMultiplier::Normal,
            proposed: None,
            logger,
        }
    }

    /// Currently active multiplier
    pub fn active(&self) -> SpeedMultiplier {
        self.active
    }

    /// Staged multiplier awaiting confirmation, if any
    pub fn proposed(&self) -> Option<SpeedMultiplier> {
        self.proposed
    }

    /// Request a speed change.
    ///
    /// Acceleration is staged until confirmed; returning to normal applies
    /// immediately and drops any staged proposal.
    pub fn request(&mut self, target: SpeedMultiplier) -> SpeedChange {
        if target == self.active {
            self.proposed = None;
            return SpeedChange::Applied(target);
        }
        match target {
            SpeedMultiplier::Accelerated => {
                self.proposed = Some(target);
                self.logger
                    .info("Accelerated speed proposed, awaiting confirmation");
                SpeedChange::AwaitingConfirmation(target)
            }
            SpeedMultiplier::Normal => {
                self.active = SpeedMultiplier::Normal;
                self.proposed = None;
                self.logger.info("Speed returned to normal");
                SpeedChange::Applied(SpeedMultiplier::Normal)
            }
        }
    }

    /// Confirm a staged proposal, making it active
    pub fn confirm(&mut self) -> Result<SpeedMultiplier> {
        match self.proposed.take() {
            Some(target) => {
                self.active = target;
                self.logger
                    .info(&format!("Speed change confirmed: x{}", target.factor()));
                Ok(target)
            }
            None => Err(PhorosError::validation(
                "speed",
                "no pending speed proposal to confirm",
            )),
        }
    }

    /// Drop a staged proposal; returns whether one existed
    pub fn cancel_proposal(&mut self) -> bool {
        self.proposed.take().is_some()
    }

    /// Poll interval for the active multiplier
    pub fn poll_interval(&self, cfg: &PollingConfig) -> Duration {
        match self.active {
            SpeedMultiplier::Normal => Duration::from_millis(cfg.base_interval_ms),
            SpeedMultiplier::Accelerated => Duration::from_millis(cfg.accelerated_interval_ms),
        }
    }
}

impl Default for SpeedController {
    fn default() -> Self {
        Self::new()
    }
}
