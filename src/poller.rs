//! Cancellable status polling
//!
//! Fetches point-in-time session status while a session is charging. Exactly
//! one request is in flight at a time, and cancellation is idempotent: once
//! the token is set, no further snapshot is delivered, including the result
//! of a request already in flight.

use crate::api::ChargingApi;
use crate::error::PhorosError;
use crate::logging::get_logger;
use crate::session::StatusSnapshot;
use crate::speed::SpeedMultiplier;
use std::sync::Arc;
use tokio::sync::watch;

/// Result of one poll cycle
#[derive(Debug)]
pub enum PollOutcome {
    /// A fresh status reading
    Snapshot(StatusSnapshot),

    /// The cycle did not run: cancelled, or a request was already in flight
    Skipped,

    /// The request failed; the next tick retries with no state change
    Failed(PhorosError),
}

/// Periodic status fetcher for one charging session
pub struct StatusPoller {
    api: Arc<dyn ChargingApi>,
    cancel_tx: watch::Sender<bool>,
    in_flight: bool,
    logger: crate::logging::StructuredLogger,
}

impl StatusPoller {
    /// Create a poller over the given backend
    pub fn new(api: Arc<dyn ChargingApi>) -> Self {
        let logger = get_logger("poller");
        let (cancel_tx, _) = watch::channel(false);
        Self {
            api,
            cancel_tx,
            in_flight: false,
            logger,
        }
    }

    /// Set the cancel token. Safe to call any number of times.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Whether the cancel token is set
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Re-arm the poller for a new session
    pub fn reset(&mut self) {
        self.cancel_tx.send_replace(false);
        self.in_flight = false;
    }

    /// Run one poll cycle for the session.
    ///
    /// Returns [`PollOutcome::Skipped`] without touching the network when the
    /// token is set or a request is still pending; a result that arrives
    /// after cancellation is dropped.
    pub async fn poll_once(&mut self, session_id: &str, speed: SpeedMultiplier) -> PollOutcome {
        if self.is_cancelled() || self.in_flight {
            return PollOutcome::Skipped;
        }

        self.in_flight = true;
        let result = self
            .api
            .get_session_status(session_id, speed.factor())
            .await;
        self.in_flight = false;

        if self.is_cancelled() {
            self.logger.debug(&format!(
                "Dropping poll result for session {}: poller cancelled mid-flight",
                session_id
            ));
            return PollOutcome::Skipped;
        }

        match result {
            Ok(snapshot) => PollOutcome::Snapshot(snapshot),
            Err(e) => {
                self.logger.warn(&format!(
                    "Status poll failed for session {}: {} (will retry next tick)",
                    session_id, e
                ));
                PollOutcome::Failed(e)
            }
        }
    }
}
