//! Session tracking state machine
//!
//! Tracks one remote charging session per user through polling alone:
//! `NoSession → Charging → CompletedUnpaid → Paid`. The tracker owns
//! boot-time recovery, external-change detection, and the cooperative run
//! loop that coordinates the poller, the speed controller, and the payment
//! reconciler. All collaborators are injected so transitions can be driven
//! deterministically in tests.

use crate::api::ChargingApi;
use crate::clock::Clock;
use crate::config::{Config, PollingConfig};
use crate::error::{PhorosError, Result};
use crate::logging::get_logger;
use crate::payment::{PaymentMethod, PaymentReconciler, PaymentStatus, SettlementSummary};
use crate::persistence::{PendingPaymentRecord, RecoveryStore};
use crate::poller::{PollOutcome, StatusPoller};
use crate::session::{Session, SessionStatus, StatusSnapshot, StopReading};
use crate::speed::{SpeedChange, SpeedController, SpeedMultiplier};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Tracker state.
///
/// The enum itself is the fire-once guard: the completion and settlement
/// arms only run from the states that precede them, so re-entering a
/// committed arm is a structural no-op.
#[derive(Debug)]
pub enum TrackerState {
    /// No session is being tracked
    NoSession,

    /// A live session is polled for status
    Charging {
        /// The session as last reported by the backend
        session: Session,
    },

    /// The session ended but its cost is unsettled
    CompletedUnpaid {
        /// Captured payment basis
        record: PendingPaymentRecord,

        /// A settlement submission is in flight
        settling: bool,

        /// An on-site settlement was recorded and awaits staff confirmation
        recorded: Option<SettlementSummary>,
    },

    /// Settlement finished; terminal for this session
    Paid {
        /// What was submitted
        summary: SettlementSummary,
    },
}

impl TrackerState {
    /// Short state name for logs and status consumers
    pub fn name(&self) -> &'static str {
        match self {
            TrackerState::NoSession => "no_session",
            TrackerState::Charging { .. } => "charging",
            TrackerState::CompletedUnpaid { .. } => "completed_unpaid",
            TrackerState::Paid { .. } => "paid",
        }
    }

    /// Whether the poller should be running
    pub fn is_charging(&self) -> bool {
        matches!(self, TrackerState::Charging { .. })
    }
}

/// Commands accepted by the run loop from the embedding portal
#[derive(Debug, Clone)]
pub enum TrackerCommand {
    /// User asked to stop the live session
    RequestStop,

    /// User submitted a settlement
    SubmitPayment {
        method: PaymentMethod,
        user_id: String,
    },

    /// User asked for a speed change (acceleration is staged)
    RequestSpeed(SpeedMultiplier),

    /// User confirmed a staged speed change
    ConfirmSpeed,

    /// User dismissed a staged speed change
    CancelSpeedProposal,
}

/// The session-tracking engine
pub struct SessionTracker {
    api: Arc<dyn ChargingApi>,
    clock: Arc<dyn Clock>,
    store: Box<dyn RecoveryStore>,
    poller: StatusPoller,
    speed: SpeedController,
    reconciler: PaymentReconciler,
    polling: PollingConfig,
    state: TrackerState,
    last_snapshot: Option<StatusSnapshot>,

    /// Broadcast channel for streaming live status updates
    status_tx: broadcast::Sender<String>,

    logger: crate::logging::StructuredLogger,
}

impl SessionTracker {
    /// Create a tracker over injected collaborators
    pub fn new(
        api: Arc<dyn ChargingApi>,
        clock: Arc<dyn Clock>,
        store: Box<dyn RecoveryStore>,
        config: &Config,
    ) -> Self {
        let logger = get_logger("tracker");
        let poller = StatusPoller::new(Arc::clone(&api));
        let reconciler = PaymentReconciler::new(Arc::clone(&api), &config.pricing);
        let (status_tx, _) = broadcast::channel(100);

        Self {
            api,
            clock,
            store,
            poller,
            speed: SpeedController::new(),
            reconciler,
            polling: config.polling.clone(),
            state: TrackerState::NoSession,
            last_snapshot: None,
            status_tx,
            logger,
        }
    }

    /// Current state
    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Short state name
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// Latest status reading, if any
    pub fn last_snapshot(&self) -> Option<&StatusSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Active speed multiplier
    pub fn active_speed(&self) -> SpeedMultiplier {
        self.speed.active()
    }

    /// Poll interval at the active speed
    pub fn poll_interval(&self) -> Duration {
        self.speed.poll_interval(&self.polling)
    }

    /// Amount due while a completed session awaits settlement.
    ///
    /// Recomputed from the captured record, so dismissing and reopening the
    /// payment surface always reproduces the identical figure.
    pub fn amount_due(&self) -> Option<f64> {
        match &self.state {
            TrackerState::CompletedUnpaid { record, .. } => {
                Some(self.reconciler.amount_due(record))
            }
            _ => None,
        }
    }

    /// Subscribe to the live status stream
    pub fn subscribe_status(&self) -> broadcast::Receiver<String> {
        self.status_tx.subscribe()
    }

    /// Establish the initial state from the server and the recovery store.
    ///
    /// A live server-reported session always overrides stale local payment
    /// state; a persisted record only matters when the server reports no
    /// active session.
    pub async fn boot(&mut self) -> Result<()> {
        let active = self.api.get_active_session().await?;

        match active {
            Some(session) if session.status == SessionStatus::Charging => {
                if let Some(record) = self.store.read()?
                    && record.session_id != session.id
                {
                    self.store.clear()?;
                    self.logger.info(&format!(
                        "Purged stale payment record for session {}: superseded by live session {}",
                        record.session_id, session.id
                    ));
                }
                self.enter_charging(session);
            }
            _ => {
                self.recover_from_store().await?;
            }
        }

        self.publish_status();
        Ok(())
    }

    /// Run one poll cycle. A structural no-op outside `Charging`.
    pub async fn poll_tick(&mut self) {
        let TrackerState::Charging { session } = &self.state else {
            return;
        };
        let session_id = session.id.clone();

        match self.poller.poll_once(&session_id, self.speed.active()).await {
            PollOutcome::Snapshot(snapshot) => {
                self.last_snapshot = Some(snapshot.clone());
                self.publish_status();
                if snapshot.status == SessionStatus::Completed {
                    self.handle_completion(&session_id, &snapshot).await;
                }
            }
            PollOutcome::Failed(_) => {
                // Already logged by the poller; the next tick retries.
            }
            PollOutcome::Skipped => {}
        }
    }

    /// Stop the live session on user request.
    ///
    /// Sends the last observed energy/SOC, then captures the
    /// server-finalized session. On failure the state stays `Charging` and
    /// retrying the stop is the recovery path.
    pub async fn request_stop(&mut self) -> Result<()> {
        let TrackerState::Charging { session } = &self.state else {
            return Err(PhorosError::validation(
                "state",
                "no charging session to stop",
            ));
        };
        let session_id = session.id.clone();

        // Final snapshot for the reading; fall back to the cached one if the
        // fetch fails so the stop still carries observed values.
        let reading = match self
            .api
            .get_session_status(&session_id, self.speed.active().factor())
            .await
        {
            Ok(snapshot) => {
                let reading = StopReading::from_snapshot(&snapshot);
                self.last_snapshot = Some(snapshot);
                reading
            }
            Err(e) => match &self.last_snapshot {
                Some(snapshot) => StopReading::from_snapshot(snapshot),
                None => return Err(e),
            },
        };

        let finalized = self.api.stop_session(&session_id, reading).await?;
        self.poller.cancel();
        self.logger
            .info(&format!("Session {} stopped by user", session_id));
        self.capture_unpaid(&finalized);
        self.publish_status();
        Ok(())
    }

    /// Submit a settlement for the completed session.
    ///
    /// Success clears the recovery store; a finalized result reaches `Paid`,
    /// a pending on-site result stays `CompletedUnpaid` until staff confirm
    /// it outside this engine. Failure leaves state and store intact for
    /// retry with the same or another method.
    pub async fn settle(
        &mut self,
        method: PaymentMethod,
        user_id: &str,
    ) -> Result<SettlementSummary> {
        let record = match &mut self.state {
            TrackerState::CompletedUnpaid { settling: true, .. } => {
                return Err(PhorosError::payment("a settlement is already in flight"));
            }
            TrackerState::CompletedUnpaid {
                recorded: Some(_), ..
            } => {
                return Err(PhorosError::payment(
                    "an on-site settlement is already recorded and awaiting confirmation",
                ));
            }
            TrackerState::CompletedUnpaid {
                record, settling, ..
            } => {
                *settling = true;
                record.clone()
            }
            TrackerState::Paid { .. } => {
                return Err(PhorosError::payment("session is already settled"));
            }
            _ => {
                return Err(PhorosError::validation(
                    "state",
                    "no completed session awaiting payment",
                ));
            }
        };

        match self.reconciler.settle(&record, method, user_id).await {
            Ok(summary) => {
                // The record operation succeeded, so the local unpaid-tracking
                // duty ends even when staff confirmation is still outstanding.
                if let Err(e) = self.store.clear() {
                    self.logger
                        .error(&format!("Failed to clear recovery store: {}", e));
                }
                match summary.status {
                    PaymentStatus::Completed => {
                        self.state = TrackerState::Paid {
                            summary: summary.clone(),
                        };
                    }
                    PaymentStatus::Pending => {
                        if let TrackerState::CompletedUnpaid {
                            settling, recorded, ..
                        } = &mut self.state
                        {
                            *settling = false;
                            *recorded = Some(summary.clone());
                        }
                    }
                }
                self.publish_status();
                Ok(summary)
            }
            Err(e) => {
                if let TrackerState::CompletedUnpaid { settling, .. } = &mut self.state {
                    *settling = false;
                }
                self.logger.warn(&format!(
                    "Settlement failed for session {}: {} (record retained for retry)",
                    record.session_id, e
                ));
                Err(e)
            }
        }
    }

    /// Request a speed change; an applied change triggers a fresh poll
    pub async fn request_speed(&mut self, target: SpeedMultiplier) -> SpeedChange {
        let change = self.speed.request(target);
        if matches!(change, SpeedChange::Applied(_)) {
            self.poll_tick().await;
        }
        change
    }

    /// Confirm a staged speed change and poll immediately at the new cadence
    pub async fn confirm_speed(&mut self) -> Result<SpeedMultiplier> {
        let target = self.speed.confirm()?;
        self.poll_tick().await;
        Ok(target)
    }

    /// Dismiss a staged speed change
    pub fn cancel_speed_proposal(&mut self) -> bool {
        self.speed.cancel_proposal()
    }

    /// Cooperative event loop.
    ///
    /// Polls on the active cadence while `Charging`, serves commands from
    /// the embedding portal, and exits on the shutdown signal. Leaving the
    /// loop cancels any scheduled poll so nothing fires into a dead context.
    pub async fn run(
        &mut self,
        mut commands: mpsc::UnboundedReceiver<TrackerCommand>,
        mut shutdown: mpsc::UnboundedReceiver<()>,
    ) -> Result<()> {
        self.logger.info("Session tracker loop started");

        loop {
            let interval = self.poll_interval();
            let clock = Arc::clone(&self.clock);

            tokio::select! {
                _ = clock.sleep(interval), if self.state.is_charging() => {
                    self.poll_tick().await;
                }
                Some(cmd) = commands.recv() => {
                    self.handle_command(cmd).await;
                }
                _ = shutdown.recv() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        self.poller.cancel();
        self.logger.info("Session tracker loop stopped");
        Ok(())
    }

    /// Handle one external command
    async fn handle_command(&mut self, cmd: TrackerCommand) {
        match cmd {
            TrackerCommand::RequestStop => {
                if let Err(e) = self.request_stop().await {
                    self.logger
                        .error(&format!("Stop request failed, session stays active: {}", e));
                }
            }
            TrackerCommand::SubmitPayment { method, user_id } => {
                if let Err(e) = self.settle(method, &user_id).await {
                    self.logger.error(&format!("Payment submission failed: {}", e));
                }
            }
            TrackerCommand::RequestSpeed(target) => {
                let _ = self.request_speed(target).await;
            }
            TrackerCommand::ConfirmSpeed => {
                if let Err(e) = self.confirm_speed().await {
                    self.logger.warn(&format!("Speed confirmation rejected: {}", e));
                }
            }
            TrackerCommand::CancelSpeedProposal => {
                self.cancel_speed_proposal();
            }
        }
    }

    /// Enter `Charging` with a freshly armed poller
    fn enter_charging(&mut self, session: Session) {
        self.logger.info(&format!(
            "Tracking live session {} at station {}",
            session.id, session.station_ref
        ));
        self.poller.reset();
        self.last_snapshot = None;
        self.state = TrackerState::Charging { session };
    }

    /// Crash/reload recovery when the server reports no active session
    async fn recover_from_store(&mut self) -> Result<()> {
        let Some(record) = self.store.read()? else {
            self.state = TrackerState::NoSession;
            return Ok(());
        };

        if record.session_status != SessionStatus::Completed {
            // A non-completed record cannot carry an unpaid duty; discard.
            self.store.clear()?;
            self.state = TrackerState::NoSession;
            return Ok(());
        }

        // Verify the record against the server before trusting it.
        match self.api.get_session_by_id(&record.session_id).await {
            Ok(session) if session.status == SessionStatus::Completed => {
                self.logger.info(&format!(
                    "Recovered unpaid completed session {} from store",
                    record.session_id
                ));
                self.state = TrackerState::CompletedUnpaid {
                    record,
                    settling: false,
                    recorded: None,
                };
            }
            Ok(session) => {
                self.logger.warn(&format!(
                    "Discarding recovery record for session {}: server reports {:?}",
                    record.session_id, session.status
                ));
                self.store.clear()?;
                self.state = TrackerState::NoSession;
            }
            Err(e) if e.is_transient() => {
                // The server is unreachable, not authoritative; keep the
                // unpaid duty rather than silently losing it.
                self.logger.warn(&format!(
                    "Could not verify recovery record for session {} ({}); trusting local record",
                    record.session_id, e
                ));
                self.state = TrackerState::CompletedUnpaid {
                    record,
                    settling: false,
                    recorded: None,
                };
            }
            Err(e) => {
                self.logger.warn(&format!(
                    "Discarding recovery record for session {}: {}",
                    record.session_id, e
                ));
                self.store.clear()?;
                self.state = TrackerState::NoSession;
            }
        }
        Ok(())
    }

    /// Exactly-once completion handling for an externally finished session.
    ///
    /// Only reachable from `Charging`. Cancels the poller first so a second
    /// in-flight observation is dropped, re-fetches the authoritative record
    /// for server-finalized figures, persists the pending payment, and moves
    /// to `CompletedUnpaid`.
    async fn handle_completion(&mut self, session_id: &str, snapshot: &StatusSnapshot) {
        if !self.state.is_charging() {
            return;
        }
        self.poller.cancel();

        let finalized = match self.api.get_session_by_id(session_id).await {
            Ok(session) => session,
            Err(e) => {
                // Capture from the snapshot rather than blocking the
                // transition; the readings are the last observed values.
                self.logger.warn(&format!(
                    "Could not re-fetch finalized session {} ({}); capturing from snapshot",
                    session_id, e
                ));
                let TrackerState::Charging { session } = &self.state else {
                    return;
                };
                let mut session = session.clone();
                session.status = SessionStatus::Completed;
                session.energy_consumed = snapshot.energy_charged;
                if session.price_per_unit.is_none() {
                    session.price_per_unit = snapshot.price_per_unit;
                }
                session
            }
        };

        self.logger.info(&format!(
            "Session {} completed externally ({} kWh)",
            session_id, finalized.energy_consumed
        ));
        self.capture_unpaid(&finalized);
        self.publish_status();
    }

    /// Persist the pending payment and enter `CompletedUnpaid`.
    ///
    /// Persistence happens before the state transition so a crash between
    /// the two re-enters `CompletedUnpaid` at next boot.
    fn capture_unpaid(&mut self, finalized: &Session) {
        let record = PendingPaymentRecord::from_session(finalized, self.clock.now());
        if let Err(e) = self.store.write(&record) {
            self.logger.error(&format!(
                "Failed to persist pending-payment record for session {}: {}",
                record.session_id, e
            ));
        }
        self.state = TrackerState::CompletedUnpaid {
            record,
            settling: false,
            recorded: None,
        };
    }

    /// Publish a status summary for live consumers
    fn publish_status(&self) {
        let mut status = serde_json::json!({
            "state": self.state.name(),
            "speed": self.speed.active().factor(),
            "timestamp": self.clock.now().to_rfc3339(),
        });
        match &self.state {
            TrackerState::Charging { session } => {
                status["sessionId"] = serde_json::json!(session.id);
            }
            TrackerState::CompletedUnpaid { record, .. } => {
                status["sessionId"] = serde_json::json!(record.session_id);
                status["amountDue"] = serde_json::json!(self.reconciler.amount_due(record));
            }
            TrackerState::Paid { summary } => {
                status["sessionId"] = serde_json::json!(summary.session_id);
                status["amount"] = serde_json::json!(summary.amount);
                status["method"] = serde_json::json!(summary.method.as_str());
            }
            TrackerState::NoSession => {}
        }
        if let Some(snapshot) = &self.last_snapshot {
            status["stateOfChargePercent"] = serde_json::json!(snapshot.state_of_charge_percent);
            status["energyCharged"] = serde_json::json!(snapshot.energy_charged);
            status["chargingPowerKw"] = serde_json::json!(snapshot.charging_power_kw);
            status["currentCost"] = serde_json::json!(snapshot.current_cost);
        }
        let _ = self.status_tx.send(status.to_string());
    }
}
