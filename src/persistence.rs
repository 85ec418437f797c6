//! Recovery store for unpaid completed sessions
//!
//! A single-slot durable record that survives process restarts. The slot is
//! written exactly when a session completes unpaid, read once at boot, and
//! cleared on settlement success or supersession by a newer live session.

use crate::error::Result;
use crate::logging::get_logger;
use crate::session::{Session, SessionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The persisted pending-payment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPaymentRecord {
    /// Session the unpaid cost belongs to
    pub session_id: String,

    /// Session status at capture time
    pub session_status: SessionStatus,

    /// Server-finalized energy (kWh)
    pub energy_consumed: f64,

    /// Unit price at capture time, if the backend assigned one
    pub price_per_kwh: Option<f64>,

    /// When the record was captured
    pub captured_at: DateTime<Utc>,
}

impl PendingPaymentRecord {
    /// Capture a record from a server-finalized session
    pub fn from_session(session: &Session, captured_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session.id.clone(),
            session_status: session.status,
            energy_consumed: session.energy_consumed,
            price_per_kwh: session.price_per_unit,
            captured_at,
        }
    }
}

/// Persistence port for the single pending-payment slot.
///
/// Any durable medium can satisfy this: an embedded file, a local database,
/// or a remote key-value store. Absence means "no unresolved payment".
pub trait RecoveryStore: Send {
    /// Read the slot; `None` when no unresolved payment exists
    fn read(&self) -> Result<Option<PendingPaymentRecord>>;

    /// Overwrite the slot with a new record
    fn write(&mut self, record: &PendingPaymentRecord) -> Result<()>;

    /// Empty the slot; a no-op when already empty
    fn clear(&mut self) -> Result<()>;
}

/// File-backed recovery store holding one JSON record
pub struct FileRecoveryStore {
    path: PathBuf,
    logger: crate::logging::StructuredLogger,
}

impl FileRecoveryStore {
    /// Create a store persisting at the given path
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let logger = get_logger("persistence");
        Self {
            path: path.into(),
            logger,
        }
    }
}

impl RecoveryStore for FileRecoveryStore {
    fn read(&self) -> Result<Option<PendingPaymentRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&contents) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // Unreadable slot content counts as absent; the unpaid duty
                // cannot be reconstructed from a corrupt record anyway.
                self.logger.warn(&format!(
                    "Discarding unreadable recovery record at {}: {}",
                    self.path.display(),
                    e
                ));
                Ok(None)
            }
        }
    }

    fn write(&mut self, record: &PendingPaymentRecord) -> Result<()> {
        let contents = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, contents)?;
        self.logger.debug(&format!(
            "Persisted pending-payment record for session {}",
            record.session_id
        ));
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            self.logger.debug("Cleared pending-payment record");
        }
        Ok(())
    }
}

/// In-memory recovery store for deterministic tests
#[derive(Default)]
pub struct MemoryRecoveryStore {
    slot: Option<PendingPaymentRecord>,
}

impl MemoryRecoveryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a record, as after a restart
    pub fn with_record(record: PendingPaymentRecord) -> Self {
        Self { slot: Some(record) }
    }
}

impl RecoveryStore for MemoryRecoveryStore {
    fn read(&self) -> Result<Option<PendingPaymentRecord>> {
        Ok(self.slot.clone())
    }

    fn write(&mut self, record: &PendingPaymentRecord) -> Result<()> {
        self.slot = Some(record.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.slot = None;
        Ok(())
    }
}
