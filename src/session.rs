//! Charging session and status snapshot types
//!
//! These are the wire types of the reservation portal backend. Sessions are
//! created by an external "start" action and mutated only by terminal
//! transitions; snapshots are ephemeral per-poll readings and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a charging session as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Energy is being delivered
    Charging,

    /// Session ended normally; cost may still be unsettled
    Completed,

    /// Session was cancelled before completion
    Cancelled,
}

impl SessionStatus {
    /// Whether the session has reached a terminal status
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Charging)
    }
}

/// One charging occurrence from start through payment resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session ID
    pub id: String,

    /// Station this session runs at
    pub station_ref: String,

    /// Charger within the station
    pub charger_ref: String,

    /// Start time of the session
    pub start_time: DateTime<Utc>,

    /// Session status
    pub status: SessionStatus,

    /// Energy consumed so far (kWh); server-finalized on terminal transitions
    pub energy_consumed: f64,

    /// Unit price for this session, if the backend assigned one
    pub price_per_unit: Option<f64>,
}

/// Point-in-time status reading produced by each poll
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Vehicle state of charge (0..=100)
    pub state_of_charge_percent: f64,

    /// Energy delivered so far (kWh)
    pub energy_charged: f64,

    /// Estimated minutes until full, when the backend can tell
    pub estimated_minutes_remaining: Option<u64>,

    /// Running cost at the snapshot's unit price
    pub current_cost: f64,

    /// Instantaneous charging power (kW)
    pub charging_power_kw: f64,

    /// Unit price in effect, if known
    pub price_per_unit: Option<f64>,

    /// Session status at snapshot time
    pub status: SessionStatus,
}

/// Last observed readings sent along with a stop request.
///
/// The stop operation carries what the client actually saw, not a locally
/// assumed value; the server finalizes the authoritative figures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopReading {
    /// Energy delivered at the last observed snapshot (kWh)
    pub energy_charged: f64,

    /// State of charge at the last observed snapshot (0..=100)
    pub current_soc: f64,
}

impl StopReading {
    /// Build a reading from the latest snapshot
    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Self {
        Self {
            energy_charged: snapshot.energy_charged,
            current_soc: snapshot.state_of_charge_percent,
        }
    }
}
