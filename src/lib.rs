//! # Phoros - Charging-Session Tracker & Payment Reconciliation
//!
//! The live charging-session tracking and payment reconciliation engine of a
//! charging-station reservation portal. It follows a long-running remote
//! charging session purely through periodic polling, detects sessions
//! terminated by another actor, survives a full client restart without
//! losing an unpaid-but-completed session, and drives a retry-safe,
//! exactly-once payment settlement.
//!
//! ## Architecture
//!
//! The engine is an explicit finite-state machine with injected
//! collaborators, so every transition can be driven deterministically in
//! tests without real timers or network calls:
//!
//! - `config`: YAML configuration with validation
//! - `logging`: structured logging and tracing
//! - `error`: typed errors and the crate-wide `Result`
//! - `api`: the `ChargingApi` port and the REST client for the backend
//! - `session`: session and status-snapshot wire types
//! - `clock`: the time port (`SystemClock`, `ManualClock`)
//! - `persistence`: the single-slot recovery store port
//! - `poller`: cancellable status polling
//! - `speed`: demo-speed multiplier with confirmation gating
//! - `payment`: amount computation and settlement routing
//! - `tracker`: the state machine and its cooperative run loop

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod payment;
pub mod persistence;
pub mod poller;
pub mod session;
pub mod speed;
pub mod tracker;

// Re-export commonly used types
pub use config::Config;
pub use error::{PhorosError, Result};
pub use tracker::{SessionTracker, TrackerCommand, TrackerState};
