#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use phoros::api::ChargingApi;
use phoros::clock::ManualClock;
use phoros::config::Config;
use phoros::error::{PhorosError, Result};
use phoros::payment::{PaymentMethod, PaymentResult, PaymentStatus};
use phoros::persistence::{PendingPaymentRecord, RecoveryStore};
use phoros::session::{Session, SessionStatus, StatusSnapshot, StopReading};
use phoros::tracker::SessionTracker;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Scripted backend double. Response queues are popped per call; an empty
/// queue answers with a network error so unscripted calls surface in tests.
#[derive(Default)]
pub struct MockChargingApi {
    pub active_session: Mutex<Option<Session>>,
    pub sessions: Mutex<HashMap<String, Session>>,
    pub session_lookup_errors: Mutex<VecDeque<PhorosError>>,
    pub snapshots: Mutex<VecDeque<Result<StatusSnapshot>>>,
    pub stop_responses: Mutex<VecDeque<Result<Session>>>,
    pub wallet_responses: Mutex<VecDeque<Result<PaymentResult>>>,
    pub onsite_responses: Mutex<VecDeque<Result<PaymentResult>>>,

    pub status_calls: AtomicU32,
    pub stop_calls: AtomicU32,
    pub wallet_calls: AtomicU32,
    pub onsite_calls: AtomicU32,
    pub last_speed: AtomicU32,

    pub stop_readings: Mutex<Vec<StopReading>>,
    pub wallet_prices: Mutex<Vec<f64>>,
    pub onsite_amounts: Mutex<Vec<f64>>,
    pub onsite_methods: Mutex<Vec<PaymentMethod>>,
}

impl MockChargingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active(&self, session: Option<Session>) {
        *self.active_session.lock().unwrap() = session;
    }

    pub fn insert_session(&self, session: Session) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }

    pub fn push_snapshot(&self, snapshot: StatusSnapshot) {
        self.snapshots.lock().unwrap().push_back(Ok(snapshot));
    }

    pub fn push_snapshot_error(&self, err: PhorosError) {
        self.snapshots.lock().unwrap().push_back(Err(err));
    }
}

#[async_trait]
impl ChargingApi for MockChargingApi {
    async fn get_active_session(&self) -> Result<Option<Session>> {
        Ok(self.active_session.lock().unwrap().clone())
    }

    async fn get_session_status(
        &self,
        _session_id: &str,
        speed_multiplier: u32,
    ) -> Result<StatusSnapshot> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.last_speed.store(speed_multiplier, Ordering::SeqCst);
        match self.snapshots.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Err(PhorosError::network("no scripted snapshot")),
        }
    }

    async fn stop_session(&self, _session_id: &str, reading: StopReading) -> Result<Session> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stop_readings.lock().unwrap().push(reading);
        match self.stop_responses.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Err(PhorosError::network("no scripted stop response")),
        }
    }

    async fn get_session_by_id(&self, session_id: &str) -> Result<Session> {
        if let Some(err) = self.session_lookup_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| PhorosError::not_found(format!("session {}", session_id)))
    }

    async fn submit_wallet_payment(
        &self,
        _session_id: &str,
        _user_id: &str,
        _energy_consumed: f64,
        price_per_kwh: f64,
    ) -> Result<PaymentResult> {
        self.wallet_calls.fetch_add(1, Ordering::SeqCst);
        self.wallet_prices.lock().unwrap().push(price_per_kwh);
        match self.wallet_responses.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(PaymentResult {
                status: PaymentStatus::Completed,
                reference: Some("txn-1".to_string()),
            }),
        }
    }

    async fn submit_onsite_payment(
        &self,
        _session_id: &str,
        _user_id: &str,
        amount: f64,
        method: PaymentMethod,
    ) -> Result<PaymentResult> {
        self.onsite_calls.fetch_add(1, Ordering::SeqCst);
        self.onsite_amounts.lock().unwrap().push(amount);
        self.onsite_methods.lock().unwrap().push(method);
        match self.onsite_responses.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(PaymentResult {
                status: PaymentStatus::Pending,
                reference: Some("onsite-1".to_string()),
            }),
        }
    }
}

/// Recovery store double that keeps a handle for assertions after the
/// tracker takes ownership of its clone.
#[derive(Clone, Default)]
pub struct SharedRecoveryStore {
    slot: Arc<Mutex<Option<PendingPaymentRecord>>>,
    writes: Arc<AtomicU32>,
}

impl SharedRecoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: PendingPaymentRecord) -> Self {
        let store = Self::default();
        *store.slot.lock().unwrap() = Some(record);
        store
    }

    pub fn snapshot(&self) -> Option<PendingPaymentRecord> {
        self.slot.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }
}

impl RecoveryStore for SharedRecoveryStore {
    fn read(&self) -> Result<Option<PendingPaymentRecord>> {
        Ok(self.snapshot())
    }

    fn write(&mut self, record: &PendingPaymentRecord) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock().unwrap() = Some(record.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

pub fn charging_session(id: &str) -> Session {
    Session {
        id: id.to_string(),
        station_ref: "st-01".to_string(),
        charger_ref: "ch-01".to_string(),
        start_time: Utc::now(),
        status: SessionStatus::Charging,
        energy_consumed: 0.0,
        price_per_unit: Some(4000.0),
    }
}

pub fn completed_session(id: &str, energy: f64, price: Option<f64>) -> Session {
    Session {
        id: id.to_string(),
        station_ref: "st-01".to_string(),
        charger_ref: "ch-01".to_string(),
        start_time: Utc::now(),
        status: SessionStatus::Completed,
        energy_consumed: energy,
        price_per_unit: price,
    }
}

pub fn snapshot(soc: f64, energy: f64, status: SessionStatus) -> StatusSnapshot {
    StatusSnapshot {
        state_of_charge_percent: soc,
        energy_charged: energy,
        estimated_minutes_remaining: match status {
            SessionStatus::Charging => Some(30),
            _ => Some(0),
        },
        current_cost: energy * 4000.0,
        charging_power_kw: 7.4,
        price_per_unit: Some(4000.0),
        status,
    }
}

pub fn record_for(session_id: &str, energy: f64, price: Option<f64>) -> PendingPaymentRecord {
    PendingPaymentRecord {
        session_id: session_id.to_string(),
        session_status: SessionStatus::Completed,
        energy_consumed: energy,
        price_per_kwh: price,
        captured_at: Utc::now(),
    }
}

pub fn new_tracker(api: Arc<MockChargingApi>, store: SharedRecoveryStore) -> SessionTracker {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    SessionTracker::new(api, clock, Box::new(store), &Config::default())
}
