//! Portal backend API
//!
//! The engine consumes the reservation portal's REST backend through the
//! [`ChargingApi`] trait so the tracker can be exercised against scripted
//! collaborators in tests. [`RestApiClient`] is the production implementation.

use crate::config::ApiConfig;
use crate::error::{PhorosError, Result};
use crate::logging::get_logger;
use crate::payment::{PaymentMethod, PaymentResult};
use crate::session::{Session, StatusSnapshot, StopReading};
use async_trait::async_trait;
use serde_json::json;

/// Operations consumed from the portal backend
#[async_trait]
pub trait ChargingApi: Send + Sync {
    /// The caller's currently active session, if any
    async fn get_active_session(&self) -> Result<Option<Session>>;

    /// Point-in-time status of a session, at the given progress multiplier
    async fn get_session_status(
        &self,
        session_id: &str,
        speed_multiplier: u32,
    ) -> Result<StatusSnapshot>;

    /// Stop a session, passing the last observed readings; returns the
    /// server-finalized session
    async fn stop_session(&self, session_id: &str, reading: StopReading) -> Result<Session>;

    /// Authoritative session record
    async fn get_session_by_id(&self, session_id: &str) -> Result<Session>;

    /// Atomic wallet debit-and-record; success is immediate and final
    async fn submit_wallet_payment(
        &self,
        session_id: &str,
        user_id: &str,
        energy_consumed: f64,
        price_per_kwh: f64,
    ) -> Result<PaymentResult>;

    /// On-site payment record; a staff confirmation step finalizes it later
    async fn submit_onsite_payment(
        &self,
        session_id: &str,
        user_id: &str,
        amount: f64,
        method: PaymentMethod,
    ) -> Result<PaymentResult>;
}

/// REST client for the portal backend
pub struct RestApiClient {
    base_url: String,
    client: reqwest::Client,
    logger: crate::logging::StructuredLogger,
}

impl RestApiClient {
    /// Create a client from connection configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let logger = get_logger("api");
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            logger,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Per-request correlation id, echoed by the backend into its own logs
    fn request_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    async fn expect_success(
        &self,
        resp: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        self.logger
            .warn(&format!("{} returned HTTP {}", what, status));
        if status == reqwest::StatusCode::NOT_FOUND {
            Err(PhorosError::not_found(format!("{}: {}", what, status)))
        } else {
            Err(PhorosError::api(format!("{}: {}", what, status)))
        }
    }
}

#[async_trait]
impl ChargingApi for RestApiClient {
    async fn get_active_session(&self) -> Result<Option<Session>> {
        let resp = self
            .client
            .get(self.url("/sessions/active"))
            .header("X-Request-Id", Self::request_id())
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = self.expect_success(resp, "get_active_session").await?;
        let session: Session = resp.json().await?;
        Ok(Some(session))
    }

    async fn get_session_status(
        &self,
        session_id: &str,
        speed_multiplier: u32,
    ) -> Result<StatusSnapshot> {
        let resp = self
            .client
            .get(self.url(&format!("/sessions/{}/status", session_id)))
            .query(&[("speed", speed_multiplier)])
            .header("X-Request-Id", Self::request_id())
            .send()
            .await?;
        let resp = self.expect_success(resp, "get_session_status").await?;
        Ok(resp.json().await?)
    }

    async fn stop_session(&self, session_id: &str, reading: StopReading) -> Result<Session> {
        let resp = self
            .client
            .post(self.url(&format!("/sessions/{}/stop", session_id)))
            .header("X-Request-Id", Self::request_id())
            .json(&reading)
            .send()
            .await?;
        let resp = self.expect_success(resp, "stop_session").await?;
        Ok(resp.json().await?)
    }

    async fn get_session_by_id(&self, session_id: &str) -> Result<Session> {
        let resp = self
            .client
            .get(self.url(&format!("/sessions/{}", session_id)))
            .header("X-Request-Id", Self::request_id())
            .send()
            .await?;
        let resp = self.expect_success(resp, "get_session_by_id").await?;
        Ok(resp.json().await?)
    }

    async fn submit_wallet_payment(
        &self,
        session_id: &str,
        user_id: &str,
        energy_consumed: f64,
        price_per_kwh: f64,
    ) -> Result<PaymentResult> {
        let resp = self
            .client
            .post(self.url("/payments/wallet"))
            .header("X-Request-Id", Self::request_id())
            .json(&json!({
                "sessionId": session_id,
                "userId": user_id,
                "energyConsumed": energy_consumed,
                "pricePerKwh": price_per_kwh,
            }))
            .send()
            .await?;
        let resp = self.expect_success(resp, "submit_wallet_payment").await?;
        Ok(resp.json().await?)
    }

    async fn submit_onsite_payment(
        &self,
        session_id: &str,
        user_id: &str,
        amount: f64,
        method: PaymentMethod,
    ) -> Result<PaymentResult> {
        let resp = self
            .client
            .post(self.url("/payments/onsite"))
            .header("X-Request-Id", Self::request_id())
            .json(&json!({
                "sessionId": session_id,
                "userId": user_id,
                "amount": amount,
                "method": method,
            }))
            .send()
            .await?;
        let resp = self.expect_success(resp, "submit_onsite_payment").await?;
        Ok(resp.json().await?)
    }
}
