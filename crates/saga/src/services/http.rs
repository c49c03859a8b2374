//! HTTP inventory client speaking the hotel service's room API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{HotelId, RequestId, RoomId};
use serde::{Deserialize, Serialize};

use crate::error::InventoryError;
use crate::services::inventory::{AvailabilityOutcome, AvailabilityRequest, InventoryClient};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of `POST /rooms/{roomId}/confirm-availability`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmAvailabilityBody<'a> {
    start_date: NaiveDate,
    end_date: NaiveDate,
    room_id: i64,
    request_id: &'a str,
}

/// Response of `POST /rooms/{roomId}/confirm-availability`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityResponse {
    available: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    room_id: Option<i64>,
    #[serde(default)]
    hotel_id: Option<i64>,
}

/// Inventory client backed by the hotel service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpInventoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInventoryClient {
    /// Creates a client for `base_url` (e.g. `http://hotel-service/api`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, InventoryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a client reusing an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn room_url(&self, room_id: RoomId, action: &str) -> String {
        format!("{}/rooms/{}/{}", self.base_url, room_id, action)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, InventoryError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(InventoryError::Status { status, body })
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    #[tracing::instrument(
        skip(self, request),
        fields(room_id = %request.room_id, request_id = %request.request_id)
    )]
    async fn confirm_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityOutcome, InventoryError> {
        let body = ConfirmAvailabilityBody {
            start_date: request.dates.start(),
            end_date: request.dates.end(),
            room_id: request.room_id.get(),
            request_id: request.request_id.as_str(),
        };

        let response = self
            .client
            .post(self.room_url(request.room_id, "confirm-availability"))
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let payload: AvailabilityResponse = response
            .json()
            .await
            .map_err(|e| InventoryError::Decode(e.to_string()))?;

        tracing::debug!(available = payload.available, "inventory answered");

        Ok(AvailabilityOutcome {
            available: payload.available,
            reason: payload.message.unwrap_or_default(),
            request_id: payload
                .request_id
                .map(RequestId::new)
                .unwrap_or_else(|| request.request_id.clone()),
            room_id: payload.room_id.map(RoomId::new).unwrap_or(request.room_id),
            hotel_id: payload.hotel_id.map(HotelId::new),
        })
    }

    #[tracing::instrument(skip_all, fields(%room_id, %request_id))]
    async fn release(&self, room_id: RoomId, request_id: &RequestId) -> Result<(), InventoryError> {
        let response = self
            .client
            .post(self.room_url(room_id, "release"))
            .query(&[("requestId", request_id.as_str())])
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
