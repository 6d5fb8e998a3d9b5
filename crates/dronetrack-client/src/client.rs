//! HTTP client for the json-server style order store.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use dronetrack_core::models::{Mission, Order, OrderStatus, TelemetryPoint, TelemetryRecord};

use crate::{OrderStore, StoreError};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Client for the order/mission REST store.
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
    request_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusPatch {
    status: OrderStatus,
    updated_at: chrono::DateTime<Utc>,
}

impl StoreClient {
    /// Create a client for a store at `base_url` (e.g. "http://localhost:3001").
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(StoreError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_id: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Tag every request with an `X-Request-ID` for log correlation.
    pub fn set_request_id(&mut self, request_id: Option<String>) {
        self.request_id = request_id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_request_id(&self, request: RequestBuilder) -> RequestBuilder {
        match self.request_id.as_deref() {
            Some(value) => request.header("X-Request-ID", value),
            None => request,
        }
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, StoreError> {
        self.apply_request_id(request)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                url: url.to_string(),
                source,
            })
    }

    async fn read_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, StoreError> {
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.json().await.map_err(|source| StoreError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn get_record<T: DeserializeOwned>(
        &self,
        kind: &'static str,
        path: &str,
        id: &str,
    ) -> Result<T, StoreError> {
        let url = self.url(path);
        let response = self.send(&url, self.client.get(&url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(kind, id));
        }
        Self::read_json(&url, response).await
    }

    async fn query<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, StoreError> {
        let url = self.url(path);
        let response = self.send(&url, self.client.get(&url).query(params)).await?;
        Self::read_json(&url, response).await
    }
}

#[async_trait]
impl OrderStore for StoreClient {
    async fn fetch_order(&self, order_id: &str) -> Result<Order, StoreError> {
        self.get_record("order", &format!("/orders/{}", order_id), order_id)
            .await
    }

    async fn fetch_mission(&self, mission_id: &str) -> Result<Mission, StoreError> {
        self.get_record("mission", &format!("/droneMissions/{}", mission_id), mission_id)
            .await
    }

    async fn fetch_mission_for_order(&self, order_id: &str) -> Result<Option<Mission>, StoreError> {
        let missions: Vec<Mission> = self
            .query("/droneMissions", &[("orderId", order_id)])
            .await?;
        Ok(missions.into_iter().next())
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<Order, StoreError> {
        let url = self.url(&format!("/orders/{}", order_id));
        let patch = StatusPatch {
            status,
            updated_at: Utc::now(),
        };
        let response = self.send(&url, self.client.patch(&url).json(&patch)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found("order", order_id));
        }
        let order: Order = Self::read_json(&url, response).await?;
        tracing::debug!(order_id, status = %order.status, "order status patched");
        Ok(order)
    }

    async fn fetch_telemetry(&self, mission_id: &str) -> Result<Vec<TelemetryPoint>, StoreError> {
        let mut records: Vec<TelemetryRecord> = self
            .query("/droneTelemetry", &[("missionId", mission_id)])
            .await?;
        records.sort_by_key(|record| record.timestamp);
        Ok(records.iter().map(TelemetryPoint::from).collect())
    }
}
