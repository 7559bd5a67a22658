//! Client for the external scoring service that proposes order assignments.
//!
//! The service receives the open orders and available distributors for a day and
//! answers with scored suggestions. How it scores them is its own business.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::order::OrderPriority;
use crate::entities::scheduling_draft::DraftSuggestion;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("scheduler request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scheduler answered with status {0}")]
    Status(u16),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderCandidate {
    pub order_id: Uuid,
    pub order_number: String,
    pub store_id: Uuid,
    pub area: Option<String>,
    pub priority: OrderPriority,
    pub delivery_date: Option<NaiveDate>,
    pub total_eur: Decimal,
    pub preferred_distributor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributorCandidate {
    pub distributor_id: Uuid,
    pub name: String,
    pub working_area: Option<String>,
    pub max_daily_orders: i32,
    pub assigned_orders: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestionRequest {
    pub date: NaiveDate,
    pub orders: Vec<OrderCandidate>,
    pub distributors: Vec<DistributorCandidate>,
}

#[derive(Debug, Deserialize)]
struct SuggestionResponse {
    #[serde(default)]
    suggestions: Vec<DraftSuggestion>,
}

/// Anything that can propose assignments for a day
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<DraftSuggestion>, SchedulerError>;
}

pub struct HttpSuggestionSource {
    client: Client,
    url: url::Url,
}

impl HttpSuggestionSource {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(url: url::Url, timeout: std::time::Duration) -> Result<Self, SchedulerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl SuggestionSource for HttpSuggestionSource {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<DraftSuggestion>, SchedulerError> {
        info!(
            url = %self.url,
            date = %request.date,
            orders = request.orders.len(),
            distributors = request.distributors.len(),
            "Requesting scheduling suggestions"
        );

        let response = self.client.post(self.url.clone()).json(request).send().await?;
        if !response.status().is_success() {
            return Err(SchedulerError::Status(response.status().as_u16()));
        }
        let body: SuggestionResponse = response.json().await?;

        debug!(count = body.suggestions.len(), "Received suggestions");
        Ok(body.suggestions)
    }
}
