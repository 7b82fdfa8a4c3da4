//! HTTP implementation of the analytics gateway.
//!
//! Talks to the engine's REST facade with a blocking `reqwest` client; the
//! cache layer holds its lock across the round-trip, so there is nothing to
//! gain from an async client here. Timeouts are the transport's job, the
//! caches implement none of their own.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{AnomalyRecord, ElementInfo, ScorePoint};

use super::{AnalyticsGateway, GatewayError, SeriesShape};

/// HTTP request timeout in seconds.
/// A full 7-day score fetch can be slow on loaded agents; 30s covers that
/// while still failing fast enough for an interactive caller.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Gateway against the engine's REST facade.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    /// Create a gateway with the given bearer token, sharing the connection
    /// pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    /// Check if response is successful, returning an error with body if not.
    fn check_response(response: Response) -> Result<Response, GatewayError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            Err(GatewayError::from_status(status, &body))
        }
    }

    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "gateway request");

        let mut request = self.client.get(&url).query(query);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = Self::check_response(request.send()?)?;
        response
            .json()
            .map_err(|e| GatewayError::InvalidResponse(format!("{}: {}", url, e)))
    }
}

impl AnalyticsGateway for HttpGateway {
    fn fetch_anomalies(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<AnomalyRecord>, GatewayError> {
        self.get(
            "/api/custom/relationalanomalies/anomalies",
            &[
                ("start", window_start.to_rfc3339()),
                ("end", window_end.to_rfc3339()),
            ],
        )
    }

    fn fetch_score_series(
        &self,
        shape: &SeriesShape,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScorePoint>, GatewayError> {
        let mut query = vec![("start", start.to_rfc3339()), ("end", end.to_rfc3339())];
        match shape {
            SeriesShape::BySubgroupId {
                owner_id,
                group_name,
                subgroup_id,
            } => {
                query.push(("ownerId", owner_id.to_string()));
                query.push(("groupName", group_name.clone()));
                query.push(("subgroupId", subgroup_id.to_string()));
            }
            SeriesShape::BySubgroupName {
                owner_id,
                group_name,
                subgroup_name,
            } => {
                query.push(("ownerId", owner_id.to_string()));
                query.push(("groupName", group_name.clone()));
                query.push(("subgroupName", subgroup_name.clone()));
            }
            SeriesShape::WholeGroup {
                owner_id,
                group_name,
            } => {
                query.push(("ownerId", owner_id.to_string()));
                query.push(("groupName", group_name.clone()));
            }
        }

        self.get("/api/custom/relationalanomalies/scores", &query)
    }

    fn fetch_element_info(
        &self,
        owner_id: i64,
        element_id: i64,
    ) -> Result<ElementInfo, GatewayError> {
        self.get(
            &format!("/api/custom/elements/{}/{}/info", owner_id, element_id),
            &[],
        )
    }
}
