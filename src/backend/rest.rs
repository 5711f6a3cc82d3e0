//! PostgREST table client over reqwest.
//!
//! Thin HTTP wrapper for `/rest/v1/{table}`. Every request carries the
//! project's `apikey` header and a bearer token: the signed-in user's access
//! token when there is one, otherwise the anon key.

#[cfg(test)]
#[path = "rest_test.rs"]
mod rest_test;

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use serde_json::Value;

use super::query::{Filter, SelectQuery, parse_content_range_total};
use super::{AccessToken, TableClient};
use crate::config::BackendConfig;
use crate::error::BackendError;

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone, Debug)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    token: AccessToken,
}

impl RestClient {
    /// # Errors
    ///
    /// Returns [`BackendError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig, token: AccessToken) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;
        Ok(Self { http, base_url: config.rest_url(), anon_key: config.anon_key.clone(), token })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.token.get().unwrap_or_else(|| self.anon_key.clone());
        request.header("apikey", &self.anon_key).bearer_auth(bearer)
    }
}

#[async_trait::async_trait]
impl TableClient for RestClient {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>, BackendError> {
        let request = self.http.get(self.table_url(&query.table)).query(&query.to_pairs());
        let response = checked(self.authorize(request).send().await?).await?;
        let rows = response.json::<Vec<Value>>().await?;
        tracing::debug!(table = %query.table, rows = rows.len(), "select");
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>, BackendError> {
        let request = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        let response = checked(self.authorize(request).send().await?).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        if filters.is_empty() {
            // PostgREST would delete every visible row.
            return Err(BackendError::Config(format!("refusing unfiltered delete on {table}")));
        }
        let pairs = filters.iter().map(Filter::to_pair).collect::<Vec<_>>();
        let request = self.http.delete(self.table_url(table)).query(&pairs);
        checked(self.authorize(request).send().await?).await?;
        Ok(())
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, BackendError> {
        let mut pairs = vec![("select".to_owned(), "*".to_owned())];
        pairs.extend(filters.iter().map(Filter::to_pair));
        let request = self.http.head(self.table_url(table)).query(&pairs).header("Prefer", "count=exact");
        let response = checked(self.authorize(request).send().await?).await?;

        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| BackendError::Decode("missing Content-Range header".to_owned()))?;
        parse_content_range_total(range).ok_or_else(|| BackendError::Decode(format!("bad Content-Range: {range}")))
    }
}

// =============================================================================
// RESPONSE CHECK
// =============================================================================

/// Pass success responses through; turn anything else into
/// [`BackendError::Status`] carrying the body text.
pub(crate) async fn checked(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), %body, "backend rejected request");
    Err(BackendError::Status { status: status.as_u16(), body })
}
