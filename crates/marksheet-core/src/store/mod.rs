//! Record store: write extracted fields back to the submission row.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::config::StoreConfig;
use crate::models::document::CandidateFields;

/// Fields written to a submission record.
///
/// `name` and `grade12` are omitted when unknown so an update never blanks
/// a value already on the record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatePayload {
    pub status: String,
    pub ai_score: f64,
    pub recommended_branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade12: Option<f64>,
}

impl UpdatePayload {
    pub fn from_fields(status: impl Into<String>, fields: &CandidateFields) -> Self {
        Self {
            status: status.into(),
            ai_score: fields.suitability_score,
            recommended_branch: fields.recommended_category.clone(),
            name: fields.name.clone(),
            grade12: fields.grade_value,
        }
    }
}

/// Persistent store of submission records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Update one record, returning the store's representation of it.
    async fn update(&self, submission_id: &str, payload: &UpdatePayload)
    -> Result<Value, StoreError>;
}

/// Supabase (PostgREST) record store.
pub struct SupabaseStore {
    client: reqwest::Client,
    url: String,
    service_role_key: String,
    table: String,
}

impl SupabaseStore {
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        config
            .validate()
            .map_err(|e| StoreError::NotConfigured(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config
                .url
                .as_deref()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            service_role_key: config.service_role_key.clone().unwrap_or_default(),
            table: config.table.clone(),
        })
    }

    fn endpoint(&self, submission_id: &str) -> String {
        format!("{}/rest/v1/{}?id=eq.{}", self.url, self.table, submission_id)
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn update(
        &self,
        submission_id: &str,
        payload: &UpdatePayload,
    ) -> Result<Value, StoreError> {
        info!("Updating submission {} in {}", submission_id, self.table);

        let response = self
            .client
            .patch(self.endpoint(submission_id))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .header("Prefer", "return=representation")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Store responded with {} bytes", body.len());

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}
