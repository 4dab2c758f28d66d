//! Client for the location-record backend.
//!
//! Plain JSON bodies; every request carries the backend's two identity
//! headers. Failures come back in-band as `{"code": .., "error": ".."}`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::config::{join_url, ClientConfig};
use crate::context::ClientContext;
use crate::envelope::{self, Envelope, StatusFields};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{CreatedRecord, LocationDraft, LocationRecord, LocationRecordSet, RecordQuery};

pub const APPLICATION_ID_HEADER: &str = "X-Parse-Application-Id";
pub const REST_API_KEY_HEADER: &str = "X-Parse-REST-API-Key";

#[derive(Deserialize)]
struct RecordsResponse {
    results: Option<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRecordResponse {
    object_id: Option<String>,
    created_at: Option<String>,
}

pub struct RecordClient {
    records_url: String,
    application_id: String,
    rest_api_key: String,
    status: StatusFields,
    transport: Arc<dyn Transport>,
}

impl RecordClient {
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            records_url: join_url(&config.record_base_url, &config.records_path),
            application_id: config.application_id.clone(),
            rest_api_key: config.rest_api_key.clone(),
            status: config.record_status.clone(),
            transport,
        }
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest::new(method, url)
            .with_header(APPLICATION_ID_HEADER, self.application_id.as_str())
            .with_header(REST_API_KEY_HEADER, self.rest_api_key.as_str())
    }

    pub fn build_fetch_records(&self, query: &RecordQuery) -> HttpRequest {
        let params = form_urlencoded::Serializer::new(String::new())
            .append_pair("limit", &query.limit.to_string())
            .append_pair("skip", &query.skip.to_string())
            .append_pair("order", &query.order)
            .finish();
        self.request(HttpMethod::Get, format!("{}?{params}", self.records_url))
    }

    /// Decode a page of records.
    ///
    /// Entries that do not form a complete record are skipped; the order of
    /// the rest is kept.
    pub fn parse_fetch_records(&self, response: &HttpResponse) -> Result<LocationRecordSet, ApiError> {
        let value = envelope::decode(&response.body, Envelope::Plain, &self.status)?;
        let parsed: RecordsResponse = envelope::schema(value)?;
        let results = parsed.results.ok_or(ApiError::FieldMissing("results"))?;

        let total = results.len();
        let records: Vec<LocationRecord> = results
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(index, error = %e, "skipping malformed location record");
                    None
                }
            })
            .collect();
        debug!(total, kept = records.len(), "decoded location records");
        Ok(LocationRecordSet::new(records))
    }

    /// Validates the draft first; an incomplete draft never reaches the
    /// transport.
    pub fn build_create_record(&self, draft: &LocationDraft) -> Result<HttpRequest, ApiError> {
        let record = draft.validate()?;
        let body = serde_json::to_vec(&record).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self
            .request(HttpMethod::Post, self.records_url.clone())
            .with_json_body(body))
    }

    pub fn parse_create_record(&self, response: &HttpResponse) -> Result<CreatedRecord, ApiError> {
        let value = envelope::decode(&response.body, Envelope::Plain, &self.status)?;
        let parsed: CreateRecordResponse = envelope::schema(value)?;
        Ok(CreatedRecord {
            record_id: parsed.object_id.ok_or(ApiError::FieldMissing("objectId"))?,
            created_at: parsed.created_at.ok_or(ApiError::FieldMissing("createdAt"))?,
        })
    }

    /// Fetch a page of records and make it the context's current set.
    pub async fn fetch_records(
        &self,
        ctx: &ClientContext,
        query: &RecordQuery,
    ) -> Result<LocationRecordSet, ApiError> {
        let response = self.transport.send(self.build_fetch_records(query)).await?;
        debug!(status = response.status, "fetch records response");
        let records = self.parse_fetch_records(&response)?;
        ctx.replace_records(records.clone());
        Ok(records)
    }

    pub async fn create_record(&self, draft: &LocationDraft) -> Result<CreatedRecord, ApiError> {
        let request = self.build_create_record(draft)?;
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "create record response");
        let created = self.parse_create_record(&response)?;
        debug!(record_id = %created.record_id, "location posted");
        Ok(created)
    }
}
