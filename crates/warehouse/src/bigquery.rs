//! BigQuery engine over the REST API.
//!
//! - `estimate` → `jobs.query` with `dryRun: true`
//! - `execute` → `jobs.query`, then `jobs.getQueryResults` until the job is
//!   complete and every page is read
//! - `schema` → `tables.get`
//! - `list_tables` → `tables.list`
//!
//! Requests carry an OAuth bearer token (for example the output of
//! `gcloud auth print-access-token`).

use crate::dataset::{self, DatasetRef};
use crate::decode::{self, QueryResponse, TableList, TableResource};
use async_trait::async_trait;
use datacopilot_config::WarehouseConfig;
use datacopilot_core::engine::{ColumnSchema, QueryEngine, TabularResult};
use datacopilot_core::error::EngineError;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Server-side wait per `jobs.query` / `getQueryResults` call.
const QUERY_WAIT_MS: u64 = 10_000;

/// Upper bound on `getQueryResults` calls for one query.
const MAX_RESULT_CALLS: usize = 100;

/// A [`QueryEngine`] backed by BigQuery.
pub struct BigQueryEngine {
    api_url: String,
    access_token: String,
    /// Project billed for query jobs
    billing_project: String,
    dataset: DatasetRef,
    location: Option<String>,
    client: reqwest::Client,
}

impl BigQueryEngine {
    pub fn new(
        api_url: impl Into<String>,
        access_token: impl Into<String>,
        billing_project: impl Into<String>,
        dataset: DatasetRef,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            billing_project: billing_project.into(),
            dataset,
            location: None,
            client,
        }
    }

    /// Build an engine from the `[bigquery]` settings section.
    ///
    /// The billing project defaults to the dataset's own project.
    pub fn from_config(config: &WarehouseConfig) -> Result<Self, EngineError> {
        let token = config
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                EngineError::NotConfigured(
                    "GOOGLE_OAUTH_ACCESS_TOKEN is not set and bigquery.access_token is empty".into(),
                )
            })?;
        let dataset: DatasetRef = config.dataset_id.parse()?;
        let billing_project = config
            .project_id
            .clone()
            .unwrap_or_else(|| dataset.project.clone());

        let mut engine = Self::new(
            config.api_url.clone(),
            token,
            billing_project,
            dataset,
            Duration::from_secs(config.timeout_secs),
        );
        engine.location = config.location.clone();
        Ok(engine)
    }

    pub fn dataset(&self) -> &DatasetRef {
        &self.dataset
    }

    pub fn billing_project(&self) -> &str {
        &self.billing_project
    }

    fn query_body(&self, sql: &str, dry_run: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "query": sql,
            "useLegacySql": false,
            "dryRun": dry_run,
            "timeoutMs": QUERY_WAIT_MS,
            "defaultDataset": {
                "projectId": self.dataset.project,
                "datasetId": self.dataset.dataset,
            },
        });
        if let Some(location) = &self.location {
            body["location"] = serde_json::json!(location);
        }
        body
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, EngineError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            let message = decode::error_message(&body);
            return Err(match status {
                401 | 403 => EngineError::Auth(message),
                404 => EngineError::NotFound(message),
                _ => {
                    warn!(status, error = %message, "BigQuery returned error");
                    EngineError::Api {
                        status_code: status,
                        message,
                    }
                }
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| EngineError::Decode(e.to_string()))
    }

    /// `tables.get` URL for a table of the configured dataset.
    fn table_url(&self, table: &str) -> Result<String, EngineError> {
        let table = dataset::table_id(table).inspect_err(|e| {
            warn!(error = %e, "Rejected table name");
        })?;
        Ok(format!(
            "{}/projects/{}/datasets/{}/tables/{}",
            self.api_url, self.dataset.project, self.dataset.dataset, table
        ))
    }

    async fn post_query(&self, sql: &str, dry_run: bool) -> Result<QueryResponse, EngineError> {
        let url = format!("{}/projects/{}/queries", self.api_url, self.billing_project);
        self.send(self.client.post(&url).json(&self.query_body(sql, dry_run)))
            .await
    }

    async fn get_query_results(
        &self,
        job_id: &str,
        location: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, EngineError> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.api_url, self.billing_project, job_id
        );
        let mut query: Vec<(&str, String)> = vec![("timeoutMs", QUERY_WAIT_MS.to_string())];
        if let Some(location) = location {
            query.push(("location", location.to_string()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        self.send(self.client.get(&url).query(&query)).await
    }
}

#[async_trait]
impl QueryEngine for BigQueryEngine {
    fn name(&self) -> &str {
        "bigquery"
    }

    async fn estimate(&self, sql: &str) -> Result<u64, EngineError> {
        let response = self.post_query(sql, true).await?;
        let bytes = decode::bytes_processed(&response)?;
        debug!(bytes, "Dry run complete");
        Ok(bytes)
    }

    async fn execute(&self, sql: &str) -> Result<TabularResult, EngineError> {
        let mut page = self.post_query(sql, false).await?;
        let job = page.job_reference.take();
        let job_id = job.as_ref().map(|j| j.job_id.clone());
        let location = job
            .and_then(|j| j.location)
            .or_else(|| self.location.clone());

        let mut schema = None;
        let mut result = TabularResult::default();
        let mut calls = 0;

        loop {
            if page.job_complete {
                if schema.is_none() {
                    let page_schema = page.schema.take().ok_or_else(|| {
                        EngineError::Decode("completed query has no schema".into())
                    })?;
                    result = TabularResult::new(decode::columns(&page_schema));
                    schema = Some(page_schema);
                }
                if let Some(schema) = &schema {
                    decode::append_rows(&mut result, schema, std::mem::take(&mut page.rows))?;
                }
                if page.page_token.is_none() {
                    break;
                }
            }

            calls += 1;
            if calls > MAX_RESULT_CALLS {
                return Err(EngineError::Api {
                    status_code: 408,
                    message: format!("query did not finish after {MAX_RESULT_CALLS} result calls"),
                });
            }

            let job_id = job_id
                .as_deref()
                .ok_or_else(|| EngineError::Decode("incomplete query has no job reference".into()))?;
            page = self
                .get_query_results(job_id, location.as_deref(), page.page_token.as_deref())
                .await?;
        }

        debug!(rows = result.row_count(), "Query complete");
        Ok(result)
    }

    async fn schema(&self, table: &str) -> Result<Vec<ColumnSchema>, EngineError> {
        let url = self.table_url(table)?;
        let resource: TableResource = self.send(self.client.get(&url)).await?;
        Ok(resource
            .schema
            .map(|s| s.fields.into_iter().map(ColumnSchema::from).collect())
            .unwrap_or_default())
    }

    async fn list_tables(&self) -> Result<Vec<String>, EngineError> {
        let url = format!(
            "{}/projects/{}/datasets/{}/tables",
            self.api_url, self.dataset.project, self.dataset.dataset
        );
        let mut tables = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: TableList = self.send(request).await?;
            tables.extend(page.tables.into_iter().map(|t| t.table_reference.table_id));
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(tables)
    }
}
