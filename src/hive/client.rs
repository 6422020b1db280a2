use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::hive::{Cell, ResultSet, Warehouse};
use crate::settings::HiveConfig;

const USER_AGENT: &str = concat!("hive-ingest/", env!("CARGO_PKG_VERSION"));

/// One session against a HiveServer2 REST SQL gateway (Kyuubi REST API v1).
pub struct HiveClient {
    client: Client,
    config: HiveConfig,
    base_url: String,
    session: String,
}

#[derive(Debug, Deserialize)]
struct Handle {
    identifier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationEvent {
    state: String,
    #[serde(default)]
    exception: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RowSet {
    #[serde(default)]
    rows: Vec<RowSetRow>,
    #[serde(default)]
    row_count: usize,
}

#[derive(Debug, Deserialize)]
struct ResultSetMetadata {
    #[serde(default)]
    columns: Vec<ColumnDesc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnDesc {
    column_name: String,
}

#[derive(Debug, Deserialize)]
struct RowSetRow {
    #[serde(default)]
    fields: Vec<RowSetField>,
}

#[derive(Debug, Deserialize)]
struct RowSetField {
    #[serde(default)]
    value: Value,
}

/// Terminal state of an operation, as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationState {
    Running,
    Finished,
    Failed,
}

fn classify_state(state: &str) -> OperationState {
    match state {
        "FINISHED_STATE" => OperationState::Finished,
        "INITIALIZED_STATE" | "PENDING_STATE" | "RUNNING_STATE" | "COMPILED_STATE" => {
            OperationState::Running
        }
        _ => OperationState::Failed,
    }
}

fn cell(value: Value) -> Cell {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl HiveClient {
    /// Opens a session; every statement issued through this client runs in it.
    pub async fn connect(config: HiveConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build Hive HTTP client")?;
        let base_url = format!("{}/api/v1", config.url.trim_end_matches('/'));

        let mut hive = Self {
            client,
            config,
            base_url,
            session: String::new(),
        };

        let body = json!({
            "userName": hive.config.user,
            "password": hive.config.password.clone().unwrap_or_default(),
            "configs": {}
        });
        let handle: Handle = hive
            .send_json(hive.post("/sessions").json(&body))
            .await
            .with_context(|| format!("Error connecting to Hive at {}", hive.config.url))?;

        debug!(session = %handle.identifier, "Hive session opened");
        hive.session = handle.identifier;
        Ok(hive)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.config.user, self.config.password.as_deref())
            .header(ACCEPT, "application/json")
            .header("User-Agent", USER_AGENT)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authed(self.client.post(format!("{}{}", self.base_url, path)))
            .header(CONTENT_TYPE, "application/json")
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authed(self.client.get(format!("{}{}", self.base_url, path)))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .context("Failed to send request to Hive")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Hive API Error ({}): {}", status, body);
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .context("Failed to decode Hive API response")
    }

    /// Submits a statement and waits for it to reach a terminal state.
    async fn run_statement(&self, sql: &str) -> Result<String> {
        debug!(%sql, "Executing Hive statement");
        let body = json!({
            "statement": sql,
            "runAsync": false,
            "queryTimeout": 0,
            "confOverlay": {}
        });
        let handle: Handle = self
            .send_json(
                self.post(&format!("/sessions/{}/operations/statement", self.session))
                    .json(&body),
            )
            .await?;
        let operation = handle.identifier;

        loop {
            let event: OperationEvent = self
                .send_json(self.get(&format!("/operations/{}/event", operation)))
                .await?;

            match classify_state(&event.state) {
                OperationState::Finished => return Ok(operation),
                OperationState::Running => {
                    tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
                }
                OperationState::Failed => {
                    self.close_operation(&operation).await;
                    let reason = event
                        .exception
                        .filter(|e| !e.is_empty())
                        .unwrap_or_else(|| "no error message".to_string());
                    return Err(anyhow!("Statement ended in {}: {}", event.state, reason));
                }
            }
        }
    }

    async fn fetch_columns(&self, operation: &str) -> Result<Vec<String>> {
        let metadata: ResultSetMetadata = self
            .send_json(self.get(&format!("/operations/{}/resultsetmetadata", operation)))
            .await?;
        Ok(metadata.columns.into_iter().map(|c| c.column_name).collect())
    }

    async fn fetch_all(&self, operation: &str) -> Result<Vec<Vec<Cell>>> {
        let fetch_size = self.config.fetch_size.max(1);
        let mut rows: Vec<Vec<Cell>> = Vec::new();
        loop {
            let page: RowSet = self
                .send_json(self.get(&format!(
                    "/operations/{}/rowset?maxrows={}&fetchorientation=FETCH_NEXT",
                    operation, fetch_size
                )))
                .await?;

            if page.row_count == 0 && page.rows.is_empty() {
                break;
            }
            let fetched = page.rows.len();
            rows.extend(
                page.rows
                    .into_iter()
                    .map(|r| r.fields.into_iter().map(|f| cell(f.value)).collect::<Vec<_>>()),
            );
            if fetched < fetch_size {
                break;
            }
        }
        Ok(rows)
    }

    async fn fetch_result(&self, operation: &str) -> Result<ResultSet> {
        let columns = self.fetch_columns(operation).await?;
        let rows = self.fetch_all(operation).await?;
        Ok(ResultSet { columns, rows })
    }

    async fn close_operation(&self, operation: &str) {
        let request = self.authed(
            self.client
                .put(format!("{}/operations/{}", self.base_url, operation))
                .json(&json!({ "action": "CLOSE" })),
        );
        if let Err(e) = self.send(request).await {
            warn!(operation, "Failed to close Hive operation: {:#}", e);
        }
    }

    pub async fn close(self) -> Result<()> {
        let request = self.authed(
            self.client
                .delete(format!("{}/sessions/{}", self.base_url, self.session)),
        );
        self.send(request).await?;
        debug!(session = %self.session, "Hive session closed");
        Ok(())
    }
}

#[async_trait]
impl Warehouse for HiveClient {
    async fn execute(&self, statement: &str) -> Result<()> {
        let operation = self.run_statement(statement).await?;
        self.close_operation(&operation).await;
        Ok(())
    }

    async fn query(&self, statement: &str) -> Result<ResultSet> {
        let operation = self.run_statement(statement).await?;
        let result = self.fetch_result(&operation).await;
        self.close_operation(&operation).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_state() {
        assert_eq!(classify_state("FINISHED_STATE"), OperationState::Finished);
        assert_eq!(classify_state("RUNNING_STATE"), OperationState::Running);
        assert_eq!(classify_state("PENDING_STATE"), OperationState::Running);
        assert_eq!(classify_state("ERROR_STATE"), OperationState::Failed);
        assert_eq!(classify_state("CANCELED_STATE"), OperationState::Failed);
    }

    #[test]
    fn test_cell_conversion() {
        assert_eq!(cell(Value::Null), None);
        assert_eq!(cell(json!("actor")), Some("actor".to_string()));
        assert_eq!(cell(json!(200)), Some("200".to_string()));
        assert_eq!(cell(json!(true)), Some("true".to_string()));
    }
}
