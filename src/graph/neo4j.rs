//! Neo4j store over the HTTP transactional endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::cypher::{self, Statement};
use super::{GraphStore, Identity, NodeRef, Properties, IDENTITY_PROPERTY};
use crate::config::TargetConfig;
use crate::error::{MigrationError, Result};

/// Request body for `/db/<database>/tx/commit`
#[derive(Serialize)]
struct TxRequest<'a> {
    statements: [&'a Statement; 1],
}

/// Response body from `/db/<database>/tx/commit`
#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl TxResponse {
    /// Rows of the single statement, or the first reported error.
    fn into_rows(self) -> Result<Vec<Vec<Value>>> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(MigrationError::Query(format!("{}: {}", err.code, err.message)));
        }
        Ok(self
            .results
            .into_iter()
            .next()
            .map(|r| r.data.into_iter().map(|d| d.row).collect())
            .unwrap_or_default())
    }
}

/// Neo4j graph store
///
/// Each statement is sent as its own auto-committed transaction.
pub struct Neo4jStore {
    client: Client,
    endpoint: Url,
    user: String,
    password: Option<String>,
}

impl Neo4jStore {
    /// Build a store for the configured server without contacting it
    pub fn new(target: &TargetConfig) -> Result<Self> {
        let endpoint = commit_endpoint(&target.url, &target.database)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(target.timeout_secs))
            .build()
            .map_err(|e| MigrationError::Connection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            user: target.user.clone(),
            password: target.password(),
        })
    }

    /// Build a store and verify the server answers
    pub async fn connect(target: &TargetConfig) -> Result<Self> {
        let store = Self::new(target)?;
        store.run(&cypher::ping()).await?;
        log::info!("Connected to Neo4j at {}", store.endpoint);
        Ok(store)
    }

    /// Execute one statement and return its result rows
    pub async fn run(&self, statement: &Statement) -> Result<Vec<Vec<Value>>> {
        log::debug!("cypher: {}", statement.statement);

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header("Accept", "application/json")
            .json(&TxRequest {
                statements: [statement],
            });
        if let Some(password) = &self.password {
            request = request.basic_auth(&self.user, Some(password));
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            let message = format!("Neo4j HTTP error {}: {}", status, body);
            return Err(if status == reqwest::StatusCode::UNAUTHORIZED {
                MigrationError::Connection(message)
            } else {
                MigrationError::Query(message)
            });
        }

        let body: TxResponse = response
            .json()
            .await
            .map_err(|e| MigrationError::Query(format!("Failed to parse response: {}", e)))?;

        body.into_rows()
    }

    async fn single_key(&self, statement: &Statement) -> Result<Option<String>> {
        let rows = self.run(statement).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    async fn single_count(&self, statement: &Statement) -> Result<u64> {
        let rows = self.run(statement).await?;
        rows.first()
            .and_then(|row| row.first())
            .and_then(Value::as_u64)
            .ok_or_else(|| MigrationError::Query("count returned no value".to_string()))
    }
}

impl GraphStore for Neo4jStore {
    async fn wipe(&mut self) -> Result<()> {
        self.run(&cypher::wipe()).await?;
        Ok(())
    }

    async fn drop_unique_constraint(&mut self, label: &str) -> Result<()> {
        let rows = self
            .run(&cypher::unique_constraints_on(label))
            .await
            .map_err(|e| constraint_drop_error(label, e))?;
        let names: Vec<String> = rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect();

        if names.is_empty() {
            return Err(MigrationError::ConstraintDrop {
                label: label.to_string(),
                message: format!("No uniqueness constraint on {}.{}", label, IDENTITY_PROPERTY),
            });
        }

        for name in names {
            self.run(&cypher::drop_constraint(&name))
                .await
                .map_err(|e| constraint_drop_error(label, e))?;
            log::debug!("Dropped constraint {}", name);
        }
        Ok(())
    }

    async fn create_unique_constraint(&mut self, label: &str) -> Result<()> {
        self.run(&cypher::create_unique_constraint(label))
            .await
            .map_err(|e| match e {
                MigrationError::Query(message) => MigrationError::ConstraintCreation {
                    label: label.to_string(),
                    message,
                },
                other => other,
            })?;
        Ok(())
    }

    async fn find_node(&self, label: &str, identity: &Identity) -> Result<Option<NodeRef>> {
        let key = self.single_key(&cypher::match_node(label, identity)).await?;
        Ok(key.map(|key| NodeRef {
            label: label.to_string(),
            identity: identity.clone(),
            key,
        }))
    }

    async fn create_node(&mut self, label: &str, identity: &Identity) -> Result<NodeRef> {
        let key = self
            .single_key(&cypher::create_node(label, identity))
            .await?
            .ok_or_else(|| {
                MigrationError::Query(format!("CREATE returned no node for {}({})", label, identity))
            })?;
        Ok(NodeRef {
            label: label.to_string(),
            identity: identity.clone(),
            key,
        })
    }

    async fn create_relationship(
        &mut self,
        from: &NodeRef,
        to: &NodeRef,
        relation: &str,
        properties: &Properties,
    ) -> Result<()> {
        self.run(&cypher::create_relationship(&from.key, &to.key, relation, properties))
            .await?;
        Ok(())
    }

    async fn count_nodes(&self) -> Result<u64> {
        self.single_count(&cypher::count_nodes()).await
    }

    async fn count_relationships(&self) -> Result<u64> {
        self.single_count(&cypher::count_relationships()).await
    }
}

/// `<base>/db/<database>/tx/commit`
fn commit_endpoint(base: &str, database: &str) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| MigrationError::Config(format!("Invalid target url '{}': {}", base, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.join(&format!("db/{}/tx/commit", database))
        .map_err(|e| MigrationError::Config(format!("Invalid target database '{}': {}", database, e)))
}

/// Statement failures during a drop become `ConstraintDrop`; transport errors pass through.
fn constraint_drop_error(label: &str, e: MigrationError) -> MigrationError {
    match e {
        MigrationError::Query(message) => MigrationError::ConstraintDrop {
            label: label.to_string(),
            message,
        },
        other => other,
    }
}

fn transport_error(e: reqwest::Error) -> MigrationError {
    if e.is_connect() || e.is_timeout() {
        MigrationError::Connection(format!("Neo4j unreachable: {}", e))
    } else {
        MigrationError::Query(format!("Network error: {}", e))
    }
}
