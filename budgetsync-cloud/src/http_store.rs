//! HTTP implementation of [`RemoteStore`] over a JSON document API.
//!
//! Endpoints:
//! - `PUT  /v1/{collection}/{id}` writes a document
//! - `GET  /v1/{collection}/{id}` reads one (404 means absent)
//! - `POST /v1/{collection}:query` runs a single-field filter
//! - `POST /v1:commit` applies a write batch atomically

use crate::error::{StoreError, StoreResult};
use crate::store::{Document, DocumentSnapshot, QueryOp, RemoteStore, WriteBatch};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    field: &'a str,
    op: QueryOp,
    value: &'a Value,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<QueryHit>,
}

#[derive(Deserialize)]
struct QueryHit {
    id: String,
    data: Document,
}

impl HttpDocumentStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/v1/{collection}/{id}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// 429 and 5xx are worth retrying; other failures are not.
async fn check_status(resp: Response) -> StoreResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = format!("{status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Err(StoreError::Unavailable(message))
    } else {
        Err(StoreError::Rejected(message))
    }
}

#[async_trait]
impl RemoteStore for HttpDocumentStore {
    async fn set_document(&self, collection: &str, id: &str, data: Document) -> StoreResult<()> {
        let url = self.document_url(collection, id);
        let resp = self.authorize(self.client.put(&url)).json(&data).send().await?;
        check_status(resp).await?;
        debug!("stored document {collection}/{id}");
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<DocumentSnapshot> {
        let url = self.document_url(collection, id);
        let resp = self.authorize(self.client.get(&url)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(DocumentSnapshot {
                id: id.to_string(),
                data: None,
            });
        }
        let data: Document = check_status(resp).await?.json().await?;
        Ok(DocumentSnapshot {
            id: id.to_string(),
            data: Some(data),
        })
    }

    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
    ) -> StoreResult<Vec<DocumentSnapshot>> {
        let url = format!("{}/v1/{collection}:query", self.base_url);
        let resp = self
            .authorize(self.client.post(&url))
            .json(&QueryRequest { field, op, value })
            .send()
            .await?;
        let body: QueryResponse = check_status(resp).await?.json().await?;
        debug!("query on {collection} returned {} documents", body.documents.len());
        Ok(body
            .documents
            .into_iter()
            .map(|hit| DocumentSnapshot {
                id: hit.id,
                data: Some(hit.data),
            })
            .collect())
    }

    async fn commit_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        let url = format!("{}/v1:commit", self.base_url);
        let count = batch.len();
        let resp = self.authorize(self.client.post(&url)).json(&batch).send().await?;
        check_status(resp).await?;
        debug!("committed batch of {count} writes");
        Ok(())
    }
}
