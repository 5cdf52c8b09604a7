//! # medreg Client
//!
//! HTTP client for the registration servlet backend.
//!
//! [`ServletClient`] posts save batches to the save servlet and runs searches against the
//! patients endpoint. It implements [`Persistence`] and [`RowSource`] so a
//! [`GridSession`](medreg_core::GridSession) can drive it directly.

pub mod config;
pub mod error;
pub mod wire;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use wire::{ApiResponse, Page, SaveRequest};

use async_trait::async_trait;
use medreg_core::{
    PersistResult, Persistence, Row, RowSource, SaveBatch, SaveOutcome, SearchQuery,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};

trait WithBearer {
    fn with_bearer(self, token: Option<&str>) -> Self;
}

impl WithBearer for RequestBuilder {
    fn with_bearer(self, token: Option<&str>) -> Self {
        match token {
            Some(token) => self.bearer_auth(token),
            None => self,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServletClient {
    http: reqwest::Client,
    cfg: ClientConfig,
}

impl ServletClient {
    pub fn new(cfg: ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Self { http, cfg })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    /// Posts `batch` to the save servlet and returns its verdict.
    ///
    /// A `success = false` answer is returned as `Ok`; only transport failures and non-2xx
    /// statuses are errors.
    pub async fn save_rows(&self, batch: &SaveBatch<'_, Row>) -> ClientResult<SaveOutcome> {
        let url = self.cfg.save_url();
        tracing::debug!(%url, rows = batch.len(), "POST save request");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .json(&SaveRequest::from_batch(batch))
            .with_bearer(self.cfg.bearer_token())
            .send()
            .await?;
        let outcome: SaveOutcome = classify(response, &url)?.json().await?;

        tracing::debug!(%url, success = outcome.success, "save response");
        Ok(outcome)
    }

    /// Runs `query` against the search endpoint.
    pub async fn search(&self, query: &SearchQuery) -> ClientResult<Page<Row>> {
        let url = self.cfg.search_url();
        let params: Vec<(&str, &str)> = query.params().collect();
        tracing::debug!(%url, filters = params.len(), "GET search request");

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .query(&params)
            .with_bearer(self.cfg.bearer_token())
            .send()
            .await?;
        let envelope: ApiResponse<Page<Row>> = classify(response, &url)?.json().await?;

        if !envelope.success {
            let reason = envelope
                .error
                .or(envelope.message)
                .unwrap_or_else(|| "search failed".into());
            tracing::warn!(%url, "search rejected: {}", reason);
            return Err(ClientError::Api(reason));
        }
        envelope
            .data
            .ok_or_else(|| ClientError::Api("search response carried no data".into()))
    }
}

/// Maps a non-2xx status to its [`ClientError`], logging it.
fn classify(response: Response, url: &str) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let err = match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::FORBIDDEN => ClientError::Forbidden,
        StatusCode::NOT_FOUND => ClientError::NotFound(url.to_string()),
        s if s.is_server_error() => ClientError::Server { status: s.as_u16() },
        s => ClientError::UnexpectedStatus { status: s.as_u16() },
    };
    if status.is_server_error() {
        tracing::error!(%url, status = status.as_u16(), "{}", err);
    } else {
        tracing::warn!(%url, status = status.as_u16(), "{}", err);
    }
    Err(err)
}

#[async_trait]
impl Persistence<Row> for ServletClient {
    async fn submit(&self, batch: &SaveBatch<'_, Row>) -> PersistResult<SaveOutcome> {
        Ok(self.save_rows(batch).await?)
    }
}

#[async_trait]
impl RowSource<Row> for ServletClient {
    async fn fetch(&self, query: &SearchQuery) -> PersistResult<Vec<Row>> {
        Ok(self.search(query).await?.data)
    }
}
