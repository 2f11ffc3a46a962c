//! Transport and execution context for compiled query plans
//!
//! The core crate is pure: it compiles plans and decodes responses without
//! ever touching the network. This crate closes the loop. A [`Transport`]
//! carries a compiled [`WireSearchRequest`] to an engine and brings the raw
//! reply back; [`ElasticContext`] wires translation, transport, and
//! materialization together.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use elq::mapping::Mapping;
use elq::plan::Plan;
use elq::request::formatter::{compile, WireSearchRequest};
use elq::response::materializers::Materialized;
use elq::response::types::SearchResponse;
use elq::translate;

/// Errors raised while executing a compiled request.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Translation(#[from] elq::Error),

    #[error("transport failed: {0}")]
    Transport(String),

    #[error("engine returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Synchronous transport for a compiled request.
pub trait Transport {
    fn send(&self, request: &WireSearchRequest) -> Result<Value>;
}

/// Asynchronous transport for a compiled request.
#[async_trait]
pub trait AsyncTransport {
    async fn send(&self, request: &WireSearchRequest) -> Result<Value>;
}

/// HTTP transport posting request bodies to the engine's search endpoint.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, request: &WireSearchRequest) -> String {
        let mut url = format!("{}{}", self.base_url, request.url_path());
        if let Some(search_type) = &request.search_type {
            url.push_str("?search_type=");
            url.push_str(search_type);
        }
        url
    }
}

#[async_trait]
impl AsyncTransport for HttpTransport {
    async fn send(&self, request: &WireSearchRequest) -> Result<Value> {
        let url = self.url(request);
        debug!(%url, "sending search request");

        let response = self
            .client
            .post(&url)
            .json(&request.body)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }
}

/// Binds a mapping and an index to plan execution.
pub struct ElasticContext<M: Mapping> {
    index: String,
    mapping: M,
}

impl<M: Mapping> ElasticContext<M> {
    pub fn new(index: impl Into<String>, mapping: M) -> Self {
        Self {
            index: index.into(),
            mapping,
        }
    }

    /// Compile a plan without executing it. Useful for request logging and
    /// dry runs.
    pub fn compile(&self, plan: &Plan) -> Result<WireSearchRequest> {
        let translation = translate(&self.mapping, plan)?;
        Ok(compile(&self.index, &translation.request))
    }

    /// Compile, send over a synchronous transport, and materialize.
    pub fn execute<T: Transport>(&self, transport: &T, plan: &Plan) -> Result<Materialized> {
        let translation = translate(&self.mapping, plan)?;
        let wire = compile(&self.index, &translation.request);
        let body = transport.send(&wire)?;
        let response: SearchResponse = serde_json::from_value(body)?;
        debug!(took = response.took, "materializing response");
        Ok(translation.materializer.materialize(&response)?)
    }

    /// Compile, send over an asynchronous transport, and materialize.
    pub async fn execute_async<T: AsyncTransport + Sync>(
        &self,
        transport: &T,
        plan: &Plan,
    ) -> Result<Materialized> {
        let translation = translate(&self.mapping, plan)?;
        let wire = compile(&self.index, &translation.request);
        let body = transport.send(&wire).await?;
        let response: SearchResponse = serde_json::from_value(body)?;
        debug!(took = response.took, "materializing response");
        Ok(translation.materializer.materialize(&response)?)
    }
}
