//! HTTP transport to a remote `roulette-oracle`
//!
//! Posts each [`ProcessMessage`] to the oracle's `/message` route and hands the
//! reply envelope back to the provider. Anything that keeps a usable reply from
//! arriving (refused connections, non-2xx statuses, dropped bodies) is reported
//! as [`ServiceError::Unavailable`], so the provider falls back or fails closed.

use crate::errors::{ConfigurationError, ServiceError};
use crate::games::provider::RandomnessService;
use crate::games::types::ProcessMessage;
use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{header, Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use tracing::debug;

pub struct HttpRandomnessService {
    endpoint: Uri,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HttpRandomnessService {
    /// Client for the oracle at `base_url`, e.g. `http://127.0.0.1:8787`
    pub fn new(base_url: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidValue {
            field: "provider.oracle_url".to_string(),
            value: base_url.to_string(),
            reason,
        };

        if !base_url.starts_with("http://") {
            return Err(invalid("Oracle URL must start with http://".to_string()));
        }
        let endpoint = format!("{}/message", base_url.trim_end_matches('/'))
            .parse::<Uri>()
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            endpoint,
            client: Client::builder(TokioExecutor::new()).build_http(),
        })
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }
}

#[async_trait]
impl RandomnessService for HttpRandomnessService {
    async fn send(&self, message: &ProcessMessage) -> Result<Value, ServiceError> {
        let body = serde_json::to_vec(message)
            .map_err(|e| ServiceError::MalformedMessage(e.to_string()))?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| ServiceError::MalformedMessage(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ServiceError::Unavailable(format!("{}: {}", self.endpoint, e)))?;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ServiceError::Unavailable(format!("{}: {}", self.endpoint, e)))?
            .to_bytes();

        debug!("{} answered {} ({} bytes)", self.endpoint, status, bytes.len());
        if !status.is_success() {
            return Err(ServiceError::Unavailable(format!(
                "{} answered {}: {}",
                self.endpoint,
                status,
                String::from_utf8_lossy(&bytes)
            )));
        }

        serde_json::from_slice(&bytes).map_err(|e| ServiceError::MalformedReply(e.to_string()))
    }
}
