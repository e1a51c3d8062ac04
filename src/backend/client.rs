//! Network client: the default backend connector.
//!
//! Talks to the organization's peer gateway over JSON/HTTP:
//!
//! ```text
//! GET  <peer>/healthz                        health check on connect
//! POST <peer>/channels/<channel>/query       evaluate
//! POST <peer>/channels/<channel>/invoke      submit
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::backend::network::{EntityMatchers, NetworkProfile, PeerEndpoint};
use crate::backend::{BackendError, BackendSettings, Connector, Session, Transaction, TxOutcome};

/// Deadline for a transaction that does not carry its own.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Connector that resolves a peer from the network profile and opens an
/// HTTP session to it.
#[derive(Debug, Default)]
pub struct NetworkClient {
    settings: Option<BackendSettings>,
    endpoint: Option<PeerEndpoint>,
}

impl NetworkClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Peer chosen by the last successful `configure`.
    pub fn endpoint(&self) -> Option<&PeerEndpoint> {
        self.endpoint.as_ref()
    }
}

#[async_trait]
impl Connector for NetworkClient {
    fn configure(&mut self, settings: &BackendSettings) -> Result<(), BackendError> {
        if let Some(current) = &self.settings {
            if current == settings {
                return Ok(());
            }
            return Err(BackendError::Config(
                "network client is already configured with different settings".to_string(),
            ));
        }

        let profile = NetworkProfile::load(&settings.network_config)?;
        let matchers = EntityMatchers::load(Path::new(&settings.pattern))?;
        let endpoint = profile.resolve(&settings.channel, &settings.org, &settings.user, &matchers)?;

        tracing::info!(
            profile = %profile.name,
            peer = %endpoint.name,
            url = %endpoint.url,
            matchers = matchers.len(),
            "Backend network configured"
        );

        self.settings = Some(settings.clone());
        self.endpoint = Some(endpoint);
        Ok(())
    }

    async fn connect(&self) -> Result<Arc<dyn Session>, BackendError> {
        let (settings, endpoint) = match (&self.settings, &self.endpoint) {
            (Some(s), Some(e)) => (s, e),
            _ => return Err(BackendError::Config("connect called before configure".to_string())),
        };

        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let base = with_trailing_slash(endpoint.url.clone());
        let health_url = base
            .join("healthz")
            .map_err(|e| BackendError::Config(e.to_string()))?;

        let response = http
            .get(health_url)
            .timeout(settings.connect_timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, settings.connect_timeout))?;
        if !response.status().is_success() {
            return Err(BackendError::Unavailable(format!(
                "peer {} answered health check with {}",
                endpoint.name,
                response.status()
            )));
        }

        tracing::info!(peer = %endpoint.name, user = %settings.user, "Backend session established");

        Ok(Arc::new(PeerSession {
            http,
            base,
            channel: settings.channel.clone(),
            org: settings.org.clone(),
            user: settings.user.clone(),
            msp_id: endpoint.msp_id.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Open session against one peer.
#[derive(Debug)]
pub struct PeerSession {
    http: reqwest::Client,
    base: Url,
    channel: String,
    org: String,
    user: String,
    msp_id: String,
    closed: AtomicBool,
}

#[derive(Debug, Serialize)]
struct PeerRequest<'a> {
    user: &'a str,
    org: &'a str,
    msp_id: &'a str,
    chaincode_id: &'a str,
    function: &'a str,
    args: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    transient: Option<&'a serde_json::Value>,
    endorsers: &'a [String],
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PeerReply {
    value: String,
    txn_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PeerFault {
    message: String,
}

impl PeerSession {
    async fn submit(&self, kind: &str, tx: Transaction) -> Result<TxOutcome, BackendError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BackendError::Closed);
        }

        let url = self
            .base
            .join(&format!("channels/{}/{}", self.channel, kind))
            .map_err(|e| BackendError::InvalidRequest(e.to_string()))?;
        let deadline = tx.timeout_ms.map(Duration::from_millis).unwrap_or(DEFAULT_CALL_TIMEOUT);

        let body = PeerRequest {
            user: &self.user,
            org: &self.org,
            msp_id: &self.msp_id,
            chaincode_id: &tx.chaincode_id,
            function: &tx.function,
            args: &tx.args,
            transient: tx.transient.as_ref(),
            endorsers: &tx.endorsers,
        };

        tracing::debug!(%url, chaincode = %tx.chaincode_id, function = %tx.function, "Submitting to peer");

        let response = self
            .http
            .post(url)
            .timeout(deadline)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, deadline))?;

        let status = response.status();
        if status.is_success() {
            let reply: PeerReply = response
                .json()
                .await
                .map_err(|e| BackendError::Transport(format!("undecodable peer reply: {}", e)))?;
            return Ok(TxOutcome {
                value: reply.value,
                txn_id: reply.txn_id,
            });
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<PeerFault>(&text)
            .ok()
            .map(|f| f.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(text);
        Err(map_peer_status(status, message))
    }
}

#[async_trait]
impl Session for PeerSession {
    async fn query(&self, tx: Transaction) -> Result<TxOutcome, BackendError> {
        self.submit("query", tx).await
    }

    async fn invoke(&self, tx: Transaction) -> Result<TxOutcome, BackendError> {
        self.submit("invoke", tx).await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn map_reqwest_error(err: reqwest::Error, deadline: Duration) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(deadline.as_millis() as u64)
    } else if err.is_connect() {
        BackendError::Unavailable(err.to_string())
    } else {
        BackendError::Transport(err.to_string())
    }
}

fn map_peer_status(status: StatusCode, message: String) -> BackendError {
    match status {
        StatusCode::BAD_REQUEST => BackendError::InvalidRequest(message),
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        StatusCode::FORBIDDEN | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            BackendError::Rejected(message)
        }
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => BackendError::Unavailable(message),
        StatusCode::GATEWAY_TIMEOUT => BackendError::Unavailable(format!("peer timed out: {}", message)),
        other => BackendError::Transport(format!("peer answered {}: {}", other, message)),
    }
}
