use std::time::Duration;

use async_trait::async_trait;
use benor_common::{ConsensusMessage, NodeId};
use futures::future::join_all;
use tracing::debug;

use crate::error::P2pError;
use crate::ports::Transport;

/// Posts every message as JSON to `POST {peer}/message`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    id: NodeId,
    client: reqwest::Client,
    peers: Vec<(NodeId, String)>,
}

impl HttpTransport {
    /// `peers` maps node ids to base urls such as `http://127.0.0.1:3001`.
    /// An entry for `id` itself is ignored when broadcasting.
    pub fn new(id: NodeId, peers: Vec<(NodeId, String)>, timeout: Duration) -> Result<Self, P2pError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { id, client, peers })
    }

    pub async fn send_to(&self, base_url: &str, message: &ConsensusMessage) -> Result<(), P2pError> {
        let res = self
            .client
            .post(format!("{}/message", base_url.trim_end_matches('/')))
            .json(message)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(P2pError::Status { peer: base_url.to_string(), status: status.as_u16() });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn broadcast(&self, message: ConsensusMessage) {
        let sends = self
            .peers
            .iter()
            .filter(|(peer_id, _)| *peer_id != self.id)
            .map(|(peer_id, url)| async move { (peer_id, self.send_to(url, &message).await) });

        for (peer_id, result) in join_all(sends).await {
            if let Err(e) = result {
                debug!("[{}] delivery to {} failed: {}", self.id, peer_id, e);
            }
        }
    }
}
