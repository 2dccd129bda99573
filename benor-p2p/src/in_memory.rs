use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use benor_common::{ConsensusMessage, NodeId};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, warn};

use crate::error::P2pError;
use crate::ports::Transport;

pub type MessageHandler = Box<dyn Fn(ConsensusMessage) + Send + Sync>;

/// Channel-backed transport for running several nodes inside one process.
#[derive(Clone)]
pub struct InMemoryNetwork {
    pub id: NodeId,
    peers: Arc<Mutex<HashMap<NodeId, Sender<ConsensusMessage>>>>,
    message_handler: Arc<Mutex<Option<MessageHandler>>>,
    broadcasts: Arc<AtomicUsize>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryNetwork {
    pub fn new(id: NodeId, capacity: usize) -> (Self, Sender<ConsensusMessage>, Receiver<ConsensusMessage>) {
        let (tx, rx) = mpsc::channel(capacity);

        (Self {
            id,
            peers: Arc::new(Mutex::new(HashMap::new())),
            message_handler: Arc::new(Mutex::new(None)),
            broadcasts: Arc::new(AtomicUsize::new(0)),
        }, tx, rx)
    }

    /// Builds `n` fully connected networks. Entry `i` belongs to `NodeId(i)`.
    pub fn mesh(n: usize, capacity: usize) -> Vec<(Self, Receiver<ConsensusMessage>)> {
        let nodes: Vec<_> = (0..n)
            .map(|i| InMemoryNetwork::new(NodeId(i), capacity))
            .collect();

        for (net, _, _) in &nodes {
            for (other, tx, _) in &nodes {
                if other.id != net.id {
                    net.add_peer(other.id, tx.clone());
                }
            }
        }

        nodes.into_iter().map(|(net, _, rx)| (net, rx)).collect()
    }

    pub fn add_peer(&self, peer_id: NodeId, sender: Sender<ConsensusMessage>) {
        lock(&self.peers).insert(peer_id, sender);
    }

    /// Forgets a peer; later broadcasts silently skip it.
    pub fn remove_peer(&self, peer_id: &NodeId) -> bool {
        lock(&self.peers).remove(peer_id).is_some()
    }

    pub fn connected_peers(&self) -> Vec<NodeId> {
        let mut peers: Vec<NodeId> = lock(&self.peers).keys().copied().collect();
        peers.sort();
        peers
    }

    /// Number of broadcasts issued through this handle.
    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.load(Ordering::Relaxed)
    }

    pub fn set_message_handler(&self, handler: MessageHandler) {
        *lock(&self.message_handler) = Some(handler);
    }

    pub async fn send_to(&self, peer: NodeId, message: ConsensusMessage) -> Result<(), P2pError> {
        let sender = lock(&self.peers).get(&peer).cloned();

        match sender {
            Some(sender) => sender
                .send(message)
                .await
                .map_err(|_| P2pError::Send(peer.to_string())),
            None => Err(P2pError::PeerNotFound(peer.to_string())),
        }
    }

    /// Pumps inbound messages into the registered handler until every sender is gone.
    pub async fn run(&self, mut rx: Receiver<ConsensusMessage>) {
        while let Some(msg) = rx.recv().await {
            let handler = lock(&self.message_handler);
            match handler.as_ref() {
                Some(h) => h(msg),
                None => warn!("[{}] no message handler set, dropping {:?}", self.id, msg),
            }
        }
        debug!("[{}] inbound channel closed", self.id);
    }
}

#[async_trait]
impl Transport for InMemoryNetwork {
    async fn broadcast(&self, message: ConsensusMessage) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);

        let peers: Vec<(NodeId, Sender<ConsensusMessage>)> = lock(&self.peers)
            .iter()
            .filter(|(peer_id, _)| **peer_id != self.id)
            .map(|(peer_id, tx)| (*peer_id, tx.clone()))
            .collect();

        for (peer_id, sender) in peers {
            if sender.send(message).await.is_err() {
                debug!("[{}] delivery to {} failed, dropping", self.id, peer_id);
            }
        }
    }
}
