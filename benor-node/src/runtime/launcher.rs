use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use benor_common::{BenOrError, NodeId, NodeStatus, Result, Value};
use benor_consensus::{ConsensusNode, NodeSetup};
use benor_p2p::{HttpTransport, InMemoryNetwork, ReadinessFlag};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{error, info, warn};

use crate::api::rest;
use crate::config::{Config, TransportKind};

/// Summary of a simulation as seen by an outside observer.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub nodes: usize,
    pub faulty: usize,
    pub exceeds_tolerance: bool,
    pub decided: usize,
    pub live: usize,
    /// Common decided value when every live node decided on the same one.
    pub agreed_value: Option<Value>,
    pub timed_out: bool,
    pub statuses: Vec<NodeStatus>,
}

impl Report {
    fn from_statuses(config: &Config, statuses: Vec<NodeStatus>, timed_out: bool) -> Self {
        let live: Vec<&NodeStatus> = statuses.iter().filter(|s| s.decided.is_some()).collect();
        let decided = live.iter().filter(|s| s.is_decided()).count();

        let agreed_value = match live.first() {
            Some(first) if decided == live.len() && live.iter().all(|s| s.x == first.x) => first.x,
            _ => None,
        };

        Self {
            nodes: config.protocol.nodes,
            faulty: config.protocol.faulty,
            exceeds_tolerance: config.protocol.exceeds_tolerance(),
            decided,
            live: live.len(),
            agreed_value,
            timed_out,
            statuses,
        }
    }

    /// Every live node decided and they all hold the same value.
    pub fn reached_agreement(&self) -> bool {
        self.agreed_value.is_some()
    }
}

/// Spins up every node of a simulation inside this process.
pub struct Launcher {
    config: Config,
    nodes: Vec<Arc<ConsensusNode>>,
    addresses: Vec<SocketAddr>,
    readiness: ReadinessFlag,
    tasks: Vec<JoinHandle<()>>,
}

impl Launcher {
    pub async fn launch(config: Config) -> Result<Self> {
        let setups = {
            let mut rng = rand::thread_rng();
            config.node_setups(&mut rng)?
        };

        let mut launcher = Launcher {
            config,
            nodes: Vec::with_capacity(setups.len()),
            addresses: Vec::new(),
            readiness: ReadinessFlag::new(),
            tasks: Vec::new(),
        };

        match launcher.config.transport {
            TransportKind::Memory => launcher.spawn_in_memory(setups),
            TransportKind::Http => launcher.spawn_http(setups).await?,
        }

        // Everybody is wired up: broadcasts may flow.
        launcher.readiness.mark_ready();
        info!(
            "🚀 {} nodes up ({} faulty, transport {:?})",
            launcher.nodes.len(),
            launcher.config.protocol.faulty,
            launcher.config.transport
        );

        Ok(launcher)
    }

    fn spawn_in_memory(&mut self, setups: Vec<NodeSetup>) {
        let mesh = InMemoryNetwork::mesh(setups.len(), self.config.channel_capacity);

        for (setup, (net, rx)) in setups.into_iter().zip(mesh) {
            let node = Arc::new(ConsensusNode::new(
                setup,
                self.config.protocol.clone(),
                Arc::new(net.clone()),
                Arc::new(self.readiness.clone()),
            ));

            let inbound: Weak<ConsensusNode> = Arc::downgrade(&node);
            net.set_message_handler(Box::new(move |msg| {
                if let Some(node) = inbound.upgrade() {
                    node.deliver(msg);
                }
            }));

            self.tasks.push(tokio::spawn(async move {
                net.run(rx).await;
            }));
            self.nodes.push(node);
        }
    }

    async fn spawn_http(&mut self, setups: Vec<NodeSetup>) -> Result<()> {
        let mut listeners = Vec::with_capacity(setups.len());

        // Bind first so every transport knows the real peer addresses.
        for i in 0..setups.len() {
            let port = if self.config.base_port == 0 {
                0
            } else {
                self.config.base_port + i as u16
            };
            let listener = TcpListener::bind((self.config.host.as_str(), port)).await?;
            self.addresses.push(listener.local_addr()?);
            listeners.push(listener);
        }

        let peers: Vec<(NodeId, String)> = self
            .addresses
            .iter()
            .enumerate()
            .map(|(i, addr)| (NodeId(i), format!("http://{}", addr)))
            .collect();

        for (setup, listener) in setups.into_iter().zip(listeners) {
            let transport = HttpTransport::new(setup.id, peers.clone(), self.config.request_timeout())
                .map_err(|e| BenOrError::Network(e.to_string()))?;

            let node = Arc::new(ConsensusNode::new(
                setup,
                self.config.protocol.clone(),
                Arc::new(transport),
                Arc::new(self.readiness.clone()),
            ));

            let server_node = Arc::clone(&node);
            self.tasks.push(tokio::spawn(async move {
                let id = server_node.id();
                if let Err(e) = rest::serve(listener, server_node).await {
                    error!("REST server for {} failed: {}", id, e);
                }
            }));
            self.nodes.push(node);
        }

        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn nodes(&self) -> &[Arc<ConsensusNode>] {
        &self.nodes
    }

    /// Bound REST addresses (http transport only).
    pub fn addresses(&self) -> &[SocketAddr] {
        &self.addresses
    }

    /// Starts every node; returns how many actually armed a driver.
    pub fn start_all(&self) -> usize {
        self.nodes.iter().filter(|n| n.start()).count()
    }

    pub fn stop_all(&self) {
        for node in &self.nodes {
            node.stop();
        }
    }

    pub fn statuses(&self) -> Vec<NodeStatus> {
        self.nodes.iter().map(|n| n.status()).collect()
    }

    /// Polls until every live node reports a decision or the configured
    /// timeout expires.
    pub async fn wait_for_decision(&self) -> Report {
        let deadline = Instant::now() + self.config.timeout();
        let mut tick = time::interval(self.config.poll_interval());

        loop {
            tick.tick().await;

            let statuses = self.statuses();
            let all_decided = statuses
                .iter()
                .filter(|s| s.decided.is_some())
                .all(|s| s.is_decided());

            if all_decided {
                return Report::from_statuses(&self.config, statuses, false);
            }

            if Instant::now() >= deadline {
                warn!("⏰ no global decision after {:?}", self.config.timeout());
                return Report::from_statuses(&self.config, statuses, true);
            }
        }
    }

    /// Kills every node and tears down the transport tasks.
    pub fn shutdown(self) {
        self.stop_all();
        for task in &self.tasks {
            task.abort();
        }
        info!("🔴 simulation shut down");
    }
}
