use std::{collections::HashSet, fs, path::Path, time::Duration};

use benor_common::{BenOrError, NodeId, Result, Value};
use benor_consensus::{NodeSetup, ProtocolConfig};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How nodes of one simulation reach each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// tokio channels inside this process.
    #[default]
    Memory,
    /// One REST listener per node on localhost.
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub protocol: ProtocolConfig,

    /// Explicit starting value (0/1) per node. Random when absent.
    pub initial_values: Option<Vec<u8>>,

    /// Indices of faulty nodes. Defaults to the first `protocol.faulty`.
    pub faulty_nodes: Option<Vec<usize>>,

    pub transport: TransportKind,
    pub host: String,
    /// First node listens on `base_port`, node `i` on `base_port + i`.
    /// `0` picks ephemeral ports.
    pub base_port: u16,

    pub channel_capacity: usize,
    pub request_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol: ProtocolConfig::default(),
            initial_values: None,
            faulty_nodes: None,
            transport: TransportKind::Memory,
            host: "127.0.0.1".to_string(),
            base_port: 3000,
            channel_capacity: 1024,
            request_timeout_ms: 1000,
            poll_interval_ms: 100,
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.protocol.nodes;

        if n == 0 {
            return Err(BenOrError::Config("at least one node is required".into()));
        }
        if self.protocol.faulty > n {
            return Err(BenOrError::Config(format!(
                "{} faulty nodes requested but only {} nodes exist",
                self.protocol.faulty, n
            )));
        }

        if self.channel_capacity == 0 {
            return Err(BenOrError::Config("channel_capacity must be greater than zero".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(BenOrError::Config("poll_interval_ms must be greater than zero".into()));
        }
        if self.protocol.readiness_poll_ms == 0 {
            return Err(BenOrError::Config("readiness_poll_ms must be greater than zero".into()));
        }

        if let Some(values) = &self.initial_values {
            if values.len() != n {
                return Err(BenOrError::Config(format!(
                    "expected {} initial values, got {}",
                    n,
                    values.len()
                )));
            }
            for v in values {
                Value::try_from(*v).map_err(BenOrError::Config)?;
            }
        }

        if let Some(faulty) = &self.faulty_nodes {
            if faulty.len() != self.protocol.faulty {
                return Err(BenOrError::Config(format!(
                    "faulty_nodes lists {} entries but faulty = {}",
                    faulty.len(),
                    self.protocol.faulty
                )));
            }
            let unique: HashSet<_> = faulty.iter().collect();
            if unique.len() != faulty.len() {
                return Err(BenOrError::Config("faulty_nodes contains duplicates".into()));
            }
            if let Some(bad) = faulty.iter().find(|i| **i >= n) {
                return Err(BenOrError::Config(format!("faulty node index {} out of range", bad)));
            }
        }

        if self.transport == TransportKind::Http && self.base_port != 0 {
            let last = self.base_port as usize + n - 1;
            if last > u16::MAX as usize {
                return Err(BenOrError::Config(format!("port range {}..={} overflows", self.base_port, last)));
            }
        }

        Ok(())
    }

    /// Resolves every node's id, starting value and faulty flag.
    pub fn node_setups<R: Rng>(&self, rng: &mut R) -> Result<Vec<NodeSetup>> {
        self.validate()?;

        let n = self.protocol.nodes;
        let faulty: HashSet<usize> = match &self.faulty_nodes {
            Some(list) => list.iter().copied().collect(),
            None => (0..self.protocol.faulty).collect(),
        };

        let mut setups = Vec::with_capacity(n);
        for i in 0..n {
            let initial_value = match &self.initial_values {
                Some(values) => Value::try_from(values[i]).map_err(BenOrError::Config)?,
                None => {
                    if rng.gen_bool(0.5) {
                        Value::One
                    } else {
                        Value::Zero
                    }
                }
            };

            setups.push(NodeSetup {
                id: NodeId(i),
                initial_value,
                faulty: faulty.contains(&i),
            });
        }

        Ok(setups)
    }
}
