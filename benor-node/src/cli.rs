use std::path::PathBuf;

use benor_common::Result;
use clap::Parser;

use crate::config::{Config, TransportKind};

/// Runs a simulated binary consensus cluster and reports what every node decided.
#[derive(Debug, Parser)]
#[command(name = "benor-node", version)]
pub struct Args {
    /// JSON config file; flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of nodes (N).
    #[arg(short = 'n', long)]
    pub nodes: Option<usize>,

    /// Number of faulty nodes (F).
    #[arg(short = 'f', long)]
    pub faulty: Option<usize>,

    /// Comma separated initial values, e.g. `0,1,1`.
    #[arg(long, value_delimiter = ',')]
    pub values: Option<Vec<u8>>,

    /// Comma separated indices of faulty nodes.
    #[arg(long, value_delimiter = ',')]
    pub faulty_nodes: Option<Vec<usize>>,

    #[arg(long, value_enum)]
    pub transport: Option<TransportKind>,

    #[arg(long)]
    pub base_port: Option<u16>,

    /// Settling interval between phases, in milliseconds.
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Give up waiting for a decision after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Write the effective config to this path before running.
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// Suffix of the consensus audit log (`logs/audit-<name>.log`).
    #[arg(long, default_value = "sim")]
    pub run_name: String,
}

impl Args {
    /// Loads the config file (if any) and applies the flag overrides.
    pub fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_file(path)?,
            None => Config::default(),
        };

        if let Some(n) = self.nodes {
            config.protocol.nodes = n;
        }
        if let Some(f) = self.faulty {
            config.protocol.faulty = f;
        }
        if let Some(values) = &self.values {
            config.initial_values = Some(values.clone());
        }
        if let Some(faulty_nodes) = &self.faulty_nodes {
            config.faulty_nodes = Some(faulty_nodes.clone());
            if self.faulty.is_none() {
                config.protocol.faulty = faulty_nodes.len();
            }
        }
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(port) = self.base_port {
            config.base_port = port;
        }
        if let Some(ms) = self.settle_ms {
            config.protocol.settle_interval_ms = ms;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "benor-node", "-n", "4", "--values", "0,1,1,0", "--faulty-nodes", "3", "--transport", "http",
        ]);
        let config = args.to_config().unwrap();

        assert_eq!(config.protocol.nodes, 4);
        assert_eq!(config.protocol.faulty, 1);
        assert_eq!(config.initial_values, Some(vec![0, 1, 1, 0]));
        assert_eq!(config.transport, TransportKind::Http);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = Args::parse_from(["benor-node", "-n", "2", "--values", "0,1,1"]);
        assert!(args.to_config().is_err());
    }
}
