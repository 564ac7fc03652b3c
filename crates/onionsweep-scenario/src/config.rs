//! Scenario configurations and their canonical identifiers.

use crate::mode::AccessMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three benchmark families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BenchmarkKind {
    PublishThroughput,
    RetrieveThroughput,
    Latency,
}

impl fmt::Display for BenchmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchmarkKind::PublishThroughput => write!(f, "publish-throughput"),
            BenchmarkKind::RetrieveThroughput => write!(f, "retrieve-throughput"),
            BenchmarkKind::Latency => write!(f, "latency"),
        }
    }
}

/// Publish throughput: `clients` concurrent publishers of `message_size`-byte
/// messages against one deaddrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublishConfig {
    pub clients: u32,
    pub message_size: u32,
}

impl PublishConfig {
    pub fn id(&self) -> String {
        format!("c{}_ms{}", self.clients, self.message_size)
    }
}

/// Retrieve throughput: `clients` concurrent readers, each fetching
/// `message_count` messages of `message_size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RetrieveConfig {
    pub clients: u32,
    pub message_count: u32,
    pub message_size: u32,
}

impl RetrieveConfig {
    pub fn id(&self) -> String {
        format!(
            "c{}_m{}_s{}",
            self.clients, self.message_count, self.message_size
        )
    }
}

/// End-to-end latency over the onion network with `deaddrops` published
/// deaddrop services.
///
/// `allowed_receivers` is 0 unless the mode restricts receivers, and
/// `allowed_senders` is 0 unless it restricts senders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LatencyConfig {
    pub mode: AccessMode,
    pub deaddrops: u32,
    pub allowed_receivers: u32,
    pub allowed_senders: u32,
    pub difficulty: u32,
}

impl LatencyConfig {
    pub fn id(&self) -> String {
        format!(
            "{}_dd{}_ar{}_as{}_d{}",
            self.mode, self.deaddrops, self.allowed_receivers, self.allowed_senders, self.difficulty
        )
    }
}

/// One scenario of any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ScenarioConfig {
    PublishThroughput(PublishConfig),
    RetrieveThroughput(RetrieveConfig),
    Latency(LatencyConfig),
}

impl ScenarioConfig {
    /// Canonical identifier, used as the output file stem.
    ///
    /// Ids are only unique within one kind; kinds write to separate
    /// directories.
    pub fn id(&self) -> String {
        match self {
            ScenarioConfig::PublishThroughput(config) => config.id(),
            ScenarioConfig::RetrieveThroughput(config) => config.id(),
            ScenarioConfig::Latency(config) => config.id(),
        }
    }

    pub fn kind(&self) -> BenchmarkKind {
        match self {
            ScenarioConfig::PublishThroughput(_) => BenchmarkKind::PublishThroughput,
            ScenarioConfig::RetrieveThroughput(_) => BenchmarkKind::RetrieveThroughput,
            ScenarioConfig::Latency(_) => BenchmarkKind::Latency,
        }
    }
}

impl fmt::Display for ScenarioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

impl From<PublishConfig> for ScenarioConfig {
    fn from(config: PublishConfig) -> Self {
        ScenarioConfig::PublishThroughput(config)
    }
}

impl From<RetrieveConfig> for ScenarioConfig {
    fn from(config: RetrieveConfig) -> Self {
        ScenarioConfig::RetrieveThroughput(config)
    }
}

impl From<LatencyConfig> for ScenarioConfig {
    fn from(config: LatencyConfig) -> Self {
        ScenarioConfig::Latency(config)
    }
}
