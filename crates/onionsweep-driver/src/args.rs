//! Argument lists for the measurement binary.
//!
//! The subcommand spellings (`publish-troughput`, `retreive-troughput`) are
//! the binary's own and must not be corrected.

use crate::config::ThroughputConfig;
use onionsweep_common::ServiceEndpoint;
use onionsweep_scenario::{LatencyConfig, PublishConfig, RetrieveConfig};
use std::path::Path;

/// Small builder for flag/value argument lists.
#[derive(Debug, Default)]
struct ArgList(Vec<String>);

impl ArgList {
    fn words(mut self, words: &[&str]) -> Self {
        self.0.extend(words.iter().map(|w| w.to_string()));
        self
    }

    fn flag(mut self, name: &str, value: impl ToString) -> Self {
        self.0.push(name.to_string());
        self.0.push(value.to_string());
        self
    }

    fn finish(self) -> Vec<String> {
        self.0
    }
}

/// `deaddrop --mode open --difficulty <d> --acceptance-window <w> --address <listen>`
pub fn deaddrop_args(difficulty: u32, acceptance_window: u64, listen: &str) -> Vec<String> {
    ArgList::default()
        .words(&["deaddrop"])
        .flag("--mode", "open")
        .flag("--difficulty", difficulty)
        .flag("--acceptance-window", acceptance_window)
        .flag("--address", listen)
        .finish()
}

pub fn publish_args(
    config: &PublishConfig,
    throughput: &ThroughputConfig,
    output: &Path,
    deaddrop: &str,
) -> Vec<String> {
    ArgList::default()
        .words(&["benchmark", "publish-troughput"])
        .flag("--clients", config.clients)
        .flag("--runtime", throughput.runtime_secs)
        .flag("--difficulty", throughput.difficulty)
        .flag("--message-size", config.message_size)
        .flag("--prepared-messages", throughput.prepared_messages)
        .flag("--acceptance-window", throughput.publish_acceptance_window)
        .flag("--output", output.display())
        .flag("--deaddrop-address", deaddrop)
        .finish()
}

pub fn retrieve_args(
    config: &RetrieveConfig,
    throughput: &ThroughputConfig,
    output: &Path,
    deaddrop: &str,
) -> Vec<String> {
    ArgList::default()
        .words(&["benchmark", "retreive-troughput"])
        .flag("--clients", config.clients)
        .flag("--runtime", throughput.runtime_secs)
        .flag("--difficulty", throughput.difficulty)
        .flag("--message-size", config.message_size)
        .flag("--message-count", config.message_count)
        .flag("--acceptance-window", throughput.retrieve_acceptance_window)
        .flag("--output", output.display())
        .flag("--deaddrop-address", deaddrop)
        .finish()
}

/// Latency arguments. Each deaddrop contributes its loopback listen address
/// and its onion address, in instance order.
pub fn latency_args(
    config: &LatencyConfig,
    deaddrops: &[&ServiceEndpoint],
    client_proxy: &str,
    acceptance_window: u64,
    output: &Path,
) -> Vec<String> {
    let mut args = ArgList::default()
        .words(&["benchmark", "latency"])
        .flag("--deaddrops", config.deaddrops);
    for endpoint in deaddrops {
        args = args
            .flag("--deaddrop-listen-address", endpoint.local_listen_address())
            .flag("--deaddrop-onion-address", &endpoint.address);
    }
    args.flag("--client-tor-proxy", client_proxy)
        .flag("--allowed-receivers", config.allowed_receivers)
        .flag("--allowed-senders", config.allowed_senders)
        .flag("--difficulty", config.difficulty)
        .flag("--mode", config.mode)
        .flag("--acceptance-window", acceptance_window)
        .flag("--output", output.display())
        .finish()
}
