//! Parameter grids and the generators that enumerate them.

use crate::config::{LatencyConfig, PublishConfig, RetrieveConfig};
use crate::mode::AccessMode;

/// Message sizes shared by both throughput benchmarks: 128 B to 1 MiB.
pub const MESSAGE_SIZES: [u32; 5] = [128, 1024, 128 * 1024, 512 * 1024, 1024 * 1024];

pub const RETRIEVE_CLIENTS: [u32; 19] = [
    1, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 120, 140, 160, 180, 200, 400, 600, 800,
];
pub const RETRIEVE_MESSAGE_COUNTS: [u32; 4] = [1, 10, 100, 1000];

pub const LATENCY_DEADDROPS: [u32; 4] = [3, 5, 7, 9];
pub const LATENCY_ALLOWED_RECEIVERS: [u32; 8] = [1, 2, 4, 8, 16, 32, 64, 128];
pub const LATENCY_ALLOWED_SENDERS: [u32; 6] = [2, 4, 8, 16, 32, 64];
pub const LATENCY_DIFFICULTIES: [u32; 3] = [12, 16, 20];

/// Publisher counts: dense around 10-20 clients, then progressively coarser
/// up to 600.
pub fn publish_clients() -> Vec<u32> {
    let mut clients = vec![1, 5];
    clients.extend(10..=20);
    clients.extend((30..=100).step_by(10));
    clients.extend((120..=200).step_by(20));
    clients.extend((250..=600).step_by(50));
    clients
}

/// Publish sweep, message-size major.
pub fn generate_publish() -> Vec<PublishConfig> {
    let clients = publish_clients();
    MESSAGE_SIZES
        .iter()
        .flat_map(|&message_size| {
            clients.iter().map(move |&clients| PublishConfig {
                clients,
                message_size,
            })
        })
        .collect()
}

/// Retrieve sweep, message-size major, then message count.
pub fn generate_retrieve() -> Vec<RetrieveConfig> {
    let mut configs = Vec::new();
    for &message_size in &MESSAGE_SIZES {
        for &message_count in &RETRIEVE_MESSAGE_COUNTS {
            for &clients in &RETRIEVE_CLIENTS {
                configs.push(RetrieveConfig {
                    clients,
                    message_count,
                    message_size,
                });
            }
        }
    }
    configs
}

/// Latency sweep over every access mode.
///
/// Allow-list sizes only vary for the side a mode restricts; the other side
/// is pinned to a single 0 so equivalent scenarios are not repeated.
pub fn generate_latency() -> Vec<LatencyConfig> {
    let mut configs = Vec::new();
    for mode in AccessMode::ALL {
        let receivers: &[u32] = if mode.restricts_receivers() {
            &LATENCY_ALLOWED_RECEIVERS
        } else {
            &[0]
        };
        let senders: &[u32] = if mode.restricts_senders() {
            &LATENCY_ALLOWED_SENDERS
        } else {
            &[0]
        };

        for &deaddrops in &LATENCY_DEADDROPS {
            for &allowed_receivers in receivers {
                for &allowed_senders in senders {
                    for &difficulty in &LATENCY_DIFFICULTIES {
                        configs.push(LatencyConfig {
                            mode,
                            deaddrops,
                            allowed_receivers,
                            allowed_senders,
                            difficulty,
                        });
                    }
                }
            }
        }
    }
    configs
}
