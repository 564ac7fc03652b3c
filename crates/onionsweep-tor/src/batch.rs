//! Bringing up several daemon instances against one shared deadline.

use crate::discovery::ServiceDiscovery;
use crate::instance::{InstanceRequest, ServiceInstance, TorSettings};
use futures::future::try_join_all;
use onionsweep_common::Result;
use tokio::time::Instant;
use tracing::{info, warn};

/// Launch every request, then await all of them jointly.
///
/// The whole batch shares a single deadline of `settings.startup_timeout`,
/// so total startup latency does not grow with the batch size. The first
/// instance to fail ends the wait: every launched instance is closed and
/// that failure is returned. Instances are returned in request order.
pub async fn spawn_batch(
    settings: &TorSettings,
    requests: Vec<InstanceRequest>,
    discovery: &dyn ServiceDiscovery,
) -> Result<Vec<ServiceInstance>> {
    let deadline = Instant::now() + settings.startup_timeout;
    let count = requests.len();

    let mut instances = Vec::with_capacity(count);
    for request in requests {
        match ServiceInstance::launch(settings, request) {
            Ok(instance) => instances.push(instance),
            Err(e) => {
                close_all(&mut instances).await;
                return Err(e);
            }
        }
    }

    let outcome = try_join_all(
        instances
            .iter_mut()
            .map(|instance| instance.wait_ready(deadline, discovery)),
    )
    .await;

    if let Err(e) = outcome {
        warn!(instances = count, error = %e, "Instance batch failed, tearing down");
        close_all(&mut instances).await;
        return Err(e);
    }

    info!(instances = count, "All instances ready");
    Ok(instances)
}

/// Close every instance, logging failures instead of returning them.
pub async fn close_all(instances: &mut [ServiceInstance]) {
    for instance in instances.iter_mut() {
        if let Err(e) = instance.close().await {
            warn!(instance = %instance.name(), error = %e, "Failed to close instance");
        }
    }
}
