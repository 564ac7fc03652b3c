use super::*;
use anyhow::{anyhow, Result};

/// Validate the complete configuration
pub fn validate_config(config: &SweepConfig) -> Result<()> {
    if config.output_root.as_os_str().is_empty() {
        return Err(anyhow!("output_root cannot be empty"));
    }

    validate_tor_config(&config.tor)?;
    validate_measurement_config(&config.measurement)?;
    validate_latency_config(&config.latency)?;
    validate_retry_config(&config.retry)?;

    Ok(())
}

fn validate_tor_config(tor: &TorConfig) -> Result<()> {
    if tor.program.trim().is_empty() {
        return Err(anyhow!("tor.program cannot be empty"));
    }

    if tor.startup_timeout.is_zero() {
        return Err(anyhow!("tor.startup_timeout must be greater than 0"));
    }

    if tor.readiness_marker.is_empty() {
        return Err(anyhow!("tor.readiness_marker cannot be empty"));
    }

    for (name, port) in [
        ("socks_base_port", tor.socks_base_port),
        ("deaddrop_base_port", tor.deaddrop_base_port),
        ("onion_service_port", tor.onion_service_port),
    ] {
        if port == 0 {
            return Err(anyhow!("tor.{} must be between 1 and 65535, got: 0", name));
        }
    }

    if tor.socks_base_port == tor.deaddrop_base_port {
        return Err(anyhow!(
            "tor.socks_base_port and tor.deaddrop_base_port must differ, both are {}",
            tor.socks_base_port
        ));
    }

    Ok(())
}

fn validate_measurement_config(measurement: &MeasurementConfig) -> Result<()> {
    if measurement.program.trim().is_empty() {
        return Err(anyhow!("measurement.program cannot be empty"));
    }

    if measurement.timeout.is_zero() {
        return Err(anyhow!("measurement.timeout must be greater than 0"));
    }

    if measurement.deaddrop_port == 0 {
        return Err(anyhow!("measurement.deaddrop_port must be between 1 and 65535, got: 0"));
    }

    Ok(())
}

fn validate_latency_config(latency: &LatencyRunConfig) -> Result<()> {
    if latency.repetitions == 0 {
        return Err(anyhow!("latency.repetitions must be at least 1"));
    }

    if latency.max_acquisition_attempts == Some(0) {
        return Err(anyhow!("latency.max_acquisition_attempts must be at least 1 when set"));
    }

    Ok(())
}

fn validate_retry_config(retry: &RetryConfig) -> Result<()> {
    if retry.max_attempts == Some(0) {
        return Err(anyhow!("retry.max_attempts must be at least 1 when set"));
    }

    if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
        return Err(anyhow!(
            "retry.backoff_multiplier must be a finite number >= 1.0, got: {}",
            retry.backoff_multiplier
        ));
    }

    Ok(())
}
