//! Main application entry point for hotmark.

use crate::api::{self, ApiConfig};
use crate::core::{Config, Result};
use crate::engine::MonitorEngine;
use std::sync::Arc;
use std::time::Duration;

/// Coordinates the monitor engine, the report server and the optional
/// demo load generator.
pub struct Application {
    engine: Arc<MonitorEngine>,
    config: Config,
}

impl Application {
    /// Create a new Application with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        let engine = Arc::new(MonitorEngine::new(&config.registry)?);
        tracing::info!(
            workers = engine.workers(),
            capacity = config.registry.max_points,
            "monitor engine ready"
        );

        Ok(Self { engine, config })
    }

    /// Run until ctrl-c: report server in the background, demo load if
    /// enabled.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Starting hotmark");

        let demo_handle = if self.config.features.demo_points {
            let engine = Arc::clone(&self.engine);
            let interval = self.config.features.demo_interval;
            Some(tokio::spawn(demo_load(engine, interval)))
        } else {
            None
        };

        let server = tokio::spawn(api::start_server(
            Arc::clone(&self.engine),
            ApiConfig::from_config(&self.config),
        ));

        let result = tokio::select! {
            joined = server => match joined {
                Ok(server_result) => server_result,
                Err(e) => {
                    tracing::error!("report server task failed: {}", e);
                    Ok(())
                },
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                Ok(())
            },
        };

        if let Some(handle) = demo_handle {
            handle.abort();
        }
        result
    }

    /// Get a reference to the monitor engine.
    pub fn engine(&self) -> &Arc<MonitorEngine> {
        &self.engine
    }
}

/// Built-in load so a fresh install has something to report.
///
/// Registers three points and drives start/end pairs against two of them
/// on every tick. The third stays in-flight for the process lifetime,
/// demonstrating that an open interval contributes nothing until its end
/// arrives.
async fn demo_load(engine: Arc<MonitorEngine>, interval: Duration) {
    let fast = engine.add_point("demo_fast");
    let slow = engine.add_point("demo_slow");
    let lifetime = engine.add_point("demo_lifetime");
    let (Ok(fast), Ok(slow), Ok(lifetime)) = (fast, slow, lifetime) else {
        tracing::warn!("demo points could not be registered; demo load disabled");
        return;
    };

    engine.start(&lifetime);

    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        engine.start(&fast);
        std::hint::black_box(spin(100));
        engine.end(&fast);

        engine.start(&slow);
        std::hint::black_box(spin(2_000));
        engine.end(&slow);
    }
}

fn spin(iterations: u64) -> u64 {
    let mut acc = 0u64;
    for i in 0..iterations {
        acc = acc.wrapping_add(i ^ acc.rotate_left(7));
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RegistryConfig;

    #[tokio::test]
    async fn demo_load_registers_its_points() {
        let engine = Arc::new(
            MonitorEngine::new(&RegistryConfig {
                max_points: 16,
                buckets: 8,
                workers: 2,
                monitor_pid: 0,
            })
            .expect("engine"),
        );

        let task = tokio::spawn(demo_load(
            Arc::clone(&engine),
            Duration::from_millis(10),
        ));
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();

        assert_eq!(engine.live_points(), 3);
        let results = engine.snapshot().expect("snapshot");
        let fast = results
            .iter()
            .find(|r| r.name.as_str() == "demo_fast")
            .expect("demo_fast registered");
        assert!(fast.call_times >= 1);

        // The lifetime point stays in-flight and contributes nothing.
        let lifetime = results
            .iter()
            .find(|r| r.name.as_str() == "demo_lifetime")
            .expect("demo_lifetime registered");
        assert_eq!(lifetime.call_times, 0);
    }
}
