//! Synthetic traffic generator
//!
//! A fixed pool of workers issues back-to-back requests against the target and
//! records every outcome in a shared [`SimulationReport`].

use std::sync::Arc;
use std::time::Duration;

use shared::{component_debug, component_info, ClientIdentity, Component};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use url::Url;

use crate::config::TrafficConfig;
use crate::core::SimulationReport;
use crate::error::{CheckerResult, TrafficError};
use crate::services::http_client::{build_client, TRAFFIC_ROLE};
use crate::traits::TrafficSimulator;

/// Traffic simulator issuing GET requests from `concurrency` workers
pub struct HttpTrafficSimulator {
    inner: Arc<TrafficInner>,
}

struct TrafficInner {
    target: Url,
    concurrency: usize,
    body_read_delay: Duration,
    client: reqwest::Client,
    report: Arc<SimulationReport>,
}

impl HttpTrafficSimulator {
    pub fn from_config(config: &TrafficConfig, identity: &ClientIdentity) -> CheckerResult<Self> {
        let client = build_client(identity, TRAFFIC_ROLE, config.request_timeout)?;
        Ok(Self::new(client, config))
    }

    pub fn new(client: reqwest::Client, config: &TrafficConfig) -> Self {
        Self {
            inner: Arc::new(TrafficInner {
                target: config.target.clone(),
                concurrency: config.request_concurrency,
                body_read_delay: config.body_read_delay,
                client,
                report: Arc::new(SimulationReport::new()),
            }),
        }
    }
}

impl TrafficInner {
    async fn worker(&self, id: usize, cancel: CancellationToken) {
        component_debug!(Component::Traffic, worker = id, "Worker started");

        while !cancel.is_cancelled() {
            self.perform_request().await;
        }

        component_debug!(Component::Traffic, worker = id, "Worker stopped");
    }

    async fn perform_request(&self) {
        let started = Instant::now();

        let response = match self.client.get(self.target.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                self.report
                    .record(0, started.elapsed(), Some(TrafficError::Transport(e.to_string())));
                return;
            }
        };

        let status_code = response.status().as_u16();

        // Holding the body keeps the connection busy while the server shuts down
        sleep(self.body_read_delay).await;

        let error = match response.bytes().await {
            Err(e) => Some(TrafficError::Body(e.to_string())),
            Ok(_) if !(200..400).contains(&status_code) => Some(TrafficError::BadStatus(status_code)),
            Ok(_) => None,
        };

        self.report.record(status_code, started.elapsed(), error);
    }
}

impl TrafficSimulator for HttpTrafficSimulator {
    fn simulate(&self, cancel: CancellationToken, tracker: &TaskTracker) {
        component_info!(
            Component::Traffic,
            "🚦 Starting {} workers against {}",
            self.inner.concurrency,
            self.inner.target
        );

        for id in 0..self.inner.concurrency {
            let inner = Arc::clone(&self.inner);
            let cancel = cancel.clone();
            tracker.spawn(async move { inner.worker(id, cancel).await });
        }
    }

    fn report(&self) -> Arc<SimulationReport> {
        Arc::clone(&self.inner.report)
    }
}
