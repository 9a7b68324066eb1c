//! HTTP health probe
//!
//! Polls a health endpoint on a fixed period and turns the noisy raw results
//! into debounced status transitions for its subscribers.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use shared::{component_debug, component_info, ClientIdentity, Component, ProbeKind, ProbeStatus};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::ProbeConfig;
use crate::core::StatusWindow;
use crate::error::{CheckFailure, CheckerResult};
use crate::services::http_client::{build_client, PROBE_ROLE};
use crate::services::notifier::Subscribers;
use crate::traits::Probe;

/// Probe issuing GET requests against a health endpoint
pub struct HttpProbe {
    inner: Arc<ProbeInner>,
}

struct ProbeInner {
    kind: ProbeKind,
    config: ProbeConfig,
    client: reqwest::Client,
    window: Mutex<StatusWindow>,
    subscribers: Subscribers<ProbeStatus>,
}

impl HttpProbe {
    /// Create a probe with a client bounded by the configured request timeout
    pub fn from_config(kind: ProbeKind, config: &ProbeConfig, identity: &ClientIdentity) -> CheckerResult<Self> {
        let client = build_client(identity, PROBE_ROLE, config.request_timeout)?;
        Ok(Self::new(kind, client, config))
    }

    /// Create a probe around an existing client
    pub fn new(kind: ProbeKind, client: reqwest::Client, config: &ProbeConfig) -> Self {
        Self {
            inner: Arc::new(ProbeInner {
                kind,
                config: config.clone(),
                client,
                window: Mutex::new(StatusWindow::new(config.success_threshold, config.failure_threshold)),
                subscribers: Subscribers::new(Component::Probe(kind)),
            }),
        }
    }

    pub fn kind(&self) -> ProbeKind {
        self.inner.kind
    }

    /// Stable status, `None` while still unknown
    pub fn status(&self) -> Option<ProbeStatus> {
        self.inner.window.lock().unwrap_or_else(PoisonError::into_inner).stable()
    }

    /// Perform a single check and fold it into the debounce window
    pub async fn check_once(&self) -> Option<ProbeStatus> {
        self.inner.check().await
    }
}

impl ProbeInner {
    fn component(&self) -> Component {
        Component::Probe(self.kind)
    }

    async fn check(&self) -> Option<ProbeStatus> {
        let result = match self.request().await {
            Ok(()) => ProbeStatus::Success,
            Err(failure) => {
                component_debug!(
                    self.component(),
                    failure_class = failure.class(),
                    "Check of {} failed: {}",
                    self.config.target,
                    failure
                );
                ProbeStatus::Failure
            }
        };

        self.push_status(result)
    }

    async fn request(&self) -> Result<(), CheckFailure> {
        let response = self
            .client
            .get(self.config.target.clone())
            .send()
            .await
            .map_err(CheckFailure::Transport)?;

        let status = response.status().as_u16();
        response.bytes().await.map_err(CheckFailure::Body)?;

        if !(200..400).contains(&status) {
            return Err(CheckFailure::BadStatus(status));
        }

        Ok(())
    }

    /// Serialized evaluation step: push, evaluate and broadcast under one lock
    fn push_status(&self, result: ProbeStatus) -> Option<ProbeStatus> {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        let transition = window.push(result);

        component_debug!(
            self.component(),
            "History: {:?}",
            window.history().collect::<Vec<_>>()
        );

        if let Some(next) = transition {
            component_info!(self.component(), "{} status changed to {}", self.kind, next);
            self.subscribers.broadcast(next);
        }

        transition
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn check(&self) -> CheckerResult<()> {
        self.inner.config.validate(self.inner.kind)
    }

    async fn run(&self, cancel: CancellationToken) {
        let inner = Arc::clone(&self.inner);

        tokio::select! {
            _ = cancel.cancelled() => {
                component_debug!(inner.component(), "Probe cancelled during initial delay");
                return;
            }
            _ = sleep(inner.config.initial_delay) => {}
        }

        let period = inner.config.period;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut checks = JoinSet::new();

        component_debug!(inner.component(), "Probing {} every {:?}", inner.config.target, period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let inner = Arc::clone(&inner);
                    checks.spawn(async move {
                        inner.check().await;
                    });
                }
            }

            // Reap finished checks so the set does not grow without bound
            while checks.try_join_next().is_some() {}
        }

        component_debug!(inner.component(), "Probe closed by cancellation");

        // In-flight checks are bounded by the request timeout
        while checks.join_next().await.is_some() {}
    }

    fn notify(&self, subscriber: mpsc::Sender<ProbeStatus>) {
        self.inner.subscribers.subscribe(subscriber);
    }
}
