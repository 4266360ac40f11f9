//! Main controller implementation.
//!
//! The `Controller` drives the reconciler on a fixed poll interval until the
//! cancellation token fires or the error policy gives up. There are two
//! states: reconciling (entered immediately at start) and idle (sleeping
//! until the next cycle).

use crate::backoff::FibonacciBackoff;
use crate::config::{ControllerConfig, ErrorPolicyKind};
use crate::error::{ControllerError, ErrorKind};
use crate::inventory::{KubeNodeInventory, NodeInventory};
use crate::reconciler::Reconciler;
use hcloud_client::{HcloudClient, HcloudClientTrait};
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What the loop does after a failed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Stop and surface the error
    Terminate,
    /// Start the next cycle after the delay instead of the poll interval
    RetryAfter(Duration),
}

/// Decides whether a failed cycle ends the controller.
pub trait ErrorPolicy: Send + Sync {
    /// Called after a failed cycle with the error that ended it.
    fn on_error(&mut self, error: &ControllerError) -> ErrorAction;

    /// Called after every successful cycle.
    fn on_success(&mut self) {}
}

/// Every error is fatal.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailFast;

impl ErrorPolicy for FailFast {
    fn on_error(&mut self, _error: &ControllerError) -> ErrorAction {
        ErrorAction::Terminate
    }
}

/// Transport errors are retried with Fibonacci backoff, everything else is fatal.
#[derive(Debug, Clone)]
pub struct RetryTransient {
    backoff: FibonacciBackoff,
}

impl RetryTransient {
    /// Creates a policy whose retry delays grow from `min` to `max`.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min, max),
        }
    }
}

impl ErrorPolicy for RetryTransient {
    fn on_error(&mut self, error: &ControllerError) -> ErrorAction {
        match error.kind() {
            ErrorKind::Transport => ErrorAction::RetryAfter(self.backoff.next_backoff()),
            ErrorKind::NotFound | ErrorKind::Config | ErrorKind::Cancelled => ErrorAction::Terminate,
        }
    }

    fn on_success(&mut self) {
        self.backoff.reset();
    }
}

/// Build the error policy selected in the configuration.
pub fn error_policy(config: &ControllerConfig) -> Box<dyn ErrorPolicy> {
    match config.error_policy {
        ErrorPolicyKind::Fail => Box::new(FailFast),
        ErrorPolicyKind::Retry => Box::new(RetryTransient::new(config.retry_min, config.retry_max)),
    }
}

/// Floating IP controller: one reconciler on a poll loop.
pub struct Controller {
    reconciler: Reconciler,
    policy: Box<dyn ErrorPolicy>,
    poll_interval: Duration,
}

impl Controller {
    /// Creates a new controller talking to the cluster and the Hetzner Cloud API.
    pub async fn new(config: &ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Floating IP Controller");

        let kube_client = Client::try_default().await?;

        let hcloud_client = HcloudClient::new(
            config.hcloud_endpoint.clone(),
            config.hcloud_token.clone(),
            config.request_timeout,
        )?;

        // Validate token and connectivity before proceeding
        info!("Validating Hetzner Cloud token and connectivity...");
        hcloud_client.validate_token().await.map_err(|e| {
            error!("Failed to validate Hetzner Cloud token: {}", e);
            error!("Please ensure:");
            error!("  1. HCLOUD_TOKEN is set to a read/write API token of the project");
            error!("  2. The Hetzner Cloud API is reachable at {}", config.hcloud_endpoint);
            ControllerError::Hcloud(e)
        })?;
        info!("Hetzner Cloud token validated and connectivity established");

        Ok(Self::with_clients(
            Arc::new(KubeNodeInventory::new(kube_client)),
            Arc::new(hcloud_client),
            config,
        ))
    }

    /// Creates a controller over already-built clients.
    pub fn with_clients(
        node_inventory: Arc<dyn NodeInventory>,
        hcloud_client: Arc<dyn HcloudClientTrait>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(node_inventory, hcloud_client, config),
            policy: error_policy(config),
            poll_interval: config.poll_interval,
        }
    }

    /// Runs the loop until `cancel` fires (`Ok`) or the policy terminates (`Err`).
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ControllerError> {
        info!(
            "Starting reconciliation loop (poll interval {}s)",
            self.poll_interval.as_secs()
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let delay = match self.reconciler.reconcile(&cancel).await {
                Ok(outcome) => {
                    debug!("Cycle finished: {:?}", outcome);
                    self.policy.on_success();
                    self.poll_interval
                }
                Err(ControllerError::Cancelled) => break,
                Err(e) => match self.policy.on_error(&e) {
                    ErrorAction::Terminate => return Err(e),
                    ErrorAction::RetryAfter(delay) => {
                        warn!("Reconciliation failed, retrying in {}s: {}", delay.as_secs(), e);
                        delay
                    }
                },
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        info!("Floating IP Controller stopped");
        Ok(())
    }
}
