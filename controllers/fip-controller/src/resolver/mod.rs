//! Resolution steps of a reconciliation cycle.
//!
//! Each resolver turns one value into the next by fetching a fresh
//! inventory snapshot and scanning it:
//! - `NodeAddressResolver`: node name -> node address (Kubernetes)
//! - `ServerResolver`: address -> server (Hetzner Cloud)
//! - `FloatingIpResolver`: configured address -> floating IP (Hetzner Cloud)
//!
//! The scans are plain functions over slices so they can be tested without
//! any client at all.

mod floating_ip;
mod node;
mod server;

pub use floating_ip::FloatingIpResolver;
pub use node::NodeAddressResolver;
pub use server::ServerResolver;

use crate::error::ControllerError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// First item in listing order that satisfies `predicate`.
pub fn find_first<'a, T, P>(items: &'a [T], predicate: P) -> Option<&'a T>
where
    P: Fn(&T) -> bool,
{
    items.iter().find(|item| predicate(*item))
}

/// Run an external call bounded by `timeout` and interrupted by `cancel`.
///
/// Cancellation wins over a result that is ready at the same time.
pub(crate) async fn guarded<T, F>(
    cancel: &CancellationToken,
    timeout: Duration,
    operation: &str,
    call: F,
) -> Result<T, ControllerError>
where
    F: Future<Output = Result<T, ControllerError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ControllerError::Cancelled),
        result = tokio::time::timeout(timeout, call) => match result {
            Ok(result) => result,
            Err(_) => Err(ControllerError::Timeout {
                operation: operation.to_string(),
                timeout,
            }),
        },
    }
}
