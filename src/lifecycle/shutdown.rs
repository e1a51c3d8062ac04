//! Shutdown coordination for the gateway.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::StartupError;

/// Coordinator for graceful shutdown.
///
/// Wraps the root cancellation token; every serving task holds a child of it.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    root: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token cancelled together with the root, and cancellable on its own.
    pub fn child(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// The root token itself, for signal listeners.
    pub fn token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.root.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Resolve once shutdown has been triggered.
    pub async fn triggered(&self) {
        self.root.cancelled().await
    }
}

/// Wait up to `grace` for a serving task to finish, aborting it after that.
///
/// Running out of grace is not an error; the task is simply cut off.
pub async fn drain(
    name: &'static str,
    mut task: JoinHandle<Result<(), StartupError>>,
    grace: Duration,
) -> Result<(), StartupError> {
    match tokio::time::timeout(grace, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(StartupError::Serve(format!("{} task failed: {}", name, e))),
        Err(_) => {
            tracing::warn!(task = name, grace_secs = grace.as_secs_f64(), "Drain deadline passed, aborting");
            task.abort();
            Ok(())
        }
    }
}
