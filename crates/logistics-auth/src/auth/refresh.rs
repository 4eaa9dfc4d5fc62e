//! Background token refresh

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::controller::AuthSessionController;

/// Periodic refresh of the session token.
///
/// Holds the controller weakly so a dropped controller ends the task.
pub struct TokenRefreshTask {
    controller: Weak<AuthSessionController>,
    interval: Duration,
}

impl std::fmt::Debug for TokenRefreshTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefreshTask")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl TokenRefreshTask {
    #[must_use]
    pub const fn new(controller: Weak<AuthSessionController>, interval: Duration) -> Self {
        Self {
            controller,
            interval,
        }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> RefreshHandle {
        let token = shutdown.clone();
        let task = tokio::spawn(async move {
            // First tick one full interval after start
            let start = tokio::time::Instant::now() + self.interval;
            let mut ticker = tokio::time::interval_at(start, self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(controller) = self.controller.upgrade() else {
                            break;
                        };
                        controller.periodic_refresh().await;
                    }
                    () = token.cancelled() => {
                        tracing::debug!("Token refresh task shutting down");
                        break;
                    }
                }
            }
        });

        RefreshHandle { shutdown, task }
    }
}

/// Handle to a running refresh task
#[derive(Debug)]
pub struct RefreshHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.task.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
