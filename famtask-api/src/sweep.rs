/// Background join-request expiry sweeper
///
/// Join requests expire seven days after submission. This module owns the
/// periodic cleanup: a tokio task that deletes expired `pending`/`rejected`
/// rows once at startup and then on a fixed interval, sharing the API's
/// connection pool. The sweep only ever runs a single DELETE with a time
/// predicate, so it is idempotent and safe to run concurrently with
/// request handling (or a second instance of itself).
///
/// # Example
///
/// ```no_run
/// use famtask_api::sweep::ExpirySweeper;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) {
/// let sweeper = ExpirySweeper::new(pool);
/// let shutdown = sweeper.shutdown_token();
///
/// let handle = tokio::spawn(async move { sweeper.run().await });
///
/// // ... on shutdown:
/// shutdown.cancel();
/// # let _ = handle;
/// # }
/// ```

use famtask_shared::models::join_request::JoinRequest;
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Default sweep interval: hourly
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Periodic join-request expiry sweeper
pub struct ExpirySweeper {
    /// Shared database pool
    db: PgPool,

    /// Time between sweeps
    interval: Duration,

    /// Shutdown token
    shutdown_token: CancellationToken,
}

impl ExpirySweeper {
    /// Creates a sweeper with the default hourly interval
    pub fn new(db: PgPool) -> Self {
        Self::with_interval(db, DEFAULT_SWEEP_INTERVAL)
    }

    /// Creates a sweeper with a custom interval
    pub fn with_interval(db: PgPool, interval: Duration) -> Self {
        ExpirySweeper {
            db,
            interval,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Gets the shutdown token
    ///
    /// Used to signal graceful shutdown from external handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Gets the configured interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs the sweep loop until shutdown
    ///
    /// Sweeps immediately once, then on every interval tick. A failed sweep
    /// is logged and retried at the next tick; it never takes the loop
    /// down.
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper starting"
        );

        loop {
            self.sweep_once().await;

            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Expiry sweeper shut down");
                    break;
                }
            }
        }
    }

    /// Runs a single sweep, logging the outcome
    async fn sweep_once(&self) {
        match JoinRequest::cleanup_expired(&self.db).await {
            Ok(0) => {
                tracing::debug!("Expiry sweep found nothing to remove");
            }
            Ok(removed) => {
                tracing::info!(removed, "Expiry sweep removed expired join requests");
            }
            Err(e) => {
                tracing::error!(error = %e, "Expiry sweep failed, will retry next interval");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interval_is_hourly() {
        assert_eq!(DEFAULT_SWEEP_INTERVAL, Duration::from_secs(3600));
    }

    // The sweep itself (expired pending/rejected removed, approved kept)
    // is exercised by the integration tests
}
