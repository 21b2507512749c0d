use crate::updater::Updater;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

impl Updater {
    /// Run an update now, then every `interval`, until `cancel` fires.
    ///
    /// Failed attempts are logged and retried on the next tick. Cancelling
    /// also aborts an attempt that is in progress.
    pub fn spawn_periodic(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(?interval, "Scheduled database updates");
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {},
                }
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = self.update(None) => match result {
                        Ok(outcome) => tracing::debug!(%outcome, "Scheduled update finished"),
                        Err(err) => tracing::error!(error = ?err, "Scheduled update failed"),
                    },
                }
            }
            tracing::info!("Stopped scheduled database updates");
        })
    }
}
