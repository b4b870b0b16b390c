use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::error::EngineError;
use crate::sync::Snapshot;

pub type SnapshotRx<T> = watch::Receiver<Option<Arc<Snapshot<T>>>>;

/// Re-reads a collection on a fixed interval and publishes each snapshot.
/// A failed read keeps the previous snapshot in place.
pub struct Poller<T> {
    rx: SnapshotRx<T>,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl<T> Poller<T>
where
    T: Send + Sync + 'static,
{
    pub fn spawn<F>(name: &'static str, interval: Duration, fetch: F) -> Self
    where
        F: Fn() -> Result<Vec<T>, EngineError> + Send + Sync + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let (stop, mut stop_rx) = watch::channel(false);
        let fetch = Arc::new(fetch);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.changed() => break,
                }
                let fetch = fetch.clone();
                let polled = tokio::task::spawn_blocking(move || Snapshot::capture(|| (*fetch)())).await;
                match polled {
                    Ok(Ok(snapshot)) => {
                        tracing::trace!("{} poll: {} items", name, snapshot.items.len());
                        tx.send_replace(Some(Arc::new(snapshot)));
                    }
                    Ok(Err(err)) => tracing::warn!("{} poll failed: {}", name, err),
                    Err(err) => tracing::warn!("{} poll task aborted: {}", name, err),
                }
            }
            tracing::debug!("{} poller stopped", name);
        });

        Self { rx, stop, handle }
    }

    pub fn subscribe(&self) -> SnapshotRx<T> {
        self.rx.clone()
    }

    pub fn latest(&self) -> Option<Arc<Snapshot<T>>> {
        self.rx.borrow().clone()
    }

    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}
