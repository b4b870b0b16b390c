//! How clients observe engine state: interval snapshots of a collection, or
//! a targeted single-record read after their own write. There is no push.

pub mod poller;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::PollConfig;
use crate::core::engine::Engine;
use crate::core::error::EngineError;
use crate::core::time::now_utc;
use crate::core::types::{DistressFilter, DistressSignal, Report, ReportFilter};

pub use poller::{Poller, SnapshotRx};

#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    /// Stamped before the read starts; every write completed earlier is included.
    pub taken_at: DateTime<Utc>,
    pub items: Vec<T>,
}

impl<T> Snapshot<T> {
    pub fn capture<F>(fetch: F) -> Result<Self, EngineError>
    where
        F: FnOnce() -> Result<Vec<T>, EngineError>,
    {
        let taken_at = now_utc();
        let items = fetch()?;
        Ok(Self { taken_at, items })
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.taken_at)
    }

    pub fn is_stale(&self, now: DateTime<Utc>, bound: Duration) -> bool {
        match chrono::Duration::from_std(bound) {
            Ok(bound) => self.age(now) > bound,
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub sos_interval: Duration,
    pub reports_interval: Duration,
    pub max_staleness: Duration,
}

impl From<&PollConfig> for PollSchedule {
    fn from(cfg: &PollConfig) -> Self {
        Self {
            sos_interval: Duration::from_secs(cfg.sos_interval_secs),
            reports_interval: Duration::from_secs(cfg.reports_interval_secs),
            max_staleness: Duration::from_secs(cfg.max_staleness_secs),
        }
    }
}

pub struct Coordinator {
    engine: Arc<Engine>,
    schedule: PollSchedule,
}

impl Coordinator {
    pub fn new(engine: Arc<Engine>) -> Self {
        let schedule = PollSchedule::from(&engine.config.poll);
        Self::with_schedule(engine, schedule)
    }

    pub fn with_schedule(engine: Arc<Engine>, schedule: PollSchedule) -> Self {
        Self { engine, schedule }
    }

    pub fn schedule(&self) -> &PollSchedule {
        &self.schedule
    }

    pub fn snapshot_distress(
        &self,
        filter: &DistressFilter,
    ) -> Result<Snapshot<DistressSignal>, EngineError> {
        Snapshot::capture(|| self.engine.list_distress_signals(filter))
    }

    pub fn snapshot_reports(&self, filter: &ReportFilter) -> Result<Snapshot<Report>, EngineError> {
        Snapshot::capture(|| self.engine.list_reports(filter))
    }

    /// Must be called from within a tokio runtime.
    pub fn watch_distress(&self, filter: DistressFilter) -> Poller<DistressSignal> {
        let engine = self.engine.clone();
        Poller::spawn("distress", self.schedule.sos_interval, move || {
            engine.list_distress_signals(&filter)
        })
    }

    /// Must be called from within a tokio runtime.
    pub fn watch_reports(&self, filter: ReportFilter) -> Poller<Report> {
        let engine = self.engine.clone();
        Poller::spawn("reports", self.schedule.reports_interval, move || {
            engine.list_reports(&filter)
        })
    }

    pub fn refresh_report(&self, id: &str) -> Result<Report, EngineError> {
        self.engine.get_report(id)
    }

    pub fn refresh_signal(&self, id: &str) -> Result<DistressSignal, EngineError> {
        self.engine.get_distress_signal(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staleness_is_measured_from_capture() {
        let snap = Snapshot::capture(|| Ok(vec![1, 2, 3])).unwrap();
        let later = snap.taken_at + chrono::Duration::seconds(31);
        assert!(!snap.is_stale(snap.taken_at, Duration::from_secs(30)));
        assert!(snap.is_stale(later, Duration::from_secs(30)));
        assert_eq!(snap.age(later).num_seconds(), 31);
    }

    #[test]
    fn failed_capture_propagates() {
        let res: Result<Snapshot<u8>, _> =
            Snapshot::capture(|| Err(EngineError::Unavailable("down".into())));
        assert!(matches!(res, Err(EngineError::Unavailable(_))));
    }
}
