mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{new_report, raise};
use nightwatch::core::engine::Engine;
use nightwatch::core::types::{DistressFilter, DistressStatus, ReportFilter};
use nightwatch::sync::{Coordinator, PollSchedule};

fn fast_schedule() -> PollSchedule {
    PollSchedule {
        sos_interval: Duration::from_millis(20),
        reports_interval: Duration::from_millis(20),
        max_staleness: Duration::from_millis(200),
    }
}

#[tokio::test]
async fn poller_picks_up_writes_made_after_it_started() {
    let engine = Arc::new(Engine::in_memory());
    let coordinator = Coordinator::with_schedule(engine.clone(), fast_schedule());
    let poller = coordinator.watch_distress(DistressFilter {
        status: Some(DistressStatus::Active),
        ..Default::default()
    });
    let mut rx = poller.subscribe();

    rx.changed().await.unwrap();
    let first = rx.borrow_and_update().clone().unwrap();
    assert!(first.items.is_empty());

    let id = raise(&engine, "alice");
    let seen = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            rx.changed().await.unwrap();
            let snap = rx.borrow_and_update().clone().unwrap();
            if snap.items.iter().any(|s| s.id == id) {
                break snap;
            }
        }
    })
    .await
    .expect("signal should show up within a few polls");
    assert!(seen.taken_at >= first.taken_at);

    // a dispatched signal drops out of the active view
    engine.transition_distress(&id, "Dispatched").unwrap();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            rx.changed().await.unwrap();
            let snap = rx.borrow_and_update().clone().unwrap();
            if snap.items.is_empty() {
                break;
            }
        }
    })
    .await
    .expect("dispatched signal should leave the active view");

    poller.shutdown().await;
}

#[tokio::test]
async fn report_poller_publishes_latest_snapshot() {
    let engine = Arc::new(Engine::in_memory());
    engine.create_report(new_report("alice")).unwrap();
    let coordinator = Coordinator::with_schedule(engine.clone(), fast_schedule());
    let poller = coordinator.watch_reports(ReportFilter::default());

    let mut rx = poller.subscribe();
    rx.changed().await.unwrap();
    let latest = poller.latest().expect("first poll published");
    assert_eq!(latest.items.len(), 1);
    assert!(!latest.is_stale(latest.taken_at, fast_schedule().max_staleness));

    poller.shutdown().await;
}

#[test]
fn targeted_refresh_sees_own_write() {
    let engine = Arc::new(Engine::in_memory());
    let coordinator = Coordinator::with_schedule(engine.clone(), fast_schedule());
    let id = engine.create_report(new_report("alice")).unwrap();
    engine.set_report_status(&id, "Investigating").unwrap();
    let report = coordinator.refresh_report(&id).unwrap();
    assert_eq!(report.status.as_str(), "Investigating");

    let snap = coordinator
        .snapshot_reports(&ReportFilter::default())
        .unwrap();
    assert_eq!(snap.items.len(), 1);
}

#[test]
fn targeted_signal_refresh_follows_transitions() {
    let engine = Arc::new(Engine::in_memory());
    let coordinator = Coordinator::with_schedule(engine.clone(), fast_schedule());
    let id = raise(&engine, "alice");

    let active = coordinator
        .snapshot_distress(&DistressFilter {
            status: Some(DistressStatus::Active),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(active.items.len(), 1);

    engine.transition_distress(&id, "Responded").unwrap();
    let signal = coordinator.refresh_signal(&id).unwrap();
    assert_eq!(signal.status, DistressStatus::Responded);
    assert!(signal.status.is_terminal());

    let still_active = coordinator
        .snapshot_distress(&DistressFilter {
            status: Some(DistressStatus::Active),
            ..Default::default()
        })
        .unwrap();
    assert!(still_active.items.is_empty());
    assert!(still_active.taken_at >= active.taken_at);
}
