//! Read-only aggregations over collection snapshots.

pub mod heatmap;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DashboardConfig;
use crate::core::types::{Category, DistressSignal, DistressStatus, Report, ReportStatus};

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub generated_at: DateTime<Utc>,
    pub total_reports: u64,
    pub pending: u64,
    pub investigating: u64,
    pub resolved: u64,
    pub active_signals: u64,
    pub dispatched_signals: u64,
    pub responded_signals: u64,
    pub by_category: BTreeMap<Category, u64>,
    pub recent_reports: Vec<Report>,
    pub active_alerts: Vec<DistressSignal>,
}

pub fn dashboard_summary(
    reports: &[Report],
    signals: &[DistressSignal],
    cfg: &DashboardConfig,
    now: DateTime<Utc>,
) -> DashboardSummary {
    let count_reports = |st: ReportStatus| reports.iter().filter(|r| r.status == st).count() as u64;
    let count_signals =
        |st: DistressStatus| signals.iter().filter(|s| s.status == st).count() as u64;

    let mut recent: Vec<Report> = reports.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(cfg.recent_reports);

    let mut active: Vec<DistressSignal> = signals
        .iter()
        .filter(|s| s.status == DistressStatus::Active)
        .cloned()
        .collect();
    active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    active.truncate(cfg.active_alerts);

    DashboardSummary {
        generated_at: now,
        total_reports: reports.len() as u64,
        pending: count_reports(ReportStatus::Pending),
        investigating: count_reports(ReportStatus::Investigating),
        resolved: count_reports(ReportStatus::Resolved),
        active_signals: count_signals(DistressStatus::Active),
        dispatched_signals: count_signals(DistressStatus::Dispatched),
        responded_signals: count_signals(DistressStatus::Responded),
        by_category: category_counts(reports),
        recent_reports: recent,
        active_alerts: active,
    }
}

pub fn category_counts(reports: &[Report]) -> BTreeMap<Category, u64> {
    let mut counts = BTreeMap::new();
    for report in reports {
        *counts.entry(report.category).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Author, Contact, Coordinate};
    use chrono::Duration;

    fn report(id: &str, category: Category, status: ReportStatus, age_min: i64) -> Report {
        Report {
            id: id.into(),
            category,
            description: "x".into(),
            reporter: Author::Anonymous,
            created_at: Utc::now() - Duration::minutes(age_min),
            location: None,
            address: None,
            status,
            media_urls: vec![],
            diary: None,
            suspects: vec![],
            victims: vec![],
            updated_at: None,
        }
    }

    fn signal(id: &str, status: DistressStatus, age_min: i64) -> DistressSignal {
        DistressSignal {
            id: id.into(),
            originator_id: "u".into(),
            contact: Contact::snapshot(None, None, None),
            created_at: Utc::now() - Duration::minutes(age_min),
            location: Coordinate::new(0.0, 0.0).unwrap(),
            location_label: "here".into(),
            status,
            dispatched_at: None,
            responded_at: None,
        }
    }

    #[test]
    fn summary_counts_and_trims() {
        let reports = vec![
            report("a", Category::Theft, ReportStatus::Pending, 30),
            report("b", Category::Theft, ReportStatus::Resolved, 10),
            report("c", Category::Fraud, ReportStatus::Investigating, 20),
        ];
        let signals = vec![
            signal("s1", DistressStatus::Active, 9),
            signal("s2", DistressStatus::Active, 1),
            signal("s3", DistressStatus::Active, 5),
            signal("s4", DistressStatus::Dispatched, 2),
        ];
        let cfg = DashboardConfig {
            recent_reports: 2,
            active_alerts: 2,
        };
        let s = dashboard_summary(&reports, &signals, &cfg, Utc::now());
        assert_eq!(s.total_reports, 3);
        assert_eq!((s.pending, s.investigating, s.resolved), (1, 1, 1));
        assert_eq!(s.active_signals, 3);
        assert_eq!(s.dispatched_signals, 1);
        let recent: Vec<&str> = s.recent_reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(recent, vec!["b", "c"]);
        let alerts: Vec<&str> = s.active_alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(alerts, vec!["s2", "s3"]);
    }

    #[test]
    fn counts_by_category() {
        let reports = vec![
            report("a", Category::Theft, ReportStatus::Pending, 1),
            report("b", Category::Theft, ReportStatus::Pending, 1),
            report("c", Category::Other, ReportStatus::Pending, 1),
        ];
        let counts = category_counts(&reports);
        assert_eq!(counts.get(&Category::Theft), Some(&2));
        assert_eq!(counts.get(&Category::Other), Some(&1));
        assert_eq!(counts.get(&Category::Fraud), None);
    }
}
