use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::core::time::window_start;
use crate::core::types::{Category, Report};

#[derive(Debug, Clone, Serialize)]
pub struct HeatPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub category: Category,
    pub region: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapView {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub category: Option<Category>,
    pub points: Vec<HeatPoint>,
    pub distinct_regions: usize,
}

/// Reports without a coordinate cannot be plotted and are skipped.
pub fn heatmap(
    reports: &[Report],
    category: Option<Category>,
    range: Duration,
    now: DateTime<Utc>,
) -> HeatmapView {
    let window_start = window_start(now, range);
    let points: Vec<HeatPoint> = reports
        .iter()
        .filter(|r| category.map_or(true, |c| c == r.category))
        .filter(|r| r.created_at >= window_start)
        .filter_map(|r| {
            r.location.map(|loc| HeatPoint {
                latitude: loc.latitude,
                longitude: loc.longitude,
                category: r.category,
                region: r.region().to_string(),
                created_at: r.created_at,
            })
        })
        .collect();
    let distinct_regions = points
        .iter()
        .map(|p| p.region.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    HeatmapView {
        window_start,
        window_end: now,
        category,
        points,
        distinct_regions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Address, Author, Coordinate, ReportStatus};

    fn report(category: Category, region: Option<&str>, age_days: i64, located: bool) -> Report {
        Report {
            id: format!("rpt_{}_{}", category, age_days),
            category,
            description: "x".into(),
            reporter: Author::Anonymous,
            created_at: Utc::now() - Duration::days(age_days),
            location: located.then(|| Coordinate::new(23.81, 90.41).unwrap()),
            address: region.map(|r| Address {
                region: Some(r.into()),
                ..Default::default()
            }),
            status: ReportStatus::Pending,
            media_urls: vec![],
            diary: None,
            suspects: vec![],
            victims: vec![],
            updated_at: None,
        }
    }

    #[test]
    fn filters_by_window_category_and_location() {
        let reports = vec![
            report(Category::Robbery, Some("Mirpur"), 1, true),
            report(Category::Robbery, None, 2, true),
            report(Category::Robbery, Some("Mirpur"), 3, false),
            report(Category::Theft, Some("Banani"), 1, true),
            report(Category::Robbery, Some("Uttara"), 40, true),
        ];
        let now = Utc::now();
        let view = heatmap(&reports, Some(Category::Robbery), Duration::days(7), now);
        assert_eq!(view.points.len(), 2);
        assert_eq!(view.distinct_regions, 2);
        assert!(view.points.iter().any(|p| p.region == "Unknown"));

        let all = heatmap(&reports, None, Duration::days(90), now);
        assert_eq!(all.points.len(), 4);
        assert_eq!(all.distinct_regions, 4);
    }

    #[test]
    fn longest_range_at_earliest_instant_does_not_overflow() {
        let reports = vec![report(Category::Fraud, Some("Dhanmondi"), 1, true)];
        let range = crate::core::time::parse_range("100y").unwrap();
        let view = heatmap(&reports, None, range, DateTime::<Utc>::MIN_UTC);
        assert_eq!(view.window_start, DateTime::<Utc>::MIN_UTC);
        assert_eq!(view.points.len(), 1);
    }
}
