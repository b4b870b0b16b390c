use std::sync::Arc;

use serde_json::{Map, Value};

use crate::core::error::EngineError;
use crate::core::hash::mint_id;
use crate::core::store::{insert_doc, list_docs, patch_doc, require_doc, RecordStore};
use crate::core::time::now_utc;
use crate::core::types::{Address, NewReport, Report, ReportFilter, ReportStatus};

/// Report status is last-writer-wins: two operators editing the same report
/// both succeed and the later write is what readers see. No locking here.
pub struct ReportLifecycle {
    store: Arc<dyn RecordStore>,
}

impl ReportLifecycle {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn create(&self, input: NewReport) -> Result<Report, EngineError> {
        let description = input.description.trim();
        if description.is_empty() {
            return Err(EngineError::invalid("report description is empty"));
        }
        let media_urls: Vec<String> = input
            .media_urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();

        let report = Report {
            id: mint_id("rpt"),
            category: input.category,
            description: description.to_string(),
            reporter: input.reporter,
            created_at: now_utc(),
            location: input.location,
            address: None,
            status: ReportStatus::Pending,
            media_urls,
            diary: input.diary,
            suspects: Vec::new(),
            victims: Vec::new(),
            updated_at: None,
        };
        insert_doc(self.store.as_ref(), &report)?;
        tracing::info!(
            "report {} created ({}, by {})",
            report.id,
            report.category,
            report.reporter.display_name()
        );
        Ok(report)
    }

    pub fn get(&self, id: &str) -> Result<Report, EngineError> {
        Ok(require_doc::<Report>(self.store.as_ref(), id)?.doc)
    }

    pub fn list(&self, filter: &ReportFilter) -> Result<Vec<Report>, EngineError> {
        let mut reports: Vec<Report> = list_docs::<Report>(self.store.as_ref(), None)?
            .into_iter()
            .filter(|r| matches_filter(filter, r))
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            reports.truncate(limit);
        }
        Ok(reports)
    }

    pub fn set_status(&self, id: &str, target: ReportStatus) -> Result<Report, EngineError> {
        let mut fields = Map::new();
        fields.insert("status".into(), serde_json::to_value(target)?);
        fields.insert("updated_at".into(), serde_json::to_value(now_utc())?);
        let report = patch_doc::<Report>(self.store.as_ref(), id, &fields)?;
        tracing::info!("report {} status -> {}", id, target);
        Ok(report)
    }

    pub fn attach_address(&self, id: &str, address: Address) -> Result<Report, EngineError> {
        let mut fields = Map::new();
        fields.insert("address".into(), serde_json::to_value(&address)?);
        fields.insert("updated_at".into(), serde_json::to_value(now_utc())?);
        let report = patch_doc::<Report>(self.store.as_ref(), id, &fields)?;
        tracing::info!("report {} address attached ({})", id, report.location_label());
        Ok(report)
    }
}

pub fn matches_filter(filter: &ReportFilter, report: &Report) -> bool {
    if filter.status.is_some_and(|s| s != report.status) {
        return false;
    }
    if filter.category.is_some_and(|c| c != report.category) {
        return false;
    }
    if let Some(reporter) = &filter.reporter_id {
        if report.reporter.id() != Some(reporter.as_str()) {
            return false;
        }
    }
    if filter.since.is_some_and(|since| report.created_at < since) {
        return false;
    }
    if let Some(term) = &filter.search {
        let needle = term.trim().to_lowercase();
        if !needle.is_empty() {
            let hay = [
                report.id.as_str(),
                report.category.as_str(),
                report.location_label(),
                report.description.as_str(),
            ];
            if !hay.iter().any(|h| h.to_lowercase().contains(&needle)) {
                return false;
            }
        }
    }
    true
}
