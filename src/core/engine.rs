use std::path::Path;
use std::sync::Arc;

use crate::{
    config::AppConfig,
    core::{
        error::EngineError,
        memory_store::MemoryStore,
        sqlite_store::SqliteStore,
        store::RecordStore,
        types::{
            Address, Author, Contact, Coordinate, DistressFilter, DistressSignal, DistressStatus,
            NewReport, Principal, Report, ReportFilter, ReportStatus, Tip, VoteDirection,
        },
    },
    ledger::TipLedger,
    lifecycle::{DistressLifecycle, ReportLifecycle},
};

/// Request/response surface over one record store. Every call is independent;
/// callers observe changes by reading again.
pub struct Engine {
    pub config: AppConfig,
    reports: ReportLifecycle,
    distress: DistressLifecycle,
    tips: TipLedger,
}

impl Engine {
    pub fn new(store: Arc<dyn RecordStore>, config: AppConfig) -> Self {
        let attempts = config.cas_max_attempts.clamp(1, 5);
        Self {
            reports: ReportLifecycle::new(store.clone()),
            distress: DistressLifecycle::new(store.clone(), attempts),
            tips: TipLedger::new(store, attempts),
            config,
        }
    }

    pub fn open(config: AppConfig) -> Result<Self, EngineError> {
        let store = SqliteStore::open(Path::new(&config.db_path))?;
        tracing::debug!("opened record store at {}", config.db_path);
        Ok(Self::new(Arc::new(store), config))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), AppConfig::default())
    }

    pub fn create_report(&self, input: NewReport) -> Result<String, EngineError> {
        Ok(self.reports.create(input)?.id)
    }

    pub fn get_report(&self, id: &str) -> Result<Report, EngineError> {
        self.reports.get(id)
    }

    pub fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>, EngineError> {
        self.reports.list(filter)
    }

    pub fn set_report_status(&self, id: &str, status: &str) -> Result<Report, EngineError> {
        let target: ReportStatus = status.parse()?;
        self.reports.set_status(id, target)
    }

    pub fn attach_address(&self, id: &str, address: Address) -> Result<Report, EngineError> {
        self.reports.attach_address(id, address)
    }

    pub fn create_distress_signal(
        &self,
        originator: &Principal,
        coordinate: Option<Coordinate>,
        contact: Contact,
        label: Option<String>,
    ) -> Result<String, EngineError> {
        Ok(self
            .distress
            .create(originator, coordinate, contact, label)?
            .id)
    }

    pub fn get_distress_signal(&self, id: &str) -> Result<DistressSignal, EngineError> {
        self.distress.get(id)
    }

    pub fn list_distress_signals(
        &self,
        filter: &DistressFilter,
    ) -> Result<Vec<DistressSignal>, EngineError> {
        self.distress.list(filter)
    }

    pub fn transition_distress(
        &self,
        id: &str,
        status: &str,
    ) -> Result<DistressSignal, EngineError> {
        let target: DistressStatus = status.parse()?;
        self.distress.transition(id, target)
    }

    pub fn add_tip(&self, report_id: &str, author: Author, text: &str) -> Result<String, EngineError> {
        Ok(self.tips.add_tip(report_id, author, text)?.id)
    }

    pub fn list_tips(&self, report_id: &str) -> Result<Vec<Tip>, EngineError> {
        self.tips.list_tips(report_id)
    }

    pub fn get_tip(&self, tip_id: &str) -> Result<Tip, EngineError> {
        self.tips.get_tip(tip_id)
    }

    /// `direction` must be +1 or -1; anything else is rejected before the tip is read.
    pub fn cast_vote(&self, tip_id: &str, voter_id: &str, direction: i64) -> Result<i64, EngineError> {
        let direction = VoteDirection::try_from(direction)?;
        self.tips.cast_vote(tip_id, voter_id, direction)
    }

    pub fn retract_vote(&self, tip_id: &str, voter_id: &str) -> Result<i64, EngineError> {
        self.tips.retract_vote(tip_id, voter_id)
    }
}
