//! Community tips and their vote ledger.

pub mod tally;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::error::EngineError;
use crate::core::hash::mint_id;
use crate::core::store::{
    insert_doc, list_docs, load_doc, require_doc, update_with_retry, Collection, Mutation,
    RecordStore,
};
use crate::core::time::now_utc;
use crate::core::types::{Author, Report, Tip, VoteDirection};

pub struct TipLedger {
    store: Arc<dyn RecordStore>,
    max_attempts: u32,
}

impl TipLedger {
    pub fn new(store: Arc<dyn RecordStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts,
        }
    }

    pub fn add_tip(&self, report_id: &str, author: Author, text: &str) -> Result<Tip, EngineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::invalid("tip text is empty"));
        }
        self.ensure_report(report_id)?;

        let tip = Tip {
            id: mint_id("tip"),
            report_id: report_id.to_string(),
            text: text.to_string(),
            author,
            created_at: now_utc(),
            tally: 0,
            votes: BTreeMap::new(),
        };
        insert_doc(self.store.as_ref(), &tip)?;
        tracing::info!("tip {} added to report {}", tip.id, report_id);
        Ok(tip)
    }

    /// Newest first.
    pub fn list_tips(&self, report_id: &str) -> Result<Vec<Tip>, EngineError> {
        self.ensure_report(report_id)?;
        let mut tips = list_docs::<Tip>(self.store.as_ref(), Some(report_id))?;
        tips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tips)
    }

    pub fn get_tip(&self, tip_id: &str) -> Result<Tip, EngineError> {
        Ok(require_doc::<Tip>(self.store.as_ref(), tip_id)?.doc)
    }

    /// Returns the tally after the vote. Re-casting the same direction
    /// succeeds without touching the record.
    pub fn cast_vote(
        &self,
        tip_id: &str,
        voter_id: &str,
        direction: VoteDirection,
    ) -> Result<i64, EngineError> {
        let voter = non_blank_voter(voter_id)?;
        let tally = update_with_retry::<Tip, _, _>(
            self.store.as_ref(),
            tip_id,
            self.max_attempts,
            |tip| match tally::apply_vote(tip, voter, direction) {
                Some(_) => Ok(Mutation::Write(tip.tally)),
                None => Ok(Mutation::Unchanged(tip.tally)),
            },
        )?;
        tracing::info!(
            "vote {:+} on tip {} by {} (tally {})",
            direction.value(),
            tip_id,
            voter,
            tally
        );
        Ok(tally)
    }

    pub fn retract_vote(&self, tip_id: &str, voter_id: &str) -> Result<i64, EngineError> {
        let voter = non_blank_voter(voter_id)?;
        let tally = update_with_retry::<Tip, _, _>(
            self.store.as_ref(),
            tip_id,
            self.max_attempts,
            |tip| match tally::retract_vote(tip, voter) {
                Some(_) => Ok(Mutation::Write(tip.tally)),
                None => Ok(Mutation::Unchanged(tip.tally)),
            },
        )?;
        tracing::info!("vote retracted on tip {} by {} (tally {})", tip_id, voter, tally);
        Ok(tally)
    }

    fn ensure_report(&self, report_id: &str) -> Result<(), EngineError> {
        match load_doc::<Report>(self.store.as_ref(), report_id)? {
            Some(_) => Ok(()),
            None => Err(EngineError::not_found(Collection::Reports, report_id)),
        }
    }
}

fn non_blank_voter(voter_id: &str) -> Result<&str, EngineError> {
    let voter = voter_id.trim();
    if voter.is_empty() {
        return Err(EngineError::invalid("voter id is empty"));
    }
    Ok(voter)
}
