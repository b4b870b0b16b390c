use std::sync::Arc;

use crate::core::error::EngineError;
use crate::core::hash::mint_id;
use crate::core::store::{insert_doc, list_docs, require_doc, update_with_retry, Mutation, RecordStore};
use crate::core::time::now_utc;
use crate::core::types::{
    Contact, Coordinate, DistressFilter, DistressSignal, DistressStatus, Principal,
};

/// Distress transitions go through a versioned compare-and-swap because
/// `dispatched_at` and `responded_at` are write-once.
pub struct DistressLifecycle {
    store: Arc<dyn RecordStore>,
    max_attempts: u32,
}

impl DistressLifecycle {
    pub fn new(store: Arc<dyn RecordStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts,
        }
    }

    /// Called once per confirmed panic press. A countdown cancelled on the
    /// client never reaches this call.
    pub fn create(
        &self,
        originator: &Principal,
        location: Option<Coordinate>,
        contact: Contact,
        label: Option<String>,
    ) -> Result<DistressSignal, EngineError> {
        let location = location.ok_or(EngineError::MissingLocation)?;
        let location_label = label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| location.label());

        let signal = DistressSignal {
            id: mint_id("sos"),
            originator_id: originator.id.clone(),
            contact,
            created_at: now_utc(),
            location,
            location_label,
            status: DistressStatus::Active,
            dispatched_at: None,
            responded_at: None,
        };
        insert_doc(self.store.as_ref(), &signal)?;
        tracing::info!(
            "distress signal {} raised by {} at {}",
            signal.id,
            signal.originator_id,
            signal.location_label
        );
        Ok(signal)
    }

    pub fn get(&self, id: &str) -> Result<DistressSignal, EngineError> {
        Ok(require_doc::<DistressSignal>(self.store.as_ref(), id)?.doc)
    }

    pub fn list(&self, filter: &DistressFilter) -> Result<Vec<DistressSignal>, EngineError> {
        let mut signals: Vec<DistressSignal> = list_docs::<DistressSignal>(self.store.as_ref(), None)?
            .into_iter()
            .filter(|s| filter.status.map_or(true, |st| st == s.status))
            .filter(|s| {
                filter
                    .originator_id
                    .as_deref()
                    .map_or(true, |o| o == s.originator_id)
            })
            .collect();
        signals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            signals.truncate(limit);
        }
        Ok(signals)
    }

    /// Advances a signal. The legality check runs against the status read in
    /// the same attempt as the write, so of two racing operators only one
    /// moves the signal; the other re-reads and gets `IllegalTransition`.
    pub fn transition(
        &self,
        id: &str,
        target: DistressStatus,
    ) -> Result<DistressSignal, EngineError> {
        let signal = update_with_retry::<DistressSignal, _, _>(
            self.store.as_ref(),
            id,
            self.max_attempts,
            |signal| {
                apply_transition(signal, target)?;
                Ok(Mutation::Write(signal.clone()))
            },
        )?;
        tracing::info!("distress signal {} status -> {}", id, target);
        Ok(signal)
    }
}

pub fn apply_transition(
    signal: &mut DistressSignal,
    target: DistressStatus,
) -> Result<(), EngineError> {
    if !signal.status.can_advance_to(target) {
        return Err(EngineError::IllegalTransition {
            from: signal.status,
            to: target,
        });
    }
    let now = now_utc();
    match target {
        DistressStatus::Dispatched => {
            signal.dispatched_at.get_or_insert(now);
        }
        DistressStatus::Responded => {
            signal.responded_at.get_or_insert(now);
        }
        DistressStatus::Active => {}
    }
    signal.status = target;
    Ok(())
}
