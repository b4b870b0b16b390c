//! Vote arithmetic on a single tip. The tally and the voter map always move
//! together, so `tally == sum(votes)` holds before and after every call.

use crate::core::types::{Tip, VoteDirection};

/// Records `direction` for `voter`. Returns the tally delta, or `None` when the
/// voter already holds that direction (re-voting is a no-op, not a toggle).
pub fn apply_vote(tip: &mut Tip, voter: &str, direction: VoteDirection) -> Option<i64> {
    let prev = tip.vote_of(voter);
    let next = direction.value();
    if prev == next {
        return None;
    }
    let delta = next - prev;
    tip.tally += delta;
    tip.votes.insert(voter.to_string(), next);
    Some(delta)
}

/// Removes the voter's entry. `None` when there was nothing to retract.
pub fn retract_vote(tip: &mut Tip, voter: &str) -> Option<i64> {
    let prev = tip.votes.remove(voter)?;
    tip.tally -= prev;
    Some(-prev)
}
