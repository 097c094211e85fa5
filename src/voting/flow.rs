use std::collections::BTreeMap;

use crate::models::{Candidate, CandidateId, Election, Position, PositionId};

/// Where the wizard currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Deciding the position at this index (positions are in rank order).
    Position(usize),
    /// Every position has been visited; the ballot can be reviewed and cast.
    Review,
}

/// Client-side voting wizard: one screen per position, then a review screen.
///
/// The cursor is always within `0..=positions.len()`, where the last index is
/// the review step. A position with no entry in the selection map is an
/// abstention. Submission is not a state of this machine; it happens from
/// [`Step::Review`] and is followed by [`VoteFlow::reset`].
#[derive(Debug, Clone, Default)]
pub struct VoteFlow {
    election: Option<Election>,
    positions: Vec<Position>,
    candidates: Vec<Candidate>,
    cursor: usize,
    selections: BTreeMap<PositionId, CandidateId>,
}

impl VoteFlow {
    /// Starts a fresh session for `election`. Anything left over from a
    /// previous election is dropped.
    pub fn load_election(
        &mut self,
        election: Election,
        mut positions: Vec<Position>,
        candidates: Vec<Candidate>,
    ) {
        positions.sort_by_key(|p| p.rank);
        self.election = Some(election);
        self.positions = positions;
        self.candidates = candidates;
        self.cursor = 0;
        self.selections.clear();
    }

    /// Records `candidate_id` as the choice for `position_id`, replacing any
    /// earlier choice. Does not move the cursor.
    ///
    /// The caller guarantees that the candidate belongs to the position;
    /// `Booth::select` is the checked entry point.
    pub fn select_candidate(&mut self, position_id: PositionId, candidate_id: CandidateId) {
        self.selections.insert(position_id, candidate_id);
    }

    /// Abstains on the current position and moves on. No-op on the review step.
    pub fn skip_step(&mut self) {
        if let Some(position_id) = self.current_position().map(|p| p.id) {
            self.selections.remove(&position_id);
            self.cursor += 1;
        }
    }

    pub fn next_step(&mut self) {
        if self.cursor < self.positions.len() {
            self.cursor += 1;
        }
    }

    pub fn prev_step(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    /// Moves straight to `index`, as the review screen's "change" action does.
    /// Returns false and leaves the cursor alone when `index` is out of range.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index > self.positions.len() {
            return false;
        }
        self.cursor = index;
        true
    }

    pub fn reset(&mut self) {
        self.election = None;
        self.positions.clear();
        self.candidates.clear();
        self.cursor = 0;
        self.selections.clear();
    }

    pub fn is_loaded(&self) -> bool {
        self.election.is_some()
    }

    pub fn election(&self) -> Option<&Election> {
        self.election.as_ref()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn step(&self) -> Step {
        if self.cursor < self.positions.len() {
            Step::Position(self.cursor)
        } else {
            Step::Review
        }
    }

    pub fn current_position(&self) -> Option<&Position> {
        self.positions.get(self.cursor)
    }

    pub fn position(&self, position_id: PositionId) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == position_id)
    }

    /// Candidates standing for `position_id`, in the order the backend sent them.
    pub fn candidates_for(&self, position_id: PositionId) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(move |c| c.position == position_id)
    }

    pub fn selections(&self) -> &BTreeMap<PositionId, CandidateId> {
        &self.selections
    }

    pub fn selection_for(&self, position_id: PositionId) -> Option<&Candidate> {
        let candidate_id = self.selections.get(&position_id)?;
        self.candidates.iter().find(|c| c.id == *candidate_id)
    }

    /// Progress through the wizard counting the review step, capped at 100.
    pub fn progress_percent(&self) -> u8 {
        let total = self.positions.len() + 1;
        let percent = (self.cursor + 1) * 100 / total;
        percent.min(100) as u8
    }
}
