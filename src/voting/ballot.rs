use crate::error::{Error, Result};
use crate::models::{Candidate, CandidateId, NewVote, Position, PositionId};
use crate::voting::flow::VoteFlow;

/// One row of the review screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewLine<'a> {
    pub step: usize,
    pub position: &'a Position,
    /// `None` means the voter abstained.
    pub choice: Option<&'a Candidate>,
}

pub fn review_lines(flow: &VoteFlow) -> Vec<ReviewLine<'_>> {
    flow.positions()
        .iter()
        .enumerate()
        .map(|(step, position)| ReviewLine {
            step,
            position,
            choice: flow.selection_for(position.id),
        })
        .collect()
}

/// Wire records for the ballot: one per position that was not abstained,
/// in rank order.
pub fn ballot_votes(flow: &VoteFlow) -> Vec<NewVote> {
    flow.positions()
        .iter()
        .filter_map(|position| {
            flow.selections()
                .get(&position.id)
                .map(|candidate| NewVote {
                    position: position.id,
                    candidate: *candidate,
                })
        })
        .collect()
}

/// Checks that `candidate_id` stands for `position_id` in the loaded election.
pub fn validate_selection(
    flow: &VoteFlow,
    position_id: PositionId,
    candidate_id: CandidateId,
) -> Result<()> {
    if flow.position(position_id).is_none() {
        return Err(Error::validation(
            "position",
            format!("Position {position_id} is not part of this election."),
        ));
    }
    if !flow.candidates_for(position_id).any(|c| c.id == candidate_id) {
        return Err(Error::validation(
            "candidate",
            "The selected candidate does not belong to this position.",
        ));
    }
    Ok(())
}
