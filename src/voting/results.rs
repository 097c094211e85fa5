use std::cmp::Reverse;

use crate::models::{Candidate, CandidateId, Election, Position};

/// How a position was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(CandidateId),
    /// The two highest totals are equal.
    Tie,
    /// Nobody stood for the position. Not a tie.
    NoCandidates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTally {
    pub candidate: Candidate,
    pub votes: i64,
    /// Share of the position's votes, 0.0 when the position has none.
    pub share: f64,
    pub is_winner: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionTally {
    pub position: Position,
    /// Candidates in the order the backend listed them.
    pub candidates: Vec<CandidateTally>,
    pub outcome: Outcome,
}

impl PositionTally {
    pub fn winner(&self) -> Option<&Candidate> {
        match self.outcome {
            Outcome::Winner(id) => self
                .candidates
                .iter()
                .map(|t| &t.candidate)
                .find(|c| c.id == id),
            Outcome::Tie | Outcome::NoCandidates => None,
        }
    }

    pub fn is_tie(&self) -> bool {
        self.outcome == Outcome::Tie
    }
}

/// Only the first place matters: if the top two totals match there is no
/// winner, whatever happens further down.
pub fn decide(candidates: &[&Candidate]) -> Outcome {
    let mut ranked: Vec<&Candidate> = candidates.to_vec();
    // Stable, so equal totals keep their listing order.
    ranked.sort_by_key(|c| Reverse(c.total_votes));

    match ranked.as_slice() {
        [] => Outcome::NoCandidates,
        [first, second, ..] if first.total_votes == second.total_votes => Outcome::Tie,
        [first, ..] => Outcome::Winner(first.id),
    }
}

/// Groups candidates under their positions, positions in ascending rank.
pub fn tally(positions: &[Position], candidates: &[Candidate]) -> Vec<PositionTally> {
    let mut ordered: Vec<&Position> = positions.iter().collect();
    ordered.sort_by_key(|p| p.rank);

    ordered
        .into_iter()
        .map(|position| {
            let standing: Vec<&Candidate> = candidates
                .iter()
                .filter(|c| c.position == position.id)
                .collect();
            let outcome = decide(&standing);
            let total: i64 = standing.iter().map(|c| c.total_votes.max(0)).sum();

            let candidates = standing
                .into_iter()
                .map(|candidate| CandidateTally {
                    votes: candidate.total_votes,
                    share: if total > 0 {
                        candidate.total_votes.max(0) as f64 * 100.0 / total as f64
                    } else {
                        0.0
                    },
                    is_winner: outcome == Outcome::Winner(candidate.id),
                    candidate: candidate.clone(),
                })
                .collect();

            PositionTally {
                position: position.clone(),
                candidates,
                outcome,
            }
        })
        .collect()
}

/// Who is looking at the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Guest,
    Member,
    Admin,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultsView {
    /// Results exist but have not been published; nothing is revealed.
    Pending,
    Board {
        /// False while an admin previews unpublished results.
        official: bool,
        positions: Vec<PositionTally>,
    },
}

/// Applies the publication gate to already-fetched data. Unpublished results
/// are shown to admins only.
pub fn results_view(
    election: &Election,
    viewer: Viewer,
    positions: &[Position],
    candidates: &[Candidate],
) -> ResultsView {
    if !election.is_published && viewer != Viewer::Admin {
        return ResultsView::Pending;
    }
    ResultsView::Board {
        official: election.is_published,
        positions: tally(positions, candidates),
    }
}
