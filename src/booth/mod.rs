//! Glue between the backend and the voting wizard.
//!
//! Network work is split into `begin_*` / `finish_*` halves so the command
//! loop never holds the booth across an await, and so a response that
//! arrives after [`Booth::reset`] can be recognised and dropped. Each load,
//! submission and reset bumps a generation counter; a completion carrying an
//! older generation is stale.

use std::collections::BTreeSet;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{CandidateId, ElectionData, ElectionId, NewVote, PositionId, VoteRecord};
use crate::voting::ballot::{ballot_votes, validate_selection};
use crate::voting::{Step, VoteFlow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    election_id: ElectionId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTicket {
    generation: u64,
    election_id: ElectionId,
    pub votes: Vec<NewVote>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    /// The voter already has votes recorded for this election.
    AlreadyVoted,
    /// The booth moved on while the request was in flight.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Cast { votes: usize },
    Stale,
}

#[derive(Debug, Default)]
pub struct Booth {
    flow: VoteFlow,
    generation: u64,
    loading: Option<ElectionId>,
    submitting: bool,
    voted: BTreeSet<ElectionId>,
}

impl Booth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flow(&self) -> &VoteFlow {
        &self.flow
    }

    pub fn flow_mut(&mut self) -> &mut VoteFlow {
        &mut self.flow
    }

    /// True while a load or a submission is outstanding.
    pub fn is_busy(&self) -> bool {
        self.loading.is_some() || self.submitting
    }

    pub fn has_voted(&self, election_id: ElectionId) -> bool {
        self.voted.contains(&election_id)
    }

    pub fn begin_load(&mut self, election_id: ElectionId) -> LoadTicket {
        self.generation += 1;
        self.loading = Some(election_id);
        self.submitting = false;
        self.flow.reset();
        debug!("Loading election {} (generation {})", election_id, self.generation);
        LoadTicket {
            generation: self.generation,
            election_id,
        }
    }

    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<(ElectionData, Vec<VoteRecord>)>,
    ) -> Result<LoadOutcome> {
        if ticket.generation != self.generation {
            debug!(
                "Dropping stale load of election {} (generation {} < {})",
                ticket.election_id, ticket.generation, self.generation
            );
            return Ok(LoadOutcome::Stale);
        }
        self.loading = None;

        let (data, my_votes) = result.inspect_err(|e| {
            warn!("Failed to load election {}: {}", ticket.election_id, e);
        })?;

        let already_voted = my_votes
            .iter()
            .any(|vote| data.positions.iter().any(|p| p.id == vote.position));
        if already_voted {
            info!("Voter already took part in election {}", ticket.election_id);
            self.voted.insert(ticket.election_id);
            return Ok(LoadOutcome::AlreadyVoted);
        }

        info!(
            "Booth open for election {} with {} positions",
            ticket.election_id,
            data.positions.len()
        );
        self.flow
            .load_election(data.election, data.positions, data.candidates);
        Ok(LoadOutcome::Ready)
    }

    /// Checked selection: the candidate must stand for the position.
    pub fn select(&mut self, position_id: PositionId, candidate_id: CandidateId) -> Result<()> {
        validate_selection(&self.flow, position_id, candidate_id)?;
        self.flow.select_candidate(position_id, candidate_id);
        Ok(())
    }

    /// Locks the ballot for submission. Refuses a second concurrent submit.
    pub fn begin_submit(&mut self) -> Result<SubmitTicket> {
        if self.submitting {
            return Err(Error::Busy("ballot submission"));
        }
        let election_id = match self.flow.election() {
            Some(election) => election.id,
            None => return Err(Error::validation("election", "No voting session is open.")),
        };
        if self.flow.step() != Step::Review {
            return Err(Error::validation(
                "ballot",
                "Review your ballot before submitting.",
            ));
        }
        self.submitting = true;
        Ok(SubmitTicket {
            generation: self.generation,
            election_id,
            votes: ballot_votes(&self.flow),
        })
    }

    /// On success the session is closed; on failure the selections stay so
    /// the voter can try again.
    pub fn finish_submit(
        &mut self,
        ticket: SubmitTicket,
        result: Result<Vec<VoteRecord>>,
    ) -> Result<SubmitOutcome> {
        if ticket.generation != self.generation {
            debug!("Dropping stale submission for election {}", ticket.election_id);
            return Ok(SubmitOutcome::Stale);
        }
        self.submitting = false;

        let recorded = result.inspect_err(|e| {
            warn!("Ballot for election {} rejected: {}", ticket.election_id, e);
        })?;

        info!(
            "Ballot cast for election {} ({} votes)",
            ticket.election_id,
            recorded.len()
        );
        self.voted.insert(ticket.election_id);
        self.generation += 1;
        self.flow.reset();
        Ok(SubmitOutcome::Cast {
            votes: recorded.len(),
        })
    }

    /// Abandons the session and anything still in flight.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.loading = None;
        self.submitting = false;
        self.flow.reset();
    }
}
