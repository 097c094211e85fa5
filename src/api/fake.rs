//! In-memory stand-in for the backend used by unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::{ElectionApi, IdentityApi};
use crate::error::{Error, Result};
use crate::models::{
    Candidate, CandidateStats, Credentials, Election, ElectionId, ElectionStats, ElectionStatus,
    NewVote, Position, PositionId, PositionStats, PublishReceipt, User, VoteRecord,
};

#[derive(Default)]
struct State {
    elections: Vec<Election>,
    positions: Vec<Position>,
    candidates: Vec<Candidate>,
    my_votes: Vec<VoteRecord>,
    cast: Vec<NewVote>,
    rejected_positions: HashSet<PositionId>,
    publish_calls: usize,
    registered_users: i64,
    user: Option<User>,
    signed_in: bool,
    offline: bool,
}

pub struct FakeApi {
    state: Mutex<State>,
}

pub fn election(id: ElectionId, status: ElectionStatus) -> Election {
    let now = Utc::now();
    let (start, end, is_active) = match status {
        ElectionStatus::Live => (now - Duration::hours(1), now + Duration::hours(5), true),
        ElectionStatus::Upcoming => (now + Duration::days(2), now + Duration::days(3), true),
        ElectionStatus::Closed => (now - Duration::days(9), now - Duration::days(8), true),
        ElectionStatus::Paused => (now - Duration::hours(1), now + Duration::hours(5), false),
    };
    Election {
        id,
        title: format!("Election {id}"),
        start_date: start,
        end_date: end,
        is_active,
        is_open: status == ElectionStatus::Live,
        is_published: false,
        status: Some(status),
        should_display: Some(true),
    }
}

pub fn position(id: PositionId, election: ElectionId, rank: i32) -> Position {
    Position {
        id,
        election,
        election_title: format!("Election {election}"),
        name: format!("Office {id}"),
        rank,
        max_votes_per_user: 1,
    }
}

pub fn candidate(id: i64, position: PositionId, total_votes: i64) -> Candidate {
    Candidate {
        id,
        position,
        position_name: format!("Office {position}"),
        user: Some(id + 1000),
        user_details: Some(user(id + 1000, &format!("cand{id}"), false)),
        manifesto: String::new(),
        photo: None,
        total_votes,
    }
}

pub fn user(id: i64, username: &str, is_staff: bool) -> User {
    User {
        id,
        username: username.to_string(),
        email: format!("{username}@st.example.edu"),
        first_name: "First".to_string(),
        last_name: username.to_string(),
        is_student: true,
        is_alumni: false,
        is_staff,
        is_superuser: false,
    }
}

impl FakeApi {
    /// Election 1 is live with positions 10 (rank 2), 11 (rank 1) and 12 (rank 3).
    pub fn sample() -> Self {
        let state = State {
            elections: vec![
                election(1, ElectionStatus::Live),
                election(2, ElectionStatus::Closed),
            ],
            positions: vec![
                position(10, 1, 2),
                position(11, 1, 1),
                position(12, 1, 3),
                position(20, 2, 1),
            ],
            registered_users: 40,
            candidates: vec![
                candidate(100, 10, 4),
                candidate(101, 10, 9),
                candidate(110, 11, 3),
                candidate(120, 12, 6),
                candidate(121, 12, 6),
                candidate(200, 20, 12),
            ],
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn sign_in_as(&self, user: User) {
        let mut state = self.state.lock().unwrap();
        state.user = Some(user);
        state.signed_in = true;
    }

    pub fn reject_position(&self, position: PositionId) {
        self.state.lock().unwrap().rejected_positions.insert(position);
    }

    pub fn record_existing_vote(&self, position: PositionId, candidate: i64) {
        self.state.lock().unwrap().my_votes.push(VoteRecord {
            id: None,
            position,
            candidate,
            timestamp: None,
        });
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    pub fn cast_votes(&self) -> Vec<NewVote> {
        self.state.lock().unwrap().cast.clone()
    }

    pub fn publish_calls(&self) -> usize {
        self.state.lock().unwrap().publish_calls
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        let state = self.state.lock().unwrap();
        if state.offline {
            return Err(Error::Network("connection refused".to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl ElectionApi for FakeApi {
    async fn list_elections(&self) -> Result<Vec<Election>> {
        Ok(self.guard()?.elections.clone())
    }

    async fn get_election(&self, election_id: ElectionId) -> Result<Election> {
        self.guard()?
            .elections
            .iter()
            .find(|e| e.id == election_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("No Election matches the given query.".to_string()))
    }

    async fn positions(&self, election_id: ElectionId) -> Result<Vec<Position>> {
        Ok(self
            .guard()?
            .positions
            .iter()
            .filter(|p| p.election == election_id)
            .cloned()
            .collect())
    }

    async fn candidates(&self, election_id: ElectionId) -> Result<Vec<Candidate>> {
        let state = self.guard()?;
        let position_ids: HashSet<PositionId> = state
            .positions
            .iter()
            .filter(|p| p.election == election_id)
            .map(|p| p.id)
            .collect();
        Ok(state
            .candidates
            .iter()
            .filter(|c| position_ids.contains(&c.position))
            .cloned()
            .collect())
    }

    async fn my_votes(&self) -> Result<Vec<VoteRecord>> {
        Ok(self.guard()?.my_votes.clone())
    }

    async fn cast_vote(&self, vote: &NewVote) -> Result<VoteRecord> {
        let mut state = self.guard()?;
        if state.rejected_positions.contains(&vote.position) {
            return Err(Error::validation("position", "You have already voted for this position."));
        }
        state.cast.push(*vote);
        let record = VoteRecord {
            id: Some(state.cast.len() as i64),
            position: vote.position,
            candidate: vote.candidate,
            timestamp: Some(Utc::now()),
        };
        state.my_votes.push(record.clone());
        Ok(record)
    }

    async fn publish_results(&self, election_id: ElectionId) -> Result<PublishReceipt> {
        let mut state = self.guard()?;
        state.publish_calls += 1;
        let election = state
            .elections
            .iter_mut()
            .find(|e| e.id == election_id)
            .ok_or_else(|| Error::NotFound("No Election matches the given query.".to_string()))?;
        election.is_published = true;
        Ok(PublishReceipt {
            status: "results published".to_string(),
            is_published: true,
        })
    }

    async fn election_stats(&self, election_id: ElectionId) -> Result<ElectionStats> {
        let state = self.guard()?;
        let election = state
            .elections
            .iter()
            .find(|e| e.id == election_id)
            .ok_or_else(|| Error::NotFound("No Election matches the given query.".to_string()))?;

        let mut positions: Vec<&Position> = state
            .positions
            .iter()
            .filter(|p| p.election == election_id)
            .collect();
        positions.sort_by_key(|p| p.rank);

        let results_by_position: Vec<PositionStats> = positions
            .into_iter()
            .map(|p| {
                let mut candidates: Vec<CandidateStats> = state
                    .candidates
                    .iter()
                    .filter(|c| c.position == p.id)
                    .map(|c| CandidateStats {
                        candidate_id: c.id,
                        candidate_name: c.display_name(),
                        candidate_username: format!("cand{}", c.id),
                        photo: None,
                        vote_count: c.total_votes,
                    })
                    .collect();
                candidates.sort_by_key(|c| std::cmp::Reverse(c.vote_count));
                PositionStats {
                    position_id: p.id,
                    position_name: p.name.clone(),
                    rank: p.rank,
                    total_votes: candidates.iter().map(|c| c.vote_count).sum(),
                    candidates,
                }
            })
            .collect();

        // One vote per position per voter, so the busiest position bounds turnout.
        let total_voters = results_by_position
            .iter()
            .map(|p| p.total_votes)
            .max()
            .unwrap_or(0);
        let turnout_percentage = if state.registered_users > 0 {
            total_voters as f64 * 100.0 / state.registered_users as f64
        } else {
            0.0
        };
        Ok(ElectionStats {
            election_id,
            election_title: election.title.clone(),
            is_active: election.is_active,
            is_published: election.is_published,
            total_votes_cast: results_by_position.iter().map(|p| p.total_votes).sum(),
            total_voters,
            total_registered_users: state.registered_users,
            turnout_percentage,
            results_by_position,
        })
    }

    async fn set_active(&self, election_id: ElectionId, is_active: bool) -> Result<Election> {
        let mut state = self.guard()?;
        let election = state
            .elections
            .iter_mut()
            .find(|e| e.id == election_id)
            .ok_or_else(|| Error::NotFound("No Election matches the given query.".to_string()))?;
        election.is_active = is_active;
        election.status = Some(ElectionStatus::derive(
            Utc::now(),
            election.start_date,
            election.end_date,
            is_active,
        ));
        Ok(election.clone())
    }
}

#[async_trait]
impl IdentityApi for FakeApi {
    fn has_credentials(&self) -> bool {
        self.state.lock().unwrap().signed_in
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<()> {
        let mut state = self.guard()?;
        if credentials.password != "correct-horse" {
            return Err(Error::Unauthenticated(
                "No active account found with the given credentials".to_string(),
            ));
        }
        state.signed_in = true;
        if state.user.is_none() {
            state.user = Some(user(1, &credentials.username, false));
        }
        Ok(())
    }

    async fn current_user(&self) -> Result<User> {
        let state = self.guard()?;
        match (&state.user, state.signed_in) {
            (Some(user), true) => Ok(user.clone()),
            _ => Err(Error::Unauthenticated("Given token not valid".to_string())),
        }
    }

    fn sign_out(&self) {
        self.state.lock().unwrap().signed_in = false;
    }
}
