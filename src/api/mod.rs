mod client;

#[cfg(test)]
pub mod fake;

pub use client::HttpApi;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{
    Candidate, Credentials, Election, ElectionData, ElectionId, ElectionStats, NewVote, Position,
    PublishReceipt, User, VoteRecord,
};

/// Election reads and writes against the backend.
#[async_trait]
pub trait ElectionApi: Send + Sync {
    async fn list_elections(&self) -> Result<Vec<Election>>;
    async fn get_election(&self, election_id: ElectionId) -> Result<Election>;
    async fn positions(&self, election_id: ElectionId) -> Result<Vec<Position>>;
    async fn candidates(&self, election_id: ElectionId) -> Result<Vec<Candidate>>;
    async fn my_votes(&self) -> Result<Vec<VoteRecord>>;
    async fn cast_vote(&self, vote: &NewVote) -> Result<VoteRecord>;
    async fn publish_results(&self, election_id: ElectionId) -> Result<PublishReceipt>;
    async fn election_stats(&self, election_id: ElectionId) -> Result<ElectionStats>;
    /// Starts or stops voting; returns the updated election.
    async fn set_active(&self, election_id: ElectionId, is_active: bool) -> Result<Election>;
}

/// Bearer-token identity provider.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    fn has_credentials(&self) -> bool;
    async fn sign_in(&self, credentials: &Credentials) -> Result<()>;
    async fn current_user(&self) -> Result<User>;
    fn sign_out(&self);
}

/// List endpoints answer with a bare array or a paginated envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListResponse<T> {
    Plain(Vec<T>),
    Page { results: Vec<T> },
}

impl<T> ListResponse<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            ListResponse::Plain(items) | ListResponse::Page { results: items } => items,
        }
    }
}

/// Fetches the election, its positions and its candidates in one go.
///
/// The three reads run concurrently; the first failure wins and nothing is
/// retried here.
pub async fn load_election_data<A>(api: &A, election_id: ElectionId) -> Result<ElectionData>
where
    A: ElectionApi + ?Sized,
{
    debug!("Loading election data for election {}", election_id);
    let (election, positions, candidates) = tokio::try_join!(
        api.get_election(election_id),
        api.positions(election_id),
        api.candidates(election_id),
    )?;
    debug!(
        "Election {} loaded: {} positions, {} candidates",
        election_id,
        positions.len(),
        candidates.len()
    );
    Ok(ElectionData {
        election,
        positions,
        candidates,
    })
}

/// Election data plus the signed-in voter's existing votes, for the booth.
pub async fn load_booth_data<A>(
    api: &A,
    election_id: ElectionId,
) -> Result<(ElectionData, Vec<VoteRecord>)>
where
    A: ElectionApi + ?Sized,
{
    tokio::try_join!(load_election_data(api, election_id), api.my_votes())
}

/// Casts one vote per non-abstained position, in order, stopping at the
/// first rejection. A failure after some votes went through is reported as
/// [`Error::PartialBallot`].
pub async fn submit_ballot<A>(api: &A, ballot: &[NewVote]) -> Result<Vec<VoteRecord>>
where
    A: ElectionApi + ?Sized,
{
    let mut recorded = Vec::with_capacity(ballot.len());
    for vote in ballot {
        debug!(
            "Casting vote for candidate {} in position {}",
            vote.candidate, vote.position
        );
        match api.cast_vote(vote).await {
            Ok(record) => recorded.push(record),
            Err(e) if recorded.is_empty() => return Err(e),
            Err(e) => {
                return Err(Error::PartialBallot {
                    recorded: recorded.len(),
                    source: Box::new(e),
                });
            }
        }
    }
    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use super::fake::FakeApi;
    use super::*;

    #[test]
    fn list_response_accepts_both_shapes() {
        let plain: ListResponse<i64> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(plain.into_vec(), vec![1, 2]);
        let page: ListResponse<i64> =
            serde_json::from_str(r#"{"count": 1, "next": null, "results": [7]}"#).unwrap();
        assert_eq!(page.into_vec(), vec![7]);
    }

    #[tokio::test]
    async fn load_surfaces_not_found() {
        let api = FakeApi::sample();
        let err = load_election_data(&api, 404).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn submit_stops_at_first_rejection() {
        let api = FakeApi::sample();
        api.reject_position(11);
        let ballot = [
            NewVote { position: 10, candidate: 100 },
            NewVote { position: 11, candidate: 110 },
            NewVote { position: 12, candidate: 120 },
        ];
        let err = submit_ballot(&api, &ballot).await.unwrap_err();
        assert!(matches!(err, Error::PartialBallot { recorded: 1, .. }));
        assert!(err.user_message().contains("1 vote(s) were already recorded"));
        assert_eq!(api.cast_votes(), vec![NewVote { position: 10, candidate: 100 }]);
    }

    #[tokio::test]
    async fn first_rejection_is_reported_as_is() {
        let api = FakeApi::sample();
        api.reject_position(10);
        let ballot = [
            NewVote { position: 10, candidate: 100 },
            NewVote { position: 11, candidate: 110 },
        ];
        let err = submit_ballot(&api, &ballot).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(api.cast_votes().is_empty());
    }

    #[tokio::test]
    async fn booth_data_includes_my_votes() {
        let api = FakeApi::sample();
        api.record_existing_vote(10, 100);
        let (data, votes) = load_booth_data(&api, 1).await.unwrap();
        assert_eq!(data.election.id, 1);
        assert_eq!(votes.len(), 1);
    }
}
