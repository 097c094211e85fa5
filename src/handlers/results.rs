use std::collections::BTreeSet;

use log::{info, warn};

use super::{Progress, unavailable};
use crate::api::{ElectionApi, load_election_data};
use crate::error::{Error, Result};
use crate::models::{Election, ElectionId};
use crate::session::Session;
use crate::voting::results::results_view;
use crate::voting::{Outcome, PositionTally, ResultsView, Viewer};

/// Fetches fresh results and renders them for whoever is signed in.
pub async fn show_results<A>(
    api: &A,
    session: &Session,
    election_id: ElectionId,
) -> Result<String>
where
    A: ElectionApi + ?Sized,
{
    let data = load_election_data(api, election_id)
        .await
        .map_err(unavailable)?;
    let viewer = session.viewer();
    let view = results_view(&data.election, viewer, &data.positions, &data.candidates);
    Ok(render_results(&data.election, viewer, &view))
}

pub fn render_results(election: &Election, viewer: Viewer, view: &ResultsView) -> String {
    let (official, positions) = match view {
        ResultsView::Pending => {
            return format!(
                "{}\nResults Pending Verification\n\
                 The Electoral Commission is verifying the results. \
                 They will appear here once published.",
                election.title
            );
        }
        ResultsView::Board {
            official,
            positions,
        } => (*official, positions),
    };

    let mut out = format!(
        "{} - {}\n",
        election.title,
        if official {
            "Official Results"
        } else {
            "Unofficial / Live"
        }
    );
    if positions.is_empty() {
        out.push_str("No positions data available.\n");
    }
    for tally in positions {
        out.push_str(&render_position(tally));
    }
    if !official && viewer == Viewer::Admin {
        out.push_str(&format!(
            "These results are not public yet. Use `publish {}` to release them.\n",
            election.id
        ));
    }
    out.trim_end().to_string()
}

fn render_position(tally: &PositionTally) -> String {
    let headline = match (tally.outcome, tally.winner()) {
        (Outcome::Winner(_), Some(winner)) => format!("Winner: {}", winner.display_name()),
        (Outcome::Tie, _) => "Run-off / Tie".to_string(),
        _ => "No candidates or votes".to_string(),
    };
    let mut out = format!("{}  ({})\n", tally.position.name, headline);
    for line in &tally.candidates {
        out.push_str(&format!(
            "  {} {:<24} {:>6} votes  {:>5.1}%\n",
            if line.is_winner { "*" } else { " " },
            line.candidate.display_name(),
            line.votes,
            line.share
        ));
    }
    out
}

/// Elections whose publish request has not come back yet.
#[derive(Debug, Default)]
pub struct Publisher {
    in_flight: BTreeSet<ElectionId>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_publishing(&self, election_id: ElectionId) -> bool {
        self.in_flight.contains(&election_id)
    }

    pub fn begin(&mut self, election_id: ElectionId) -> Result<()> {
        if !self.in_flight.insert(election_id) {
            return Err(Error::Busy("results publication"));
        }
        Ok(())
    }

    pub fn finish(&mut self, election_id: ElectionId) {
        self.in_flight.remove(&election_id);
    }
}

/// Releases an election's results. Administrators only; publishing twice is
/// a no-op.
pub async fn publish<A>(
    api: &A,
    session: &Session,
    publisher: &mut Publisher,
    election_id: ElectionId,
    progress: Progress<'_>,
) -> Result<String>
where
    A: ElectionApi + ?Sized,
{
    let admin = session.require_admin()?;
    publisher.begin(election_id)?;
    if publisher.is_publishing(election_id) {
        progress("Publishing results...");
    }
    let result = publish_once(api, election_id).await.map_err(unavailable);
    publisher.finish(election_id);

    match &result {
        Ok(_) => info!("{} published results for election {}", admin.username, election_id),
        Err(e) => warn!("Publishing election {} failed: {}", election_id, e),
    }
    result
}

async fn publish_once<A>(api: &A, election_id: ElectionId) -> Result<String>
where
    A: ElectionApi + ?Sized,
{
    let election = api.get_election(election_id).await?;
    if election.is_published {
        return Ok(format!(
            "Results for {} are already published.",
            election.title
        ));
    }
    let receipt = api.publish_results(election_id).await?;
    if !receipt.is_published {
        return Err(Error::Server {
            status: 200,
            message: "publish request was not applied".to_string(),
        });
    }
    Ok(format!(
        "Results for {} are now official and visible to everyone.",
        election.title
    ))
}
