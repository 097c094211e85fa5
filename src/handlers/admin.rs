use log::info;

use super::{Progress, unavailable};
use crate::api::ElectionApi;
use crate::error::Result;
use crate::models::{ElectionId, ElectionStats};
use crate::session::Session;

/// Turnout and per-position counts. Administrators only.
pub async fn show_stats<A>(
    api: &A,
    session: &Session,
    election_id: ElectionId,
    progress: Progress<'_>,
) -> Result<String>
where
    A: ElectionApi + ?Sized,
{
    session.require_admin()?;
    progress("Loading election statistics...");
    let stats = api
        .election_stats(election_id)
        .await
        .map_err(unavailable)?;
    Ok(render_stats(&stats))
}

pub fn render_stats(stats: &ElectionStats) -> String {
    let mut out = format!(
        "{} - statistics ({}, {})\n",
        stats.election_title,
        if stats.is_active { "active" } else { "inactive" },
        if stats.is_published {
            "published"
        } else {
            "unpublished"
        }
    );
    out.push_str(&format!(
        "Turnout: {:.1}% ({} of {} students voted)\n",
        stats.turnout_percentage, stats.total_voters, stats.total_registered_users
    ));
    out.push_str(&format!(
        "Votes cast: {} across {} positions\n",
        stats.total_votes_cast,
        stats.results_by_position.len()
    ));

    if stats.results_by_position.is_empty() {
        out.push_str("No positions data available.\n");
    }
    for position in &stats.results_by_position {
        out.push_str(&format!(
            "{}  ({} {})\n",
            position.position_name,
            position.total_votes,
            if position.total_votes == 1 { "vote" } else { "votes" }
        ));
        for candidate in &position.candidates {
            let share = if position.total_votes > 0 {
                candidate.vote_count as f64 * 100.0 / position.total_votes as f64
            } else {
                0.0
            };
            out.push_str(&format!(
                "  {:<24} {:>6}  {:>5.1}%\n",
                candidate.candidate_name, candidate.vote_count, share
            ));
        }
    }
    if stats.is_active {
        out.push_str(&format!(
            "Voting is still open; run `stats {}` again for fresh numbers.\n",
            stats.election_id
        ));
    }
    out.trim_end().to_string()
}

/// Opens or suspends voting on an election. Administrators only.
pub async fn set_active<A>(
    api: &A,
    session: &Session,
    election_id: ElectionId,
    is_active: bool,
) -> Result<String>
where
    A: ElectionApi + ?Sized,
{
    let admin = session.require_admin()?;
    let election = api
        .set_active(election_id, is_active)
        .await
        .map_err(unavailable)?;
    info!(
        "{} {} election {}",
        admin.username,
        if is_active { "activated" } else { "stopped" },
        election_id
    );
    Ok(format!(
        "Election {} {}. Status is now {}.",
        election.title,
        if is_active { "activated" } else { "stopped" },
        election.status().label()
    ))
}
