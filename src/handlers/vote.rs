use log::info;

use super::{Progress, unavailable};
use crate::api::{self, ElectionApi};
use crate::booth::{Booth, LoadOutcome, SubmitOutcome};
use crate::error::{Error, Result};
use crate::models::{ElectionId, ElectionStatus};
use crate::session::Session;
use crate::voting::ballot::review_lines;
use crate::voting::{Step, VoteFlow};

pub async fn enter_booth<A>(
    api: &A,
    session: &Session,
    booth: &mut Booth,
    election_id: ElectionId,
    progress: Progress<'_>,
) -> Result<String>
where
    A: ElectionApi + ?Sized,
{
    let voter = session.require_user()?;
    if booth.has_voted(election_id) {
        return Ok("You have already voted in this election.".to_string());
    }
    info!("{} entering booth for election {}", voter.username, election_id);

    let ticket = booth.begin_load(election_id);
    if booth.is_busy() {
        progress("Loading election...");
    }
    let result = api::load_booth_data(api, election_id).await;
    match booth.finish_load(ticket, result).map_err(unavailable)? {
        LoadOutcome::Ready => {}
        LoadOutcome::AlreadyVoted => {
            return Ok("You have already voted in this election.".to_string());
        }
        LoadOutcome::Stale => return Ok(String::new()),
    }

    let status = booth
        .flow()
        .election()
        .map(|e| e.status())
        .unwrap_or(ElectionStatus::Closed);
    if status != ElectionStatus::Live {
        booth.reset();
        return Err(Error::validation(
            "election",
            format!("This election is not open for voting ({}).", status.label()),
        ));
    }
    Ok(render_step(booth.flow()))
}

/// Routes an in-booth action and renders the resulting screen.
pub async fn booth_action<A>(
    api: &A,
    booth: &mut Booth,
    action: BoothAction,
    progress: Progress<'_>,
) -> Result<String>
where
    A: ElectionApi + ?Sized,
{
    if !booth.flow().is_loaded() {
        return Err(Error::InvalidCommand(
            "no voting session is open, use `vote <election id>`".to_string(),
        ));
    }

    match action {
        BoothAction::Choose(n) => {
            let position = booth.flow().current_position().ok_or_else(|| {
                Error::InvalidCommand("you are on the review step, use `change <n>`".to_string())
            })?;
            let position_id = position.id;
            let candidate_id = booth
                .flow()
                .candidates_for(position_id)
                .nth(n - 1)
                .map(|c| c.id)
                .ok_or_else(|| Error::InvalidCommand(format!("there is no candidate {n} here")))?;
            booth.select(position_id, candidate_id)?;
        }
        BoothAction::Next => booth.flow_mut().next_step(),
        BoothAction::Back => booth.flow_mut().prev_step(),
        BoothAction::Skip => booth.flow_mut().skip_step(),
        BoothAction::Change(n) => {
            if !booth.flow_mut().jump_to(n - 1) {
                return Err(Error::InvalidCommand(format!(
                    "there is no position {n} on this ballot"
                )));
            }
        }
        BoothAction::Submit => {
            let ticket = booth.begin_submit()?;
            if booth.is_busy() {
                progress("Submitting ballot...");
            }
            let result = api::submit_ballot(api, &ticket.votes).await;
            let SubmitOutcome::Cast { votes } = booth.finish_submit(ticket, result)? else {
                return Ok(String::new());
            };
            return Ok(format!(
                "Ballot cast successfully! {votes} vote(s) recorded. Thank you for voting."
            ));
        }
        BoothAction::Cancel => {
            booth.reset();
            return Ok("Left the voting booth. Nothing was submitted.".to_string());
        }
    }
    Ok(render_step(booth.flow()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoothAction {
    Choose(usize),
    Next,
    Back,
    Skip,
    Change(usize),
    Submit,
    Cancel,
}

pub fn render_step(flow: &VoteFlow) -> String {
    let Some(election) = flow.election() else {
        return "No voting session is open.".to_string();
    };

    let index = match flow.step() {
        Step::Review => return render_review(flow),
        Step::Position(index) => index,
    };
    let Some(position) = flow.current_position() else {
        return render_review(flow);
    };

    let mut out = format!(
        "{} - position {} of {} ({}%)\n{} ({} vote per person)\n",
        election.title,
        index + 1,
        flow.positions().len(),
        flow.progress_percent(),
        position.name,
        position.max_votes_per_user
    );

    let selected = flow.selections().get(&position.id).copied();
    let mut any = false;
    for (i, candidate) in flow.candidates_for(position.id).enumerate() {
        any = true;
        let marker = if selected == Some(candidate.id) { "[x]" } else { "[ ]" };
        out.push_str(&format!("  {} {}. {}\n", marker, i + 1, candidate.display_name()));
    }
    if !any {
        out.push_str("  No candidates are standing for this position.\n");
    }
    out.push_str("choose <n> | next | back | skip | cancel");
    out
}

pub fn render_review(flow: &VoteFlow) -> String {
    let title = flow.election().map(|e| e.title.as_str()).unwrap_or_default();
    let mut out = format!("Review your ballot for {title}\n");
    for line in review_lines(flow) {
        let choice = match line.choice {
            Some(candidate) => candidate.display_name(),
            None => "Abstained / Skipped".to_string(),
        };
        out.push_str(&format!("  {}. {}: {}\n", line.step + 1, line.position.name, choice));
    }
    if flow.positions().is_empty() {
        out.push_str("  This election has no positions.\n");
    }
    out.push_str("Action cannot be undone once submitted.\n");
    out.push_str("submit | change <n> | back | cancel");
    out
}
