use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::time::interval;

use crate::api::ElectionApi;
use crate::models::{Election, ElectionId, ElectionStatus};

/// A status change seen between two polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub election_id: ElectionId,
    pub title: String,
    pub from: Option<ElectionStatus>,
    pub to: ElectionStatus,
}

/// Compares the latest listing against what was seen last time and updates
/// `seen` in place. First sightings are reported with `from: None`.
pub fn detect_transitions(
    seen: &mut HashMap<ElectionId, ElectionStatus>,
    elections: &[Election],
) -> Vec<Transition> {
    let mut transitions = Vec::new();
    for election in elections {
        let status = election.status();
        let previous = seen.insert(election.id, status);
        if previous != Some(status) {
            transitions.push(Transition {
                election_id: election.id,
                title: election.title.clone(),
                from: previous,
                to: status,
            });
        }
    }
    transitions
}

pub async fn watch_election_status<A>(api: Arc<A>, every: Duration)
where
    A: ElectionApi + ?Sized,
{
    info!("Watching election status every {}s", every.as_secs());
    let mut ticker = interval(every);
    let mut seen: HashMap<ElectionId, ElectionStatus> = HashMap::new();
    let mut first_poll = true;

    loop {
        ticker.tick().await;
        match api.list_elections().await {
            Ok(elections) => {
                for change in detect_transitions(&mut seen, &elections) {
                    // The first listing only seeds the table.
                    if first_poll {
                        continue;
                    }
                    match change.from {
                        Some(from) => info!(
                            "Election {} '{}' is now {} (was {})",
                            change.election_id,
                            change.title,
                            change.to.label(),
                            from.label()
                        ),
                        None => info!(
                            "New election {} '{}' is {}",
                            change.election_id,
                            change.title,
                            change.to.label()
                        ),
                    }
                }
                first_poll = false;
            }
            Err(e) => {
                error!("Failed to poll election status: {}", e);
            }
        }
    }
}
