use chrono::{DateTime, Utc};

use crate::api::ElectionApi;
use crate::error::Result;
use crate::models::{Election, ElectionStatus};

/// Time left until an upcoming election opens or a live one closes.
pub fn countdown(election: &Election, now: DateTime<Utc>) -> Option<String> {
    let (target, elapsed) = match election.status_as_of(now) {
        ElectionStatus::Upcoming => (election.start_date, "Starting now"),
        ElectionStatus::Live => (election.end_date, "Ending now"),
        ElectionStatus::Closed | ElectionStatus::Paused => return None,
    };

    let secs = (target - now).num_seconds();
    if secs <= 0 {
        return Some(elapsed.to_string());
    }

    let days = secs / 86_400;
    let hours = (secs / 3_600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;

    Some(if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    })
}

/// Splits displayable elections into active (anything not closed) and past
/// (closed, most recently ended first).
pub fn split_elections(
    elections: Vec<Election>,
    now: DateTime<Utc>,
) -> (Vec<Election>, Vec<Election>) {
    let (mut past, active): (Vec<_>, Vec<_>) = elections
        .into_iter()
        .filter(|e| e.should_display_at(now))
        .partition(|e| e.status_as_of(now) == ElectionStatus::Closed);
    past.sort_by(|a, b| b.end_date.cmp(&a.end_date));
    (active, past)
}

pub fn render_elections(elections: Vec<Election>, now: DateTime<Utc>) -> String {
    let (active, past) = split_elections(elections, now);
    let mut out = String::new();

    out.push_str("Active elections:\n");
    if active.is_empty() {
        out.push_str("  No active elections right now.\n");
    }
    for election in &active {
        let status = election.status_as_of(now);
        let timing = match (status, countdown(election, now)) {
            (ElectionStatus::Upcoming, Some(left)) => format!("opens in {left}"),
            (ElectionStatus::Live, Some(left)) => format!("closes in {left}"),
            _ => "voting suspended".to_string(),
        };
        out.push_str(&format!(
            "  [{}] {}  {}  {}\n",
            election.id,
            election.title,
            status.label(),
            timing
        ));
    }

    out.push_str("Past elections:\n");
    if past.is_empty() {
        out.push_str("  None yet.\n");
    }
    for election in &past {
        out.push_str(&format!(
            "  [{}] {}  ended {}  {}\n",
            election.id,
            election.title,
            election.end_date.format("%b %-d, %Y"),
            if election.is_published {
                "results published"
            } else {
                "results pending"
            }
        ));
    }
    out.trim_end().to_string()
}

pub async fn list_elections<A>(api: &A) -> Result<String>
where
    A: ElectionApi + ?Sized,
{
    let elections = api.list_elections().await?;
    Ok(render_elections(elections, Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::election;
    use chrono::{Duration, TimeZone};

    fn at(start: DateTime<Utc>, end: DateTime<Utc>, is_active: bool) -> Election {
        Election {
            start_date: start,
            end_date: end,
            is_active,
            status: None,
            should_display: None,
            ..election(1, ElectionStatus::Live)
        }
    }

    #[test]
    fn countdown_formats_by_magnitude() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let opened = now - Duration::hours(1);
        let long = at(opened, now + Duration::seconds(2 * 86_400 + 3 * 3_600 + 4 * 60 + 5), true);
        assert_eq!(countdown(&long, now).as_deref(), Some("2d 3h 4m"));

        let hours = at(opened, now + Duration::seconds(3 * 3_600 + 4 * 60 + 5), true);
        assert_eq!(countdown(&hours, now).as_deref(), Some("3h 4m 5s"));

        let minutes = at(now + Duration::seconds(65), now + Duration::days(1), true);
        assert_eq!(countdown(&minutes, now).as_deref(), Some("1m 5s"));

        let seconds = at(now - Duration::hours(1), now + Duration::seconds(9), true);
        assert_eq!(countdown(&seconds, now).as_deref(), Some("9s"));

        let paused = at(now - Duration::hours(1), now + Duration::hours(1), false);
        assert_eq!(countdown(&paused, now), None);
    }

    #[test]
    fn elapsed_countdown_uses_backend_status() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let mut e = at(now - Duration::minutes(1), now + Duration::hours(2), true);
        e.status = Some(ElectionStatus::Upcoming);
        assert_eq!(countdown(&e, now).as_deref(), Some("Starting now"));
    }

    #[test]
    fn splits_active_and_past() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let with_id = |id, start, end, is_active| Election {
            id,
            ..at(start, end, is_active)
        };
        let live = with_id(1, now - Duration::hours(1), now + Duration::hours(1), true);
        let older = with_id(2, now - Duration::days(30), now - Duration::days(29), true);
        let newer = with_id(3, now - Duration::days(3), now - Duration::days(2), true);
        let hidden = with_id(4, now + Duration::days(3), now + Duration::days(4), false);

        let (active, past) = split_elections(vec![older, live, hidden, newer], now);
        assert_eq!(active.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(past.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 2]);
    }

    #[test]
    fn renders_listing() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let live = at(now - Duration::hours(1), now + Duration::minutes(30), true);
        let text = render_elections(vec![live], now);
        assert!(text.contains("[1] Election 1  LIVE  closes in 30m 0s"));
        assert!(text.contains("None yet."));
    }
}
