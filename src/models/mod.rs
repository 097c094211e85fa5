use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ElectionId = i64;
pub type PositionId = i64;
pub type CandidateId = i64;
pub type UserId = i64;

/// Lifecycle status of an election as shown to voters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElectionStatus {
    Live,
    Upcoming,
    Closed,
    Paused,
}

impl ElectionStatus {
    /// Derives the status from the election window and activation flag.
    ///
    /// Past the end date an election is always closed, whatever the flag says.
    pub fn derive(
        now: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        is_active: bool,
    ) -> Self {
        if now > end {
            ElectionStatus::Closed
        } else if now < start {
            if is_active {
                ElectionStatus::Upcoming
            } else {
                ElectionStatus::Paused
            }
        } else if is_active {
            ElectionStatus::Live
        } else {
            ElectionStatus::Paused
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ElectionStatus::Live => "LIVE",
            ElectionStatus::Upcoming => "UPCOMING",
            ElectionStatus::Closed => "ENDED",
            ElectionStatus::Paused => "SUSPENDED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    pub id: ElectionId,
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    #[serde(default)]
    pub is_open: bool,
    #[serde(default)]
    pub is_published: bool,
    // Computed by the backend at response time.
    #[serde(default)]
    pub status: Option<ElectionStatus>,
    #[serde(default)]
    pub should_display: Option<bool>,
}

impl Election {
    /// Status as reported by the backend, or derived locally when absent.
    pub fn status(&self) -> ElectionStatus {
        self.status_as_of(Utc::now())
    }

    pub fn status_as_of(&self, now: DateTime<Utc>) -> ElectionStatus {
        self.status.unwrap_or_else(|| self.status_at(now))
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> ElectionStatus {
        ElectionStatus::derive(now, self.start_date, self.end_date, self.is_active)
    }

    /// Inactive elections outside their window are hidden from the public list.
    pub fn should_display_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(flag) = self.should_display {
            return flag;
        }
        self.is_active || (self.start_date <= now && now <= self.end_date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub election: ElectionId,
    #[serde(default)]
    pub election_title: String,
    pub name: String,
    #[serde(default)]
    pub rank: i32,
    #[serde(default = "default_max_votes")]
    pub max_votes_per_user: u32,
}

fn default_max_votes() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub position: PositionId,
    #[serde(default)]
    pub position_name: String,
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub user_details: Option<User>,
    #[serde(default)]
    pub manifesto: String,
    #[serde(default)]
    pub photo: Option<String>,
    // Server-computed; a missing total counts as zero.
    #[serde(default)]
    pub total_votes: i64,
}

impl Candidate {
    pub fn display_name(&self) -> String {
        let name = self
            .user_details
            .as_ref()
            .map(User::full_name)
            .unwrap_or_default();
        if name.is_empty() {
            "Unknown".to_string()
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_student: bool,
    #[serde(default)]
    pub is_alumni: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A vote already recorded by the backend for the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub position: PositionId,
    pub candidate: CandidateId,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Wire body for casting one vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVote {
    pub position: PositionId,
    pub candidate: CandidateId,
}

/// Everything a voting session needs, fetched fresh per session.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectionData {
    pub election: Election,
    pub positions: Vec<Position>,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublishReceipt {
    #[serde(default)]
    pub status: String,
    pub is_published: bool,
}

/// Admin turnout report for one election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionStats {
    pub election_id: ElectionId,
    pub election_title: String,
    pub is_active: bool,
    pub is_published: bool,
    pub total_votes_cast: i64,
    /// Distinct users with at least one vote in the election.
    pub total_voters: i64,
    pub total_registered_users: i64,
    pub turnout_percentage: f64,
    #[serde(default)]
    pub results_by_position: Vec<PositionStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionStats {
    pub position_id: PositionId,
    pub position_name: String,
    #[serde(default)]
    pub rank: i32,
    pub total_votes: i64,
    /// Most votes first.
    #[serde(default)]
    pub candidates: Vec<CandidateStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateStats {
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    #[serde(default)]
    pub candidate_username: String,
    #[serde(default)]
    pub photo: Option<String>,
    pub vote_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn election(is_active: bool) -> Election {
        Election {
            id: 1,
            title: "General Elections".to_string(),
            start_date: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap(),
            is_active,
            is_open: false,
            is_published: false,
            status: None,
            should_display: None,
        }
    }

    #[test]
    fn status_follows_window_and_flag() {
        let e = election(true);
        let before = e.start_date - Duration::hours(1);
        let during = e.start_date + Duration::hours(1);
        let after = e.end_date + Duration::seconds(1);

        assert_eq!(e.status_at(before), ElectionStatus::Upcoming);
        assert_eq!(e.status_at(during), ElectionStatus::Live);
        assert_eq!(e.status_at(after), ElectionStatus::Closed);

        let paused = election(false);
        assert_eq!(paused.status_at(before), ElectionStatus::Paused);
        assert_eq!(paused.status_at(during), ElectionStatus::Paused);
        assert_eq!(paused.status_at(after), ElectionStatus::Closed);
    }

    #[test]
    fn inactive_elections_outside_window_are_hidden() {
        let e = election(false);
        assert!(!e.should_display_at(e.start_date - Duration::minutes(1)));
        assert!(e.should_display_at(e.start_date + Duration::minutes(1)));
        assert!(!e.should_display_at(e.end_date + Duration::minutes(1)));
        assert!(election(true).should_display_at(e.end_date + Duration::days(3)));
    }

    #[test]
    fn candidate_deserializes_with_missing_totals() {
        let json = r#"{"id": 4, "position": 2, "user_details": {"id": 9, "username": "ama", "first_name": "Ama", "last_name": "Mensah"}}"#;
        let candidate: Candidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.total_votes, 0);
        assert_eq!(candidate.display_name(), "Ama Mensah");

        let bare: Candidate = serde_json::from_str(r#"{"id": 5, "position": 2}"#).unwrap();
        assert_eq!(bare.display_name(), "Unknown");
    }

    #[test]
    fn status_uses_backend_spelling() {
        let status: ElectionStatus = serde_json::from_str("\"UPCOMING\"").unwrap();
        assert_eq!(status, ElectionStatus::Upcoming);
        assert_eq!(serde_json::to_string(&ElectionStatus::Live).unwrap(), "\"LIVE\"");
    }
}
