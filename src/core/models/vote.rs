use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// version is bumped by the store on every successful update and is the
// compare-and-set guard for concurrent changes to the same ballot.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Vote {
    pub id: String,
    pub poll_id: String,
    pub user_id: String,
    pub option_index: i32,
    pub cast_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Deserialize)]
pub struct VoteCast {
    pub option_index: i32,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub poll_id: String,
    pub user_id: String,
    pub option_index: i32,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Update {
    pub option_index: i32,
    pub cast_at: DateTime<Utc>,
    pub expected_version: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VoteState {
    NoVote,
    Mutable {
        option_index: i32,
        cast_at: DateTime<Utc>,
        remaining_secs: i64,
    },
    Locked {
        option_index: i32,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionTally {
    pub option: String,
    pub votes: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tally {
    pub options: Vec<OptionTally>,
    pub total_votes: i64,
}
