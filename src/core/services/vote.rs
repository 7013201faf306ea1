use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;

use crate::core::feed::VoteSubscription;
use crate::core::models::vote::{Insert as VoteInsert, OptionTally, Tally, Update as VoteUpdate, Vote, VoteState};
use crate::core::ports::repository::{PollCommon, Store, VoteCommon, VoteFeedCommon};
use crate::error::Error;

pub const VOTE_CHANGE_WINDOW_SECS: i64 = 15 * 60;

// attempts at resolving a concurrent create/update race before giving up
const MAX_CAST_ATTEMPTS: usize = 3;

pub fn change_window() -> Duration {
    Duration::seconds(VOTE_CHANGE_WINDOW_SECS)
}

// None once the vote is locked. Equality with the window still counts as
// mutable, so "no remaining time" and "locked" coincide for display.
pub fn remaining_change_window(cast_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
    let elapsed = now - cast_at;
    if elapsed <= change_window() {
        Some(change_window() - elapsed)
    } else {
        None
    }
}

// The lock decision is always recomputed from cast_at, never cached.
pub fn vote_state(vote: Option<&Vote>, now: DateTime<Utc>) -> VoteState {
    match vote {
        None => VoteState::NoVote,
        Some(v) => match remaining_change_window(v.cast_at, now) {
            Some(remaining) => VoteState::Mutable {
                option_index: v.option_index,
                cast_at: v.cast_at,
                remaining_secs: remaining.num_seconds(),
            },
            None => VoteState::Locked {
                option_index: v.option_index,
            },
        },
    }
}

pub async fn cast_or_change_vote<S>(storer: &mut S, poll_id: &str, user_id: &str, option_index: i32) -> Result<Vote, Error>
where
    S: Store,
{
    let poll = PollCommon::get(storer, poll_id)
        .await?
        .ok_or_else(|| Error::PollNotFound(poll_id.to_string()))?;
    if option_index < 0 || option_index as usize >= poll.options.len() {
        return Err(Error::InvalidOption {
            poll_id: poll_id.to_string(),
            index: option_index,
        });
    }
    for _ in 0..MAX_CAST_ATTEMPTS {
        let now = Utc::now();
        match VoteCommon::get_for_user(storer, poll_id, user_id).await? {
            None => {
                match VoteCommon::insert(
                    storer,
                    VoteInsert {
                        poll_id: poll_id.to_string(),
                        user_id: user_id.to_string(),
                        option_index,
                        cast_at: now,
                    },
                )
                .await
                {
                    Ok(vote) => return Ok(vote),
                    // lost the create race, re-read and take the change path
                    Err(Error::DuplicateVote) => continue,
                    Err(e) => return Err(e),
                }
            }
            Some(existing) => {
                if now - existing.cast_at > change_window() {
                    return Err(Error::VoteLocked);
                }
                // the window restarts from this cast_at on success
                match VoteCommon::update(
                    storer,
                    &existing.id,
                    VoteUpdate {
                        option_index,
                        cast_at: now,
                        expected_version: existing.version,
                    },
                )
                .await
                {
                    Ok(vote) => return Ok(vote),
                    Err(Error::Conflict) => continue,
                    Err(e) => return Err(e),
                }
            }
        }
    }
    Err(Error::Conflict)
}

pub fn tally_votes(options: &[String], votes: &[Vote]) -> Tally {
    let counts = votes.iter().counts_by(|v| v.option_index);
    let total_votes = votes.len() as i64;
    let options = options
        .iter()
        .enumerate()
        .map(|(index, option)| {
            let votes = counts.get(&(index as i32)).copied().unwrap_or(0) as i64;
            let percentage = if total_votes == 0 {
                0.0
            } else {
                votes as f64 * 100.0 / total_votes as f64
            };
            OptionTally {
                option: option.clone(),
                votes,
                percentage,
            }
        })
        .collect();
    Tally { options, total_votes }
}

pub async fn tally<S>(storer: &mut S, poll_id: &str) -> Result<Tally, Error>
where
    S: Store,
{
    let poll = PollCommon::get(storer, poll_id)
        .await?
        .ok_or_else(|| Error::PollNotFound(poll_id.to_string()))?;
    let votes = VoteCommon::query_for_poll(storer, poll_id).await?;
    Ok(tally_votes(&poll.options, &votes))
}

pub async fn my_vote<S>(storer: &mut S, poll_id: &str, user_id: &str) -> Result<VoteState, Error>
where
    S: Store,
{
    PollCommon::get(storer, poll_id)
        .await?
        .ok_or_else(|| Error::PollNotFound(poll_id.to_string()))?;
    let vote = VoteCommon::get_for_user(storer, poll_id, user_id).await?;
    Ok(vote_state(vote.as_ref(), Utc::now()))
}

// Display-facing entry point so consumers never touch the store directly.
pub async fn subscribe_to_votes<S>(storer: &mut S, poll_id: &str) -> Result<VoteSubscription, Error>
where
    S: Store,
{
    PollCommon::get(storer, poll_id)
        .await?
        .ok_or_else(|| Error::PollNotFound(poll_id.to_string()))?;
    VoteFeedCommon::subscribe(storer, poll_id).await
}
