use chrono::{DateTime, Utc};

use crate::core::models::poll::Poll;
use crate::core::models::vote::{Tally, Vote};
use crate::core::services::vote::tally_votes;

// Display-side view of one poll: the authoritative vote set from the feed
// plus at most one local shadow vote awaiting confirmation. The shadow is
// tagged with a request sequence so a stale store response can never
// overwrite a newer local intent.
pub struct LivePoll {
    poll_id: String,
    options: Vec<String>,
    votes: Vec<Vote>,
    shadow: Option<Shadow>,
    next_seq: u64,
}

struct Shadow {
    seq: u64,
    vote: Vote,
    confirmed: bool,
}

impl LivePoll {
    pub fn new(poll: &Poll) -> Self {
        Self {
            poll_id: poll.id.clone(),
            options: poll.options.clone(),
            votes: Vec::new(),
            shadow: None,
            next_seq: 0,
        }
    }

    // Stage a vote intent before the store confirms it. Returns the sequence
    // number to hand back to confirm or reject.
    pub fn stage(&mut self, user_id: &str, option_index: i32, now: DateTime<Utc>) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.shadow = Some(Shadow {
            seq,
            confirmed: false,
            vote: Vote {
                id: format!("local-{}", seq),
                poll_id: self.poll_id.clone(),
                user_id: user_id.to_string(),
                option_index,
                cast_at: now,
                version: 0,
            },
        });
        seq
    }

    // The write succeeded. Ignored when seq is stale: a newer intent owns
    // the shadow by now.
    pub fn confirm(&mut self, seq: u64, vote: Vote) {
        if let Some(shadow) = &mut self.shadow {
            if shadow.seq == seq {
                shadow.vote = vote;
                shadow.confirmed = true;
            }
        }
    }

    // The write failed: roll the optimistic state back.
    pub fn reject(&mut self, seq: u64) {
        if self.shadow.as_ref().map(|s| s.seq) == Some(seq) {
            self.shadow = None;
        }
    }

    // Authoritative snapshot from the feed. A confirmed shadow is retired
    // once the snapshot reflects it; an unconfirmed one stays overlaid.
    pub fn apply_snapshot(&mut self, votes: Vec<Vote>) {
        if let Some(shadow) = &self.shadow {
            if shadow.confirmed
                && votes
                    .iter()
                    .any(|v| v.user_id == shadow.vote.user_id && v.cast_at >= shadow.vote.cast_at)
            {
                self.shadow = None;
            }
        }
        self.votes = votes;
    }

    pub fn votes(&self) -> Vec<Vote> {
        match &self.shadow {
            None => self.votes.clone(),
            Some(shadow) => {
                let mut votes: Vec<Vote> = self
                    .votes
                    .iter()
                    .filter(|v| v.user_id != shadow.vote.user_id)
                    .cloned()
                    .collect();
                votes.push(shadow.vote.clone());
                votes
            }
        }
    }

    pub fn tally(&self) -> Tally {
        tally_votes(&self.options, &self.votes())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Duration;

    fn poll() -> Poll {
        Poll {
            id: "p1".into(),
            question: "Resurface Main St?".into(),
            options: vec!["Yes".into(), "No".into()],
            created_by: "clerk".into(),
            created_at: Utc::now(),
        }
    }

    fn server_vote(user_id: &str, option_index: i32, cast_at: DateTime<Utc>) -> Vote {
        Vote {
            id: format!("srv-{}", user_id),
            poll_id: "p1".into(),
            user_id: user_id.to_string(),
            option_index,
            cast_at,
            version: 1,
        }
    }

    #[test]
    fn test_staged_vote_shows_in_tally_immediately() {
        let mut live = LivePoll::new(&poll());
        live.stage("u1", 0, Utc::now());
        let tally = live.tally();
        assert_eq!(tally.total_votes, 1);
        assert_eq!(tally.options[0].votes, 1);
    }

    #[test]
    fn test_reject_rolls_the_shadow_back() {
        let mut live = LivePoll::new(&poll());
        let now = Utc::now();
        live.apply_snapshot(vec![server_vote("u1", 1, now)]);
        let seq = live.stage("u1", 0, now);
        assert_eq!(live.tally().options[0].votes, 1);
        live.reject(seq);
        let tally = live.tally();
        assert_eq!(tally.options[0].votes, 0);
        assert_eq!(tally.options[1].votes, 1);
    }

    #[test]
    fn test_stale_confirm_does_not_clobber_newer_intent() {
        let mut live = LivePoll::new(&poll());
        let now = Utc::now();
        let first = live.stage("u1", 0, now);
        let _second = live.stage("u1", 1, now + Duration::seconds(1));
        live.confirm(first, server_vote("u1", 0, now));
        let tally = live.tally();
        assert_eq!(tally.options[1].votes, 1, "newer intent must win");
        assert_eq!(tally.options[0].votes, 0);
    }

    #[test]
    fn test_stale_reject_is_ignored_too() {
        let mut live = LivePoll::new(&poll());
        let now = Utc::now();
        let first = live.stage("u1", 0, now);
        live.stage("u1", 1, now + Duration::seconds(1));
        live.reject(first);
        assert_eq!(live.tally().options[1].votes, 1);
    }

    #[test]
    fn test_confirmed_shadow_is_retired_by_reflecting_snapshot() {
        let mut live = LivePoll::new(&poll());
        let now = Utc::now();
        let seq = live.stage("u1", 0, now);
        let stored = server_vote("u1", 0, now + Duration::seconds(1));
        live.confirm(seq, stored.clone());
        // a stale snapshot from before the write keeps the overlay
        live.apply_snapshot(vec![server_vote("u1", 1, now - Duration::seconds(5))]);
        assert_eq!(live.tally().options[0].votes, 1);
        // the snapshot that reflects the write retires the shadow
        live.apply_snapshot(vec![stored]);
        assert_eq!(live.tally().options[0].votes, 1);
        assert_eq!(live.votes().len(), 1);
        assert_eq!(live.votes()[0].id, "srv-u1");
    }

    #[test]
    fn test_overlay_replaces_only_the_callers_vote() {
        let mut live = LivePoll::new(&poll());
        let now = Utc::now();
        live.apply_snapshot(vec![server_vote("u1", 0, now), server_vote("u2", 1, now)]);
        live.stage("u1", 1, now + Duration::seconds(1));
        let tally = live.tally();
        assert_eq!(tally.total_votes, 2);
        assert_eq!(tally.options[0].votes, 0);
        assert_eq!(tally.options[1].votes, 2);
    }
}
