use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::core::feed::{FeedHub, VoteSubscription};
use crate::core::models::{
    common::Pagination,
    poll::{Insert as PollInsert, Poll, Query as PollQuery},
    vote::{Insert as VoteInsert, Update as VoteUpdate, Vote},
};
use crate::core::ports::repository::{PollCommon, Store, VoteCommon, VoteFeedCommon};
use crate::error::Error;

// In-memory store with the same duplicate-pair and version semantics as the
// Postgres port. Clones share state, so one store can be handed to several
// concurrent callers.
#[derive(Clone)]
pub struct MemStore {
    inner: Arc<Mutex<Inner>>,
    hub: Arc<FeedHub>,
}

#[derive(Default)]
struct Inner {
    polls: Vec<Poll>,
    votes: HashMap<(String, String), Vote>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            hub: Arc::new(FeedHub::new()),
        }
    }

    fn poll_votes(inner: &Inner, poll_id: &str) -> Vec<Vote> {
        let mut votes: Vec<Vote> = inner.votes.values().filter(|v| v.poll_id == poll_id).cloned().collect();
        votes.sort_by(|a, b| a.cast_at.cmp(&b.cast_at));
        votes
    }

    fn publish(&self, poll_id: &str) {
        let votes = {
            let inner = self.inner.lock().unwrap();
            Self::poll_votes(&inner, poll_id)
        };
        self.hub.publish(poll_id, votes);
    }

    fn matches(poll: &Poll, query: &PollQuery) -> bool {
        if let Some(created_by) = &query.created_by_eq {
            if &poll.created_by != created_by {
                return false;
            }
        }
        if let Some(needle) = &query.question_like {
            if !poll.question.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PollCommon for MemStore {
    async fn insert(&mut self, data: PollInsert) -> Result<String, Error> {
        let mut inner = self.inner.lock().unwrap();
        let poll = Poll {
            id: Uuid::new_v4().to_string(),
            question: data.question,
            options: data.options,
            created_by: data.created_by,
            created_at: Utc::now(),
        };
        let id = poll.id.clone();
        inner.polls.push(poll);
        Ok(id)
    }

    async fn get(&mut self, id: &str) -> Result<Option<Poll>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.polls.iter().find(|p| p.id == id).cloned())
    }

    async fn query(&mut self, query: &PollQuery, pagination: Option<Pagination>) -> Result<Vec<Poll>, Error> {
        let inner = self.inner.lock().unwrap();
        let matched = inner.polls.iter().filter(|p| Self::matches(p, query)).cloned();
        let polls = match pagination {
            Some(p) => matched.skip(p.offset() as usize).take(p.limit() as usize).collect(),
            None => matched.collect(),
        };
        Ok(polls)
    }

    async fn count(&mut self, query: &PollQuery) -> Result<i64, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.polls.iter().filter(|p| Self::matches(p, query)).count() as i64)
    }
}

impl VoteCommon for MemStore {
    async fn insert(&mut self, data: VoteInsert) -> Result<Vote, Error> {
        let vote = {
            let mut inner = self.inner.lock().unwrap();
            let key = (data.poll_id.clone(), data.user_id.clone());
            if inner.votes.contains_key(&key) {
                return Err(Error::DuplicateVote);
            }
            let vote = Vote {
                id: Uuid::new_v4().to_string(),
                poll_id: data.poll_id,
                user_id: data.user_id,
                option_index: data.option_index,
                cast_at: data.cast_at,
                version: 1,
            };
            inner.votes.insert(key, vote.clone());
            vote
        };
        self.publish(&vote.poll_id);
        Ok(vote)
    }

    async fn update(&mut self, id: &str, update: VoteUpdate) -> Result<Vote, Error> {
        let vote = {
            let mut inner = self.inner.lock().unwrap();
            let vote = inner
                .votes
                .values_mut()
                .find(|v| v.id == id)
                .ok_or(Error::Conflict)?;
            if vote.version != update.expected_version {
                return Err(Error::Conflict);
            }
            vote.option_index = update.option_index;
            vote.cast_at = update.cast_at;
            vote.version += 1;
            vote.clone()
        };
        self.publish(&vote.poll_id);
        Ok(vote)
    }

    async fn get_for_user(&mut self, poll_id: &str, user_id: &str) -> Result<Option<Vote>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.votes.get(&(poll_id.to_string(), user_id.to_string())).cloned())
    }

    async fn query_for_poll(&mut self, poll_id: &str) -> Result<Vec<Vote>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(Self::poll_votes(&inner, poll_id))
    }
}

impl VoteFeedCommon for MemStore {
    async fn subscribe(&mut self, poll_id: &str) -> Result<VoteSubscription, Error> {
        Ok(self.hub.subscribe(poll_id))
    }
}

impl Store for MemStore {}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Duration;

    fn vote_insert(poll_id: &str, user_id: &str, option_index: i32) -> VoteInsert {
        VoteInsert {
            poll_id: poll_id.into(),
            user_id: user_id.into(),
            option_index,
            cast_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_pair_is_rejected() {
        let mut storer = MemStore::new();
        VoteCommon::insert(&mut storer, vote_insert("p1", "u1", 0)).await.unwrap();
        assert!(matches!(
            VoteCommon::insert(&mut storer, vote_insert("p1", "u1", 1)).await,
            Err(Error::DuplicateVote)
        ));
        // same user, different poll is fine
        VoteCommon::insert(&mut storer, vote_insert("p2", "u1", 0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_is_guarded_by_version() {
        let mut storer = MemStore::new();
        let vote = VoteCommon::insert(&mut storer, vote_insert("p1", "u1", 0)).await.unwrap();
        let update = VoteUpdate {
            option_index: 1,
            cast_at: vote.cast_at + Duration::seconds(1),
            expected_version: vote.version,
        };
        let updated = VoteCommon::update(&mut storer, &vote.id, update.clone()).await.unwrap();
        assert_eq!(updated.version, 2);
        // replaying the same guarded update loses
        assert!(matches!(
            VoteCommon::update(&mut storer, &vote.id, update).await,
            Err(Error::Conflict)
        ));
        let stored = VoteCommon::get_for_user(&mut storer, "p1", "u1").await.unwrap().unwrap();
        assert_eq!(stored.option_index, 1);
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_update_of_unknown_vote_conflicts() {
        let mut storer = MemStore::new();
        let update = VoteUpdate {
            option_index: 0,
            cast_at: Utc::now(),
            expected_version: 1,
        };
        assert!(matches!(
            VoteCommon::update(&mut storer, "missing", update).await,
            Err(Error::Conflict)
        ));
    }

    #[tokio::test]
    async fn test_votes_are_listed_per_poll_in_cast_order() {
        let mut storer = MemStore::new();
        let first = VoteCommon::insert(&mut storer, vote_insert("p1", "u1", 0)).await.unwrap();
        VoteCommon::insert(&mut storer, vote_insert("p2", "u1", 0)).await.unwrap();
        let second = VoteInsert {
            cast_at: first.cast_at + Duration::seconds(5),
            ..vote_insert("p1", "u2", 1)
        };
        VoteCommon::insert(&mut storer, second).await.unwrap();
        let votes = VoteCommon::query_for_poll(&mut storer, "p1").await.unwrap();
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].user_id, "u1");
        assert_eq!(votes[1].user_id, "u2");
    }
}
