use crate::core::feed::VoteSubscription;
use crate::core::models::{
    common::Pagination,
    poll::{Insert as PollInsert, Poll, Query as PollQuery},
    vote::{Insert as VoteInsert, Update as VoteUpdate, Vote},
};
use crate::error::Error;

pub trait PollCommon {
    async fn insert(&mut self, data: PollInsert) -> Result<String, Error>;
    async fn get(&mut self, id: &str) -> Result<Option<Poll>, Error>;
    async fn query(&mut self, query: &PollQuery, pagination: Option<Pagination>) -> Result<Vec<Poll>, Error>;
    async fn count(&mut self, query: &PollQuery) -> Result<i64, Error>;
}

pub trait VoteCommon {
    // insert fails with Error::DuplicateVote when a vote for the same
    // (poll_id, user_id) pair already exists.
    async fn insert(&mut self, data: VoteInsert) -> Result<Vote, Error>;
    // update fails with Error::Conflict unless the stored version still
    // equals expected_version.
    async fn update(&mut self, id: &str, update: VoteUpdate) -> Result<Vote, Error>;
    async fn get_for_user(&mut self, poll_id: &str, user_id: &str) -> Result<Option<Vote>, Error>;
    async fn query_for_poll(&mut self, poll_id: &str) -> Result<Vec<Vote>, Error>;
}

pub trait VoteFeedCommon {
    async fn subscribe(&mut self, poll_id: &str) -> Result<VoteSubscription, Error>;
}

pub trait Store: PollCommon + VoteCommon + VoteFeedCommon {}
