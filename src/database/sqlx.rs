use std::sync::Arc;

use chrono::Utc;
use sqlx::pool::PoolConnection;
use sqlx::{query, query_as, query_scalar, Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::feed::{FeedHub, VoteSubscription};
use crate::core::models::{
    common::Pagination,
    poll::{Insert as PollInsert, Poll, Query as PollQuery},
    vote::{Insert as VoteInsert, Update as VoteUpdate, Vote},
};
use crate::core::ports::repository::{PollCommon, Store, VoteCommon, VoteFeedCommon};
use crate::error::Error;

pub struct PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    executor: E,
    hub: Arc<FeedHub>,
}

impl<E> PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    pub fn new(executor: E, hub: Arc<FeedHub>) -> Self {
        Self { executor, hub }
    }

    async fn publish(&mut self, poll_id: &str) -> Result<(), Error> {
        let votes = VoteCommon::query_for_poll(self, poll_id).await?;
        self.hub.publish(poll_id, votes);
        Ok(())
    }
}

impl<E> PollCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: PollInsert) -> Result<String, Error> {
        let id = Uuid::new_v4().to_string();
        query("INSERT INTO polls (id, question, options, created_by, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(&id)
            .bind(data.question)
            .bind(data.options)
            .bind(data.created_by)
            .bind(Utc::now())
            .execute(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn get(&mut self, id: &str) -> Result<Option<Poll>, Error> {
        let poll = query_as("SELECT * FROM polls WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(poll)
    }

    async fn query(&mut self, query: &PollQuery, pagination: Option<Pagination>) -> Result<Vec<Poll>, Error> {
        let mut stmt = QueryBuilder::new("SELECT * FROM polls WHERE 1 = 1");
        if let Some(created_by) = &query.created_by_eq {
            stmt.push(" AND created_by = ").push_bind(created_by.clone());
        }
        if let Some(needle) = &query.question_like {
            stmt.push(" AND question LIKE ").push_bind(format!("%{}%", needle));
        }
        stmt.push(" ORDER BY created_at DESC");
        if let Some(pagination) = pagination {
            stmt.push(" ").push(pagination.to_sql_clause());
        }
        let polls = stmt.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(polls)
    }

    async fn count(&mut self, query: &PollQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(id) FROM polls WHERE 1 = 1");
        if let Some(created_by) = &query.created_by_eq {
            stmt.push(" AND created_by = ").push_bind(created_by.clone());
        }
        if let Some(needle) = &query.question_like {
            stmt.push(" AND question LIKE ").push_bind(format!("%{}%", needle));
        }
        let (n,) = stmt.build_query_as().fetch_one(&mut self.executor).await?;
        Ok(n)
    }
}

impl<E> VoteCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: VoteInsert) -> Result<Vote, Error> {
        // the unique (poll_id, user_id) index arbitrates concurrent creates
        let inserted: Option<String> = query_scalar(
            "INSERT INTO votes (id, poll_id, user_id, option_index, cast_at, version)
             VALUES ($1, $2, $3, $4, $5, 1)
             ON CONFLICT (poll_id, user_id) DO NOTHING
             RETURNING id",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&data.poll_id)
        .bind(&data.user_id)
        .bind(data.option_index)
        .bind(data.cast_at)
        .fetch_optional(&mut self.executor)
        .await?;
        let id = inserted.ok_or(Error::DuplicateVote)?;
        let vote = Vote {
            id,
            poll_id: data.poll_id,
            user_id: data.user_id,
            option_index: data.option_index,
            cast_at: data.cast_at,
            version: 1,
        };
        self.publish(&vote.poll_id).await?;
        Ok(vote)
    }

    async fn update(&mut self, id: &str, update: VoteUpdate) -> Result<Vote, Error> {
        let res = query("UPDATE votes SET option_index = $1, cast_at = $2, version = version + 1 WHERE id = $3 AND version = $4")
            .bind(update.option_index)
            .bind(update.cast_at)
            .bind(id)
            .bind(update.expected_version)
            .execute(&mut self.executor)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::Conflict);
        }
        let vote: Vote = query_as("SELECT * FROM votes WHERE id = $1")
            .bind(id)
            .fetch_one(&mut self.executor)
            .await?;
        self.publish(&vote.poll_id).await?;
        Ok(vote)
    }

    async fn get_for_user(&mut self, poll_id: &str, user_id: &str) -> Result<Option<Vote>, Error> {
        let vote = query_as("SELECT * FROM votes WHERE poll_id = $1 AND user_id = $2")
            .bind(poll_id)
            .bind(user_id)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(vote)
    }

    async fn query_for_poll(&mut self, poll_id: &str) -> Result<Vec<Vote>, Error> {
        let votes = query_as("SELECT * FROM votes WHERE poll_id = $1 ORDER BY cast_at")
            .bind(poll_id)
            .fetch_all(&mut self.executor)
            .await?;
        Ok(votes)
    }
}

impl<E> VoteFeedCommon for PgStore<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn subscribe(&mut self, poll_id: &str) -> Result<VoteSubscription, Error> {
        Ok(self.hub.subscribe(poll_id))
    }
}

impl<E> Store for PgStore<E> where for<'e> &'e mut E: Executor<'e, Database = Postgres> {}

pub struct PgStoreManager {
    pool: PgPool,
    hub: Arc<FeedHub>,
}

impl PgStoreManager {
    pub fn new(pool: PgPool, hub: Arc<FeedHub>) -> Self {
        Self { pool, hub }
    }

    pub async fn acquire(&self) -> Result<PgStore<PoolConnection<Postgres>>, Error> {
        let conn = self.pool.acquire().await?;
        Ok(PgStore::new(conn, self.hub.clone()))
    }
}
