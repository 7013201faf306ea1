use itertools::Itertools;

use crate::core::models::{
    common::Pagination,
    poll::{Insert as PollInsert, Poll, PollCreate, Query as PollQuery},
};
use crate::core::ports::repository::{PollCommon, Store};
use crate::error::Error;

pub async fn create_poll<S>(storer: &mut S, uid: &str, poll: PollCreate) -> Result<String, Error>
where
    S: Store,
{
    let question = poll.question.trim().to_string();
    if question.is_empty() {
        return Err(Error::BusinessError("poll question must not be empty".into()));
    }
    let options: Vec<String> = poll.options.iter().map(|o| o.trim().to_string()).collect();
    if options.len() < 2 {
        return Err(Error::BusinessError("poll needs at least two options".into()));
    }
    if options.iter().any(|o| o.is_empty()) {
        return Err(Error::BusinessError("poll options must not be empty".into()));
    }
    if !options.iter().all_unique() {
        return Err(Error::BusinessError("poll options must be distinct".into()));
    }
    let id = PollCommon::insert(
        storer,
        PollInsert {
            question,
            options,
            created_by: uid.to_string(),
        },
    )
    .await?;
    Ok(id)
}

pub async fn poll_detail<S>(storer: &mut S, id: &str) -> Result<Poll, Error>
where
    S: Store,
{
    PollCommon::get(storer, id)
        .await?
        .ok_or_else(|| Error::PollNotFound(id.to_string()))
}

pub async fn poll_list<S>(storer: &mut S, query: PollQuery, page: i64, size: i64) -> Result<(Vec<Poll>, i64), Error>
where
    S: Store,
{
    let total = PollCommon::count(storer, &query).await?;
    let polls = PollCommon::query(storer, &query, Some(Pagination::new(size, Some((page - 1) * size)))).await?;
    Ok((polls, total))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::impls::store::memory::MemStore;

    fn creation(question: &str, options: Vec<&str>) -> PollCreate {
        PollCreate {
            question: question.into(),
            options: options.into_iter().map(String::from).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_poll_trims_and_stores() {
        let mut storer = MemStore::new();
        let id = create_poll(&mut storer, "u1", creation("  New park?  ", vec![" Yes ", "No"]))
            .await
            .unwrap();
        let poll = poll_detail(&mut storer, &id).await.unwrap();
        assert_eq!(poll.question, "New park?");
        assert_eq!(poll.options, vec!["Yes".to_string(), "No".to_string()]);
        assert_eq!(poll.created_by, "u1");
    }

    #[tokio::test]
    async fn test_create_poll_validation() {
        let mut storer = MemStore::new();
        assert!(matches!(
            create_poll(&mut storer, "u1", creation("   ", vec!["A", "B"])).await,
            Err(Error::BusinessError(_))
        ));
        assert!(matches!(
            create_poll(&mut storer, "u1", creation("Q", vec!["only one"])).await,
            Err(Error::BusinessError(_))
        ));
        assert!(matches!(
            create_poll(&mut storer, "u1", creation("Q", vec!["A", "  "])).await,
            Err(Error::BusinessError(_))
        ));
        assert!(matches!(
            create_poll(&mut storer, "u1", creation("Q", vec!["A", "A"])).await,
            Err(Error::BusinessError(_))
        ));
    }

    #[tokio::test]
    async fn test_poll_list_pagination() {
        let mut storer = MemStore::new();
        for i in 0..5 {
            create_poll(&mut storer, "u1", creation(&format!("Q{}", i), vec!["A", "B"]))
                .await
                .unwrap();
        }
        let (page, total) = poll_list(&mut storer, PollQuery { ..default::default() }, 1, 3).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 3);
        let (page, total) = poll_list(&mut storer, PollQuery { ..default::default() }, 2, 3).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
    }
}
