use chrono::Utc;
use futures::StreamExt;

use crate::actix_web::{
    web::{Data, Json, Path},
    HttpResponse,
};
use crate::bytes::Bytes;
use crate::context::UserInfo;
use crate::core::models::vote::{Tally, Vote, VoteCast, VoteState};
use crate::core::services::poll::poll_detail;
use crate::core::services::vote as vote_service;
use crate::database::sqlx::PgStoreManager;
use crate::error::Error;
use crate::serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CastResponse {
    vote: Vote,
    remaining_secs: i64,
}

pub async fn cast(user_info: UserInfo, poll_id: Path<(String,)>, Json(body): Json<VoteCast>, manager: Data<PgStoreManager>) -> Result<Json<CastResponse>, Error> {
    let poll_id = poll_id.into_inner().0;
    let mut storer = manager.acquire().await?;
    let vote = vote_service::cast_or_change_vote(&mut storer, &poll_id, &user_info.id, body.option_index).await?;
    let remaining_secs = vote_service::remaining_change_window(vote.cast_at, Utc::now())
        .map(|d| d.num_seconds())
        .unwrap_or(0);
    Ok(Json(CastResponse { vote, remaining_secs }))
}

pub async fn my_vote(user_info: UserInfo, poll_id: Path<(String,)>, manager: Data<PgStoreManager>) -> Result<Json<VoteState>, Error> {
    let mut storer = manager.acquire().await?;
    let state = vote_service::my_vote(&mut storer, &poll_id.into_inner().0, &user_info.id).await?;
    Ok(Json(state))
}

pub async fn tally(_user_info: UserInfo, poll_id: Path<(String,)>, manager: Data<PgStoreManager>) -> Result<Json<Tally>, Error> {
    let mut storer = manager.acquire().await?;
    let tally = vote_service::tally(&mut storer, &poll_id.into_inner().0).await?;
    Ok(Json(tally))
}

fn sse_frame(tally: &Tally) -> Result<Bytes, Error> {
    let data = serde_json::to_string(tally)?;
    Ok(Bytes::from(format!("data: {}\n\n", data)))
}

// One frame with the current tally on connect, then one per vote change.
// Dropping the response stream drops the subscription with it.
pub async fn live(_user_info: UserInfo, poll_id: Path<(String,)>, manager: Data<PgStoreManager>) -> Result<HttpResponse, Error> {
    let poll_id = poll_id.into_inner().0;
    let mut storer = manager.acquire().await?;
    let poll = poll_detail(&mut storer, &poll_id).await?;
    let sub = vote_service::subscribe_to_votes(&mut storer, &poll_id).await?;
    let first = vote_service::tally(&mut storer, &poll_id).await?;
    // the stream only needs the feed, not the connection
    drop(storer);
    let first = sse_frame(&first)?;
    let updates = futures::stream::unfold((sub, poll.options), |(mut sub, options)| async move {
        let votes = sub.recv().await?;
        let frame = sse_frame(&vote_service::tally_votes(&options, &votes)).ok()?;
        Some((Ok::<Bytes, Error>(frame), (sub, options)))
    });
    let stream = futures::stream::once(futures::future::ready(Ok::<Bytes, Error>(first))).chain(updates);
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream))
}
