use crate::actix_web::web::{Data, Json, Path, Query};
use crate::context::UserInfo;
use crate::core::models::poll::{Poll, PollCreate, Query as PollQuery};
use crate::core::services::poll::{create_poll, poll_detail, poll_list};
use crate::database::sqlx::PgStoreManager;
use crate::error::Error;
use crate::response::List;
use crate::serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct CreationResponse {
    id: String,
}

pub async fn create(user_info: UserInfo, Json(body): Json<PollCreate>, manager: Data<PgStoreManager>) -> Result<Json<CreationResponse>, Error> {
    let mut storer = manager.acquire().await?;
    let id = create_poll(&mut storer, &user_info.id, body).await?;
    Ok(Json(CreationResponse { id }))
}

#[derive(Debug, Deserialize)]
pub struct ListParam {
    page: i64,
    size: i64,
    q: Option<String>,
}

pub async fn list(_user_info: UserInfo, param: Query<ListParam>, manager: Data<PgStoreManager>) -> Result<Json<List<Poll>>, Error> {
    let mut storer = manager.acquire().await?;
    let (polls, total) = poll_list(
        &mut storer,
        PollQuery {
            question_like: param.q.clone(),
            ..default::default()
        },
        param.page,
        param.size,
    )
    .await?;
    Ok(Json(List::new(polls, total)))
}

pub async fn detail(_user_info: UserInfo, poll_id: Path<(String,)>, manager: Data<PgStoreManager>) -> Result<Json<Poll>, Error> {
    let mut storer = manager.acquire().await?;
    let poll = poll_detail(&mut storer, &poll_id.into_inner().0).await?;
    Ok(Json(poll))
}
