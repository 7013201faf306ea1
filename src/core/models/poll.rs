use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PollCreate {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub question: String,
    pub options: Vec<String>,
    pub created_by: String,
}

#[derive(Debug, Default)]
pub struct Query {
    pub created_by_eq: Option<String>,
    pub question_like: Option<String>,
}
