use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Consultant {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
