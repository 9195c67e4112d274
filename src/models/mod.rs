use crate::entities::videos;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A user-owned media item. Reference URLs stay `None` until a publish for
/// that field has fully succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssetRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<videos::Model> for AssetRecord {
    fn from(m: videos::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            title: m.title,
            description: m.description,
            thumbnail_url: m.thumbnail_url,
            video_url: m.video_url,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
