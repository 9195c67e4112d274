use crate::api::error::AppError;
use crate::entities::{prelude::*, videos};
use crate::models::AssetRecord;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Unchanged, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

/// Key-value access to asset records, keyed by asset id
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<AssetRecord>>;
    async fn update(&self, record: &AssetRecord) -> Result<()>;
}

pub struct SeaOrmAssetStore {
    db: DatabaseConnection,
}

impl SeaOrmAssetStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AssetStore for SeaOrmAssetStore {
    async fn get(&self, id: Uuid) -> Result<Option<AssetRecord>> {
        let model = Videos::find_by_id(id).one(&self.db).await?;
        Ok(model.map(AssetRecord::from))
    }

    async fn update(&self, record: &AssetRecord) -> Result<()> {
        let active = videos::ActiveModel {
            id: Unchanged(record.id),
            user_id: Set(record.user_id),
            title: Set(record.title.clone()),
            description: Set(record.description.clone()),
            thumbnail_url: Set(record.thumbnail_url.clone()),
            video_url: Set(record.video_url.clone()),
            created_at: Unchanged(record.created_at),
            updated_at: Set(record.updated_at),
        };
        active.update(&self.db).await?;
        Ok(())
    }
}

/// Which reference URL on the record a run sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceField {
    Thumbnail,
    Video,
}

pub struct AssetRecordUpdater {
    store: Arc<dyn AssetStore>,
}

impl AssetRecordUpdater {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self, id: Uuid) -> Result<AssetRecord, AppError> {
        self.store
            .get(id)
            .await
            .map_err(|e| AppError::PersistFailure(format!("load {} failed: {:#}", id, e)))?
            .ok_or_else(|| AppError::RecordNotFound(id.to_string()))
    }

    /// Reload the record, set exactly one reference field and persist it.
    /// Concurrent runs on the same record are last-writer-wins.
    pub async fn attach_reference(
        &self,
        id: Uuid,
        field: ReferenceField,
        url: String,
    ) -> Result<AssetRecord, AppError> {
        let mut record = self.load(id).await?;
        match field {
            ReferenceField::Thumbnail => record.thumbnail_url = Some(url),
            ReferenceField::Video => record.video_url = Some(url),
        }
        record.updated_at = Utc::now();

        self.store
            .update(&record)
            .await
            .map_err(|e| AppError::PersistFailure(format!("update {} failed: {:#}", id, e)))?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database;
    use sea_orm::Database;

    async fn setup_store() -> (DatabaseConnection, SeaOrmAssetStore) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        database::run_migrations(&db).await.unwrap();
        (db.clone(), SeaOrmAssetStore::new(db))
    }

    async fn insert_video(db: &DatabaseConnection, owner: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        videos::ActiveModel {
            id: Set(id),
            user_id: Set(owner),
            title: Set("Boots".to_string()),
            description: Set("A video about boots".to_string()),
            thumbnail_url: Set(None),
            video_url: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_attach_sets_only_one_field() {
        let (db, store) = setup_store().await;
        let owner = Uuid::new_v4();
        let id = insert_video(&db, owner).await;

        let updater = AssetRecordUpdater::new(Arc::new(store));
        let record = updater
            .attach_reference(id, ReferenceField::Thumbnail, "http://x/a.jpg".into())
            .await
            .unwrap();

        assert_eq!(record.thumbnail_url.as_deref(), Some("http://x/a.jpg"));
        assert_eq!(record.video_url, None);
        assert_eq!(record.title, "Boots");
        assert_eq!(record.user_id, owner);

        let persisted = updater.load(id).await.unwrap();
        assert_eq!(persisted.thumbnail_url.as_deref(), Some("http://x/a.jpg"));
        assert_eq!(persisted.video_url, None);
    }

    #[tokio::test]
    async fn test_attach_keeps_other_reference() {
        let (db, store) = setup_store().await;
        let id = insert_video(&db, Uuid::new_v4()).await;
        let updater = AssetRecordUpdater::new(Arc::new(store));

        updater
            .attach_reference(id, ReferenceField::Thumbnail, "http://x/t.png".into())
            .await
            .unwrap();
        let record = updater
            .attach_reference(id, ReferenceField::Video, "http://x/landscape/v.mp4".into())
            .await
            .unwrap();

        assert_eq!(record.thumbnail_url.as_deref(), Some("http://x/t.png"));
        assert_eq!(record.video_url.as_deref(), Some("http://x/landscape/v.mp4"));
    }

    #[tokio::test]
    async fn test_unknown_record() {
        let (_db, store) = setup_store().await;
        let updater = AssetRecordUpdater::new(Arc::new(store));
        let err = updater
            .attach_reference(Uuid::new_v4(), ReferenceField::Video, "u".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RecordNotFound(_)));
    }
}
