#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use media_ingest_backend::api::error::AppError;
use media_ingest_backend::config::UploadConfig;
use media_ingest_backend::entities::videos;
use media_ingest_backend::infrastructure::database;
use media_ingest_backend::services::media::{AspectClass, MediaIntrospector, MediaNormalizer};
use media_ingest_backend::services::publisher::ObjectPublisher;
use media_ingest_backend::services::records::{AssetRecordUpdater, SeaOrmAssetStore};
use media_ingest_backend::services::staging::StagingStore;
use media_ingest_backend::services::storage::StorageService;
use media_ingest_backend::services::upload_service::UploadService;
use media_ingest_backend::utils::auth::create_jwt;
use media_ingest_backend::{AppState, create_app};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use uuid::Uuid;

pub const SECRET: &str = "integration-secret";
pub const BASE_URL: &str = "https://cdn.test/media";
pub const BOUNDARY: &str = "---------------------------974767299852498929531610575";

pub const JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00,
    0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xD9,
];
pub const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
    b'R',
];
pub const MP4: &[u8] = &[
    0x00, 0x00, 0x00, 0x20, b'f', b't', b'y', b'p', b'i', b's', b'o', b'm', 0x00, 0x00, 0x02,
    0x00, b'i', b's', b'o', b'm', b'i', b's', b'o', b'2', b'a', b'v', b'c', b'1', b'm', b'p',
    b'4', b'1', 0x00, 0x00, 0x00, 0x08, b'f', b'r', b'e', b'e',
];

/// In-memory object store that records every put
pub struct MockStorageService {
    pub files: Mutex<HashMap<String, (Vec<u8>, String)>>,
    pub puts: AtomicUsize,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.files.lock().unwrap().get(key).map(|(_, ct)| ct.clone())
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> anyhow::Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let data = tokio::fs::read(path).await?;
        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn get_file(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| anyhow::anyhow!("Key not found"))
    }

    async fn file_exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(key))
    }
}

/// Object store that is always down
pub struct UnavailableStorage;

#[async_trait]
impl StorageService for UnavailableStorage {
    async fn put_file(&self, _key: &str, _path: &Path, _content_type: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("connection refused"))
    }

    async fn get_file(&self, _key: &str) -> anyhow::Result<Vec<u8>> {
        Err(anyhow::anyhow!("connection refused"))
    }

    async fn file_exists(&self, _key: &str) -> anyhow::Result<bool> {
        Err(anyhow::anyhow!("connection refused"))
    }
}

pub struct FixedAspect(pub AspectClass);

#[async_trait]
impl MediaIntrospector for FixedAspect {
    async fn inspect(&self, _path: &Path) -> Result<AspectClass, AppError> {
        Ok(self.0)
    }
}

pub struct BrokenProbe;

#[async_trait]
impl MediaIntrospector for BrokenProbe {
    async fn inspect(&self, path: &Path) -> Result<AspectClass, AppError> {
        Err(AppError::AnalysisFailure(format!(
            "no video stream in {}",
            path.display()
        )))
    }
}

/// Stands in for the remux by copying input to output
pub struct CopyNormalizer;

#[async_trait]
impl MediaNormalizer for CopyNormalizer {
    async fn normalize(&self, input: &Path, output: &Path) -> Result<(), AppError> {
        tokio::fs::copy(input, output)
            .await
            .map_err(|e| AppError::IoFailure(e.to_string()))?;
        Ok(())
    }
}

/// Behaves like ffmpeg exiting non-zero
pub struct FailingNormalizer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl MediaNormalizer for FailingNormalizer {
    async fn normalize(&self, _input: &Path, _output: &Path) -> Result<(), AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AppError::TranscodeFailure(
            "ffmpeg exited with status 1: moov atom not found".to_string(),
        ))
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
    pub scratch: TempDir,
    pub owner: Uuid,
    pub video_id: Uuid,
    pub token: String,
}

impl TestApp {
    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }
}

pub fn test_config(scratch: PathBuf) -> UploadConfig {
    UploadConfig {
        max_thumbnail_size: 16 * 1024,
        max_video_size: 64 * 1024,
        jwt_secret: SECRET.to_string(),
        scratch_dir: Some(scratch),
        public_base_url: BASE_URL.to_string(),
        ..UploadConfig::development()
    }
}

pub fn token_for(user: Uuid) -> String {
    create_jwt(&user.to_string(), SECRET, chrono::Duration::hours(1)).unwrap()
}

pub async fn insert_video(db: &DatabaseConnection, owner: Uuid) -> Uuid {
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

pub async fn setup(
    storage: Arc<dyn StorageService>,
    introspector: Arc<dyn MediaIntrospector>,
    normalizer: Arc<dyn MediaNormalizer>,
) -> TestApp {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();

    let scratch = TempDir::new().unwrap();
    let config = test_config(scratch.path().to_path_buf());

    let upload_service = UploadService::new(
        AssetRecordUpdater::new(Arc::new(SeaOrmAssetStore::new(db.clone()))),
        ObjectPublisher::new(storage.clone(), config.public_base_url.clone()),
        StagingStore::new(config.scratch_dir.clone()),
        introspector,
        normalizer,
        config.clone(),
    );

    let state = AppState {
        db: db.clone(),
        storage,
        upload_service: Arc::new(upload_service),
        config,
    };

    let owner = Uuid::new_v4();
    let video_id = insert_video(&db, owner).await;

    TestApp {
        app: create_app(state),
        db,
        scratch,
        owner,
        video_id,
        token: token_for(owner),
    }
}

pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
