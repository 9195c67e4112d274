use crate::api::error::AppError;
use crate::config::UploadConfig;
use crate::models::AssetRecord;
use crate::services::media::{MediaIntrospector, MediaNormalizer};
use crate::services::publisher::ObjectPublisher;
use crate::services::records::{AssetRecordUpdater, ReferenceField};
use crate::services::sniffer::{self, MediaField};
use crate::services::staging::{self, StagedFile, StagingStore};
use crate::utils::auth::Principal;
use crate::utils::keys::PublishKey;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Progress of a single upload run. Thumbnail runs skip `Introspected`
/// and `Normalized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Received,
    Sniffed,
    Staged,
    Introspected,
    Normalized,
    Published,
    RecordUpdated,
    Done,
    /// Terminal failure, carrying `AppError::kind()`
    Failed(&'static str),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Failed(kind) => write!(f, "Failed({})", kind),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

impl From<MediaField> for ReferenceField {
    fn from(field: MediaField) -> Self {
        match field {
            MediaField::Thumbnail => ReferenceField::Thumbnail,
            MediaField::Video => ReferenceField::Video,
        }
    }
}

struct Run {
    asset_id: Uuid,
    principal: Uuid,
    field: MediaField,
    state: RunState,
}

impl Run {
    fn advance(&mut self, next: RunState) {
        debug!(
            asset_id = %self.asset_id,
            principal = %self.principal,
            field = self.field.form_name(),
            "{} -> {}",
            self.state,
            next
        );
        self.state = next;
    }
}

/// Sequences sniff, stage, optional introspect/remux, publish and record update
/// for one asset. Staged files are released on every exit path.
pub struct UploadService {
    records: AssetRecordUpdater,
    publisher: ObjectPublisher,
    staging: StagingStore,
    introspector: Arc<dyn MediaIntrospector>,
    normalizer: Arc<dyn MediaNormalizer>,
    config: UploadConfig,
}

impl UploadService {
    pub fn new(
        records: AssetRecordUpdater,
        publisher: ObjectPublisher,
        staging: StagingStore,
        introspector: Arc<dyn MediaIntrospector>,
        normalizer: Arc<dyn MediaNormalizer>,
        config: UploadConfig,
    ) -> Self {
        Self {
            records,
            publisher,
            staging,
            introspector,
            normalizer,
            config,
        }
    }

    /// Load the target record and require that `principal` owns it.
    /// Runs before any of the request body is read.
    pub async fn authorize(
        &self,
        asset_id: Uuid,
        principal: &Principal,
    ) -> Result<AssetRecord, AppError> {
        let record = self.records.load(asset_id).await?;
        if record.user_id != principal.id {
            return Err(AppError::AuthFailure(format!(
                "user {} does not own video {}",
                principal.id, asset_id
            )));
        }
        Ok(record)
    }

    /// Run the pipeline for one uploaded stream and return the updated record
    pub async fn ingest<R>(
        &self,
        field: MediaField,
        asset_id: Uuid,
        principal: &Principal,
        reader: R,
    ) -> Result<AssetRecord, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut run = Run {
            asset_id,
            principal: principal.id,
            field,
            state: RunState::Received,
        };

        match self.execute(&mut run, reader).await {
            Ok(record) => {
                run.advance(RunState::Done);
                Ok(record)
            }
            Err(e) => {
                let failed = RunState::Failed(e.kind());
                warn!(
                    asset_id = %asset_id,
                    principal = %principal.id,
                    field = field.form_name(),
                    "{} -> {}",
                    run.state,
                    failed
                );
                Err(e)
            }
        }
    }

    async fn execute<R>(&self, run: &mut Run, mut reader: R) -> Result<AssetRecord, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let field = run.field;

        let header = sniffer::read_header(&mut reader)
            .await
            .map_err(staging::map_read_error)?;
        let sniffed = sniffer::validate(field, &header)?;
        run.advance(RunState::Sniffed);

        let body = Cursor::new(header).chain(reader);
        let staged = self
            .staging
            .stage(
                body,
                field.size_limit(&self.config),
                &format!(".{}", sniffed.extension),
            )
            .await?;
        run.advance(RunState::Staged);

        let (artifact, key) = match field {
            MediaField::Thumbnail => (staged, PublishKey::generate(None, sniffed.extension)),
            MediaField::Video => {
                let aspect = self.introspector.inspect(staged.path()).await?;
                run.advance(RunState::Introspected);

                let mut normalized = self.staging.reserve(".mp4")?;
                self.normalizer
                    .normalize(staged.path(), normalized.path())
                    .await?;
                normalized.refresh_size().await?;
                release(staged);
                run.advance(RunState::Normalized);

                (
                    normalized,
                    PublishKey::generate(Some(aspect.folder()), sniffed.extension),
                )
            }
        };

        let reference = self
            .publisher
            .publish(&artifact, &key, &sniffed.mime_type)
            .await?;
        release(artifact);
        run.advance(RunState::Published);

        info!(
            "Uploading {} {} with name {} by user {}",
            field.form_name(),
            run.asset_id,
            reference.key,
            run.principal
        );

        let record = self
            .records
            .attach_reference(run.asset_id, field.into(), reference.url)
            .await
            .inspect_err(|_| {
                // No compensating delete: the object stays stored but unreferenced
                warn!(
                    asset_id = %run.asset_id,
                    key = %reference.key,
                    "Published object is orphaned after record update failure"
                );
            })?;
        run.advance(RunState::RecordUpdated);

        Ok(record)
    }
}

fn release(file: StagedFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.release() {
        warn!("Failed to release staged file {}: {}", path.display(), e);
    }
}
