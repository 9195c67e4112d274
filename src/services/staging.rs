use crate::api::error::AppError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

const STAGE_PREFIX: &str = "media-stage-";
const COPY_BUFFER: usize = 64 * 1024;

/// Scratch area for uploads that need random access or several passes.
///
/// Every file is created through `tempfile`, so names are unique across
/// concurrent runs and each `StagedFile` deletes itself when dropped.
#[derive(Debug, Clone, Default)]
pub struct StagingStore {
    dir: Option<PathBuf>,
}

/// Exclusively owned scratch file. Removed from disk on `release` or drop,
/// whichever comes first.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    size: u64,
}

impl StagingStore {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    fn create(&self, suffix: &str) -> std::io::Result<tempfile::NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(STAGE_PREFIX).suffix(suffix);
        match &self.dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }

    /// Create an empty staged file for an external tool to write into
    pub fn reserve(&self, suffix: &str) -> Result<StagedFile, AppError> {
        let file = self
            .create(suffix)
            .map_err(|e| AppError::IoFailure(format!("Failed to create scratch file: {}", e)))?;
        Ok(StagedFile {
            path: file.into_temp_path(),
            size: 0,
        })
    }

    /// Copy `reader` to a new staged file, failing with `PayloadTooLarge` as
    /// soon as more than `limit` bytes arrive. A partial file never outlives
    /// the error.
    pub async fn stage<R>(&self, mut reader: R, limit: u64, suffix: &str) -> Result<StagedFile, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let (file, path) = self
            .create(suffix)
            .map_err(|e| AppError::IoFailure(format!("Failed to create scratch file: {}", e)))?
            .into_parts();
        let mut out = tokio::fs::File::from_std(file);

        let mut buffer = vec![0u8; COPY_BUFFER];
        let mut total: u64 = 0;

        loop {
            let n = reader.read(&mut buffer).await.map_err(map_read_error)?;
            if n == 0 {
                break;
            }
            total += n as u64;
            if total > limit {
                return Err(AppError::PayloadTooLarge(format!(
                    "upload exceeded {} bytes while staging",
                    limit
                )));
            }
            out.write_all(&buffer[..n])
                .await
                .map_err(|e| AppError::IoFailure(format!("Scratch write failed: {}", e)))?;
        }

        out.flush()
            .await
            .map_err(|e| AppError::IoFailure(format!("Scratch flush failed: {}", e)))?;

        tracing::debug!("Staged {} bytes at {}", total, path.display());

        Ok(StagedFile { path, size: total })
    }
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Re-read the size from disk after an external tool wrote the file
    pub async fn refresh_size(&mut self) -> Result<u64, AppError> {
        let meta = tokio::fs::metadata(&*self.path)
            .await
            .map_err(|e| AppError::IoFailure(format!("Failed to stat staged file: {}", e)))?;
        self.size = meta.len();
        Ok(self.size)
    }

    /// Delete the scratch file now. A file that is already gone counts as released.
    pub fn release(self) -> Result<(), AppError> {
        match self.path.close() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::IoFailure(format!(
                "Failed to release staged file: {}",
                e
            ))),
        }
    }
}

pub(crate) fn map_read_error(e: std::io::Error) -> AppError {
    if e.kind() == ErrorKind::FileTooLarge {
        AppError::PayloadTooLarge(e.to_string())
    } else {
        AppError::IoFailure(format!("Upload stream interrupted: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_stage_and_release() {
        let scratch = TempDir::new().unwrap();
        let store = StagingStore::new(Some(scratch.path().to_path_buf()));

        let data = vec![42u8; 200_000];
        let staged = store.stage(data.as_slice(), 1 << 20, ".bin").await.unwrap();
        assert_eq!(staged.size(), 200_000);
        assert!(staged.path().starts_with(scratch.path()));

        let reread = tokio::fs::read(staged.path()).await.unwrap();
        assert_eq!(reread, data);

        assert_eq!(entries(scratch.path()), 1);
        staged.release().unwrap();
        assert_eq!(entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_drop_releases() {
        let scratch = TempDir::new().unwrap();
        let store = StagingStore::new(Some(scratch.path().to_path_buf()));
        {
            let _a = store.stage(&b"abc"[..], 10, "").await.unwrap();
            let _b = store.reserve(".mp4").unwrap();
            assert_eq!(entries(scratch.path()), 2);
        }
        assert_eq!(entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_oversize_leaves_nothing_behind() {
        let scratch = TempDir::new().unwrap();
        let store = StagingStore::new(Some(scratch.path().to_path_buf()));

        let data = vec![0u8; 4096];
        let err = store.stage(data.as_slice(), 1024, "").await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert_eq!(entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_exact_limit_accepted() {
        let scratch = TempDir::new().unwrap();
        let store = StagingStore::new(Some(scratch.path().to_path_buf()));
        let staged = store.stage(&[1u8; 1024][..], 1024, "").await.unwrap();
        assert_eq!(staged.size(), 1024);
    }

    #[tokio::test]
    async fn test_interrupted_stream_leaves_nothing_behind() {
        let scratch = TempDir::new().unwrap();
        let store = StagingStore::new(Some(scratch.path().to_path_buf()));

        let reader = tokio_test_reader(b"partial", ErrorKind::ConnectionReset);
        let err = store.stage(reader, 1 << 20, "").await.unwrap_err();
        assert!(matches!(err, AppError::IoFailure(_)));
        assert_eq!(entries(scratch.path()), 0);

        let reader = tokio_test_reader(b"partial", ErrorKind::FileTooLarge);
        let err = store.stage(reader, 1 << 20, "").await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert_eq!(entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_release_is_idempotent_for_missing_file() {
        let scratch = TempDir::new().unwrap();
        let store = StagingStore::new(Some(scratch.path().to_path_buf()));
        let staged = store.reserve("").unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        assert!(staged.release().is_ok());
    }

    // Yields `data` then fails with `kind`, like a client that disconnects mid-body
    fn tokio_test_reader(
        data: &'static [u8],
        kind: ErrorKind,
    ) -> impl AsyncRead + Unpin + Send {
        let chunks: Vec<std::io::Result<bytes::Bytes>> = vec![
            Ok(bytes::Bytes::from_static(data)),
            Err(std::io::Error::new(kind, "stream failed")),
        ];
        tokio_util::io::StreamReader::new(futures::stream::iter(chunks))
    }
}
