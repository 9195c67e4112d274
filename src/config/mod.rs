use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Port the server binds when `--port`/`PORT` is not given
pub const DEFAULT_PORT: u16 = 8091;

/// Which object-store backend receives published assets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "s3" | "minio" => Some(Self::S3),
            "local" | "fs" => Some(Self::Local),
            _ => None,
        }
    }
}

/// Configuration for the upload pipeline
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum thumbnail size in bytes (default: 10 MiB)
    pub max_thumbnail_size: u64,

    /// Maximum video size in bytes (default: 10 GiB)
    pub max_video_size: u64,

    /// JWT Secret Key (Required in production)
    pub jwt_secret: String,

    /// Directory for staged files. `None` uses the OS temp dir.
    pub scratch_dir: Option<PathBuf>,

    pub ffmpeg_path: String,
    pub ffprobe_path: String,

    /// Wall-clock budget for a single ffprobe/ffmpeg run (default: 600s)
    pub tool_timeout_secs: u64,

    pub storage_backend: StorageBackend,

    /// Root directory for the local backend
    pub assets_root: PathBuf,

    pub s3_bucket: String,
    pub s3_region: String,
    /// Custom endpoint (MinIO etc.), path-style addressing is used when set
    pub s3_endpoint: Option<String>,

    /// Base URL published references are resolved against (CDN or direct endpoint)
    pub public_base_url: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_thumbnail_size: 10 << 20, // 10 MiB
            max_video_size: 10 << 30,     // 10 GiB
            jwt_secret: "secret".to_string(),
            scratch_dir: None,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            tool_timeout_secs: 600,
            storage_backend: StorageBackend::Local,
            assets_root: PathBuf::from("./assets"),
            s3_bucket: "media-assets".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_endpoint: None,
            public_base_url: local_base_url(DEFAULT_PORT),
            allowed_origins: vec![
                "http://localhost:8091".to_string(),
                "http://localhost:5173".to_string(), // Vite default
            ],
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .and_then(|v| StorageBackend::parse(&v))
            .unwrap_or(default.storage_backend);

        let s3_bucket = env::var("S3_BUCKET").unwrap_or(default.s3_bucket);
        let s3_region = env::var("S3_REGION").unwrap_or(default.s3_region);
        let s3_endpoint = env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty());

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| match storage_backend {
                StorageBackend::Local => default.public_base_url.clone(),
                StorageBackend::S3 => {
                    derive_s3_base_url(&s3_bucket, &s3_region, s3_endpoint.as_deref())
                }
            });

        Self {
            max_thumbnail_size: env::var("MAX_THUMBNAIL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_thumbnail_size),

            max_video_size: env::var("MAX_VIDEO_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_video_size),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret), // Fallback for dev convenience, strictly enforced in production method

            scratch_dir: env::var("SCRATCH_DIR").ok().map(PathBuf::from),

            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or(default.ffmpeg_path),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or(default.ffprobe_path),

            tool_timeout_secs: env::var("TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.tool_timeout_secs),

            storage_backend,

            assets_root: env::var("ASSETS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.assets_root),

            s3_bucket,
            s3_region,
            s3_endpoint,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for development (local storage, short tool timeout).
    /// Everything else still comes from the environment.
    pub fn development() -> Self {
        let mut config = Self::from_env();
        config.storage_backend = StorageBackend::Local;
        if env::var("TOOL_TIMEOUT_SECS").is_err() {
            config.tool_timeout_secs = 120;
        }
        if env::var("PUBLIC_BASE_URL").is_err() {
            config.public_base_url = local_base_url(DEFAULT_PORT);
        }
        config
    }

    /// Create config for production (S3 storage, secret must be provided)
    pub fn production() -> Self {
        let mut config = Self::from_env();
        config.storage_backend = StorageBackend::S3;
        config.jwt_secret = env::var("JWT_SECRET").expect("CRITICAL: JWT_SECRET must be set");
        if env::var("PUBLIC_BASE_URL").is_err() {
            config.public_base_url = derive_s3_base_url(
                &config.s3_bucket,
                &config.s3_region,
                config.s3_endpoint.as_deref(),
            );
        }
        config
    }

    /// Point the default local asset URL at the port the server actually
    /// binds. An explicit `PUBLIC_BASE_URL` is left alone.
    pub fn for_port(mut self, port: u16) -> Self {
        if self.storage_backend == StorageBackend::Local
            && self.public_base_url == local_base_url(DEFAULT_PORT)
        {
            self.public_base_url = local_base_url(port);
        }
        self
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

fn local_base_url(port: u16) -> String {
    format!("http://localhost:{}/assets", port)
}

fn derive_s3_base_url(bucket: &str, region: &str, endpoint: Option<&str>) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}
