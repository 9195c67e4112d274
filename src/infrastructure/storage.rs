use crate::config::{StorageBackend, UploadConfig};
use crate::services::storage::{LocalStorageService, S3StorageService, StorageService};
use aws_sdk_s3::config::Region;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &UploadConfig) -> anyhow::Result<Arc<dyn StorageService>> {
    match config.storage_backend {
        StorageBackend::Local => {
            tokio::fs::create_dir_all(&config.assets_root).await?;
            info!("🗂️  Local Storage: {}", config.assets_root.display());
            Ok(Arc::new(LocalStorageService::new(config.assets_root.clone())))
        }
        StorageBackend::S3 => {
            info!(
                "☁️  S3 Storage: {} (Bucket: {})",
                config.s3_endpoint.as_deref().unwrap_or("aws"),
                config.s3_bucket
            );

            // Credentials come from the standard AWS provider chain
            let mut loader =
                aws_config::from_env().region(Region::new(config.s3_region.clone()));
            if let Some(endpoint) = &config.s3_endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            let aws_config = loader.load().await;

            let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(config.s3_endpoint.is_some())
                .build();

            let s3_client = aws_sdk_s3::Client::from_conf(s3_config);

            match s3_client.head_bucket().bucket(&config.s3_bucket).send().await {
                Ok(_) => info!("✅ Bucket '{}' is ready", config.s3_bucket),
                Err(e) => tracing::warn!(
                    "⚠️  Bucket '{}' is not reachable yet: {}",
                    config.s3_bucket,
                    e
                ),
            }

            Ok(Arc::new(S3StorageService::new(
                s3_client,
                config.s3_bucket.clone(),
            )))
        }
    }
}
