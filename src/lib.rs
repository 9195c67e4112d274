pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::handlers::upload::body_limit;
use crate::config::{StorageBackend, UploadConfig};
use crate::services::media::{FfmpegNormalizer, FfprobeIntrospector};
use crate::services::publisher::ObjectPublisher;
use crate::services::records::{AssetRecordUpdater, SeaOrmAssetStore};
use crate::services::sniffer::MediaField;
use crate::services::staging::StagingStore;
use crate::services::storage::StorageService;
use crate::services::upload_service::UploadService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_thumbnail,
        api::handlers::upload::upload_video,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::AssetRecord,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "uploads", description = "Thumbnail and video ingestion"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub upload_service: Arc<UploadService>,
    pub config: UploadConfig,
}

impl AppState {
    /// Wire the pipeline against the real database, storage backend and ffmpeg tools
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>, config: UploadConfig) -> Self {
        let upload_service = UploadService::new(
            AssetRecordUpdater::new(Arc::new(SeaOrmAssetStore::new(db.clone()))),
            ObjectPublisher::new(storage.clone(), config.public_base_url.clone()),
            StagingStore::new(config.scratch_dir.clone()),
            Arc::new(FfprobeIntrospector::new(
                config.ffprobe_path.clone(),
                config.tool_timeout(),
            )),
            Arc::new(FfmpegNormalizer::new(
                config.ffmpeg_path.clone(),
                config.tool_timeout(),
            )),
            config.clone(),
        );

        Self {
            db,
            storage,
            upload_service: Arc::new(upload_service),
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            state
                .config
                .allowed_origins
                .iter()
                .filter(|origin| origin.as_str() != "*")
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let mut app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/api/thumbnail_upload/:video_id",
            post(api::handlers::upload::upload_thumbnail)
                .layer(DefaultBodyLimit::max(body_limit(MediaField::Thumbnail, &state)))
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::auth_middleware,
                )),
        )
        .route(
            "/api/video_upload/:video_id",
            post(api::handlers::upload::upload_video)
                .layer(DefaultBodyLimit::max(body_limit(MediaField::Video, &state)))
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::auth_middleware,
                )),
        );

    if state.config.storage_backend == StorageBackend::Local {
        app = app.nest_service("/assets", ServeDir::new(&state.config.assets_root));
    }

    // Request IDs are assigned outside the trace layer so every span carries one
    app.layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    tracing::info!("📥 {} {}", request.method(), request.uri());
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            "📤 Finished in {:?} with status {}",
                            latency,
                            response.status()
                        );
                    },
                ),
        )
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}
