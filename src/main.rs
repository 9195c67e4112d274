use clap::Parser;
use dotenvy::dotenv;
use media_ingest_backend::config::{DEFAULT_PORT, UploadConfig};
use media_ingest_backend::infrastructure::{database, storage};
use media_ingest_backend::{AppState, create_app};
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Thumbnail and video ingestion service")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    bind: std::net::IpAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_ingest_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting media ingest backend...");

    let config = match std::env::var("APP_ENV").as_deref() {
        Ok("production") => UploadConfig::production(),
        Ok("development") => UploadConfig::development(),
        _ => UploadConfig::from_env(),
    }
    .for_port(args.port);
    info!(
        "🎞️  Upload Config: Thumbnail={}MB, Video={}MB, Tool timeout={}s, Backend={:?}",
        config.max_thumbnail_size >> 20,
        config.max_video_size >> 20,
        config.tool_timeout_secs,
        config.storage_backend
    );

    let db = database::setup_database().await?;
    let storage_service = storage::setup_storage(&config).await?;

    let state = AppState::new(db, storage_service, config);

    let app = create_app(state);

    let addr = SocketAddr::new(args.bind, args.port);
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
