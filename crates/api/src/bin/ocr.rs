use std::net::SocketAddr;
use std::sync::Arc;

use imgocr_api::app::build_ocr_app;
use imgocr_api::config::ServerConfig;
use imgocr_api::state::OcrState;
use imgocr_db::PgJobQueue;
use imgocr_pipeline::{shutdown_signal, HttpImageGateway, PipelineConfig};

const DEFAULT_PORT: u16 = 8001;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    imgocr_api::init_tracing("imgocr_api=debug,imgocr_pipeline=info,tower_http=debug");

    // --- Configuration ---
    let config = ServerConfig::from_env(DEFAULT_PORT).expect("Invalid server configuration");
    let pipeline = PipelineConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        image_api_url = %pipeline.image_api_url,
        "Loaded OCR service configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = imgocr_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    imgocr_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Collaborators ---
    let gateway = HttpImageGateway::new(pipeline.image_api_url.clone(), pipeline.image_api_timeout)
        .expect("Failed to build image service client");
    let notifier = imgocr_notify::notifier_from_env().expect("Invalid SMTP configuration");

    let state = OcrState::new(Arc::new(PgJobQueue::new(pool)), Arc::new(gateway), notifier);
    let app = build_ocr_app(state, &config).expect("Invalid CORS configuration");

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse().expect("Invalid HOST address"), config.port);
    tracing::info!(%addr, "Starting OCR service");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("OCR service stopped");
}
