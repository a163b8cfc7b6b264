use std::net::SocketAddr;

use imgocr_api::app::build_image_app;
use imgocr_api::config::{ImageServiceConfig, ServerConfig};
use imgocr_api::state::ImageState;
use imgocr_pipeline::shutdown_signal;

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    imgocr_api::init_tracing("imgocr_api=debug,imgocr_db=info,tower_http=debug");

    // --- Configuration ---
    let config = ServerConfig::from_env(DEFAULT_PORT).expect("Invalid server configuration");
    let service_config = ImageServiceConfig::from_env().expect("Invalid image service configuration");
    tracing::info!(
        host = %config.host,
        port = config.port,
        media_root = %service_config.media_root.display(),
        "Loaded image service configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = imgocr_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    imgocr_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    imgocr_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Router ---
    let state = ImageState::new(pool, service_config);
    let app = build_image_app(state, &config).expect("Invalid CORS configuration");

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse().expect("Invalid HOST address"), config.port);
    tracing::info!(%addr, "Starting image service");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Image service stopped");
}
