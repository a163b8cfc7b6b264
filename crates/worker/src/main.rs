//! OCR worker: drains the shared job queue and keeps it tidy.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgocr_core::job::JobQueue;
use imgocr_db::PgJobQueue;
use imgocr_ocr::{TesseractConfig, TesseractEngine};
use imgocr_pipeline::maintenance::{self, MaintenanceConfig};
use imgocr_pipeline::{shutdown_signal, HttpImageGateway, Orchestrator, PipelineConfig, Services, WorkerPool};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imgocr_worker=debug,imgocr_pipeline=debug,imgocr_ocr=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = PipelineConfig::from_env();
    let tesseract = TesseractConfig::from_env();
    tracing::info!(
        image_api_url = %config.image_api_url,
        concurrency = config.worker_concurrency,
        max_attempts = config.retry.max_attempts,
        tesseract = %tesseract.command.display(),
        languages = %tesseract.languages,
        "Loaded worker configuration"
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
    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(pool));
    let gateway = HttpImageGateway::new(config.image_api_url.clone(), config.image_api_timeout)
        .expect("Failed to build image service client");
    let notifier = imgocr_notify::notifier_from_env().expect("Invalid SMTP configuration");
    let services = Services::new(
        Arc::new(gateway),
        Arc::new(TesseractEngine::new(tesseract)),
        notifier,
    );

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&queue),
        services,
        config.retry,
        config.default_email.clone(),
    ));

    // --- Run ---
    let cancel = CancellationToken::new();
    let maintenance_handle = tokio::spawn(maintenance::run(
        Arc::clone(&queue),
        MaintenanceConfig::from(&config),
        cancel.clone(),
    ));

    let worker_pool = WorkerPool::new(orchestrator, config.worker_concurrency, config.poll_interval);
    let workers = {
        let cancel = cancel.clone();
        tokio::spawn(async move { worker_pool.run(cancel).await })
    };

    shutdown_signal().await;
    cancel.cancel();

    // In-flight jobs finish; anything interrupted is recovered by the lease sweep.
    if let Err(e) = workers.await {
        tracing::error!(error = %e, "Worker pool task failed");
    }
    if let Err(e) = maintenance_handle.await {
        tracing::error!(error = %e, "Maintenance task failed");
    }

    tracing::info!("Worker stopped");
}
