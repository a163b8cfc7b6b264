//! OCR job execution: the cross-service gateway, the orchestrator that drives
//! one job through fetch, download, OCR and email, the worker pool that feeds
//! it from the queue, the maintenance sweeper, and the signal handling the
//! long-running binaries share.

pub mod config;
pub mod gateway;
pub mod maintenance;
pub mod memory;
pub mod orchestrator;
pub mod services;
pub mod shutdown;
pub mod worker;

pub use config::PipelineConfig;
pub use gateway::HttpImageGateway;
pub use memory::MemoryJobQueue;
pub use orchestrator::{submit_job, JobError, JobOutcome, Orchestrator};
pub use services::Services;
pub use shutdown::shutdown_signal;
pub use worker::WorkerPool;
