//! Domain types, pure logic and collaborator ports shared by every imgocr crate.
//!
//! This crate has no I/O of its own. Anything that talks to the network, a
//! database, a subprocess or an SMTP server lives in a downstream crate and
//! plugs into one of the traits defined here:
//!
//! - [`job::JobQueue`] -- durable work queue holding OCR jobs
//! - [`gateway::ImageGateway`] -- cross-service image metadata and bytes
//! - [`ocr::OcrEngine`] -- text recognition
//! - [`notify::Notifier`] -- outbound email

pub mod error;
pub mod gateway;
pub mod image_meta;
pub mod job;
pub mod notify;
pub mod ocr;
pub mod retry;
pub mod status;
pub mod types;
