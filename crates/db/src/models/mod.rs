//! Row types and DTOs, one module per table.

pub mod image;
pub mod ocr_job;
