//! Tesseract-backed implementation of [`imgocr_core::ocr::OcrEngine`].

pub mod config;
pub mod subprocess;
pub mod tesseract;

pub use config::TesseractConfig;
pub use tesseract::TesseractEngine;
