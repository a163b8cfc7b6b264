//! [`OcrEngine`] that shells out to the `tesseract` CLI.
//!
//! The image is streamed on stdin and the TSV word table is read from
//! stdout: `tesseract stdin stdout --oem 3 --psm 6 -l {languages} tsv`.

use async_trait::async_trait;
use tokio::process::Command;

use imgocr_core::ocr::{aggregate_tokens, parse_tsv, OcrEngine, OcrError, OcrOutput};

use crate::config::TesseractConfig;
use crate::subprocess::{run_with_input, ProcessError};

/// LSTM engine only.
const OEM_LSTM: &str = "3";

/// Assume a single uniform block of text.
const PSM_SINGLE_BLOCK: &str = "6";

/// Longest stderr excerpt carried in an error message.
const MAX_STDERR_IN_ERROR: usize = 500;

pub struct TesseractEngine {
    config: TesseractConfig,
}

impl TesseractEngine {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TesseractConfig {
        &self.config
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.args([
            "stdin",
            "stdout",
            "--oem",
            OEM_LSTM,
            "--psm",
            PSM_SINGLE_BLOCK,
            "-l",
            &self.config.languages,
            "tsv",
        ]);
        cmd
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn extract(&self, image: &[u8]) -> Result<OcrOutput, OcrError> {
        let format = ::image::guess_format(image)
            .map_err(|e| OcrError::Processing(format!("cannot decode image: {e}")))?;
        tracing::debug!(?format, bytes = image.len(), "Running tesseract");

        let output = run_with_input(&mut self.command(), image, self.config.timeout)
            .await
            .map_err(|e| match e {
                ProcessError::Timeout { elapsed_ms } => OcrError::Processing(format!(
                    "tesseract timed out after {elapsed_ms}ms"
                )),
                other => OcrError::Processing(format!(
                    "tesseract ({}) failed: {other}",
                    self.config.command.display()
                )),
            })?;

        if output.exit_code != 0 {
            let stderr: String = output.stderr.trim().chars().take(MAX_STDERR_IN_ERROR).collect();
            return Err(OcrError::Processing(format!(
                "tesseract exited with code {}: {stderr}",
                output.exit_code
            )));
        }

        let tokens = parse_tsv(&output.stdout)?;
        let result = aggregate_tokens(&tokens);
        tracing::info!(
            chars = result.text.len(),
            confidence = result.confidence,
            duration_ms = output.duration_ms,
            "OCR extraction finished"
        );
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Cursor;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = ::image::RgbImage::from_pixel(8, 8, ::image::Rgb([255, 255, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ::image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    /// Write an executable shell script standing in for `tesseract`.
    fn fake_tesseract(dir: &Path, script: &str) -> TesseractConfig {
        let path = dir.join("tesseract");
        std::fs::write(&path, format!("#!/bin/sh\ncat > /dev/null\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        TesseractConfig {
            command: path,
            languages: "eng".into(),
            timeout: Duration::from_secs(5),
        }
    }

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
1\t1\t0\t0\t0\t0\t0\t0\t8\t8\t-1\t\n\
5\t1\t1\t1\t1\t1\t0\t0\t4\t4\t95\tHello\n\
5\t1\t1\t1\t1\t2\t4\t0\t4\t4\t90\tWorld\n";

    #[tokio::test]
    async fn parses_fake_tesseract_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("printf '{}'", TSV.replace('\t', "\\t").replace('\n', "\\n"));
        let engine = TesseractEngine::new(fake_tesseract(dir.path(), &script));

        let out = engine.extract(&png_bytes()).await.unwrap();
        assert_eq!(out.text, "Hello World");
        assert_eq!(out.confidence, 92.5);

        let text = engine.extract_text(&png_bytes()).await.unwrap();
        assert_eq!(text, "Hello World");
    }

    #[tokio::test]
    async fn passes_expected_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let args_file = dir.path().join("args");
        let script = format!("echo \"$@\" > {}", args_file.display());
        let engine = TesseractEngine::new(fake_tesseract(dir.path(), &script));

        engine.extract(&png_bytes()).await.unwrap();
        let args = std::fs::read_to_string(args_file).unwrap();
        assert_eq!(args.trim(), "stdin stdout --oem 3 --psm 6 -l eng tsv");
    }

    #[tokio::test]
    async fn empty_output_yields_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(fake_tesseract(dir.path(), "true"));
        let out = engine.extract(&png_bytes()).await.unwrap();
        assert_eq!(out.text, "");
        assert_eq!(out.confidence, 0.0);
    }

    #[tokio::test]
    async fn garbage_bytes_are_rejected_before_spawning() {
        let engine = TesseractEngine::new(TesseractConfig {
            command: "/nonexistent/tesseract".into(),
            ..TesseractConfig::default()
        });
        let err = engine.extract(b"definitely not an image").await.unwrap_err();
        assert_matches!(err, OcrError::Processing(msg) if msg.contains("cannot decode"));
    }

    #[tokio::test]
    async fn missing_binary_is_a_processing_error() {
        let engine = TesseractEngine::new(TesseractConfig {
            command: "/nonexistent/tesseract".into(),
            ..TesseractConfig::default()
        });
        assert_matches!(
            engine.extract(&png_bytes()).await,
            Err(OcrError::Processing(_))
        );
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(fake_tesseract(
            dir.path(),
            "echo 'Failed loading language' >&2; exit 1",
        ));
        let err = engine.extract(&png_bytes()).await.unwrap_err();
        assert_matches!(err, OcrError::Processing(msg) if msg.contains("Failed loading language"));
    }

    #[tokio::test]
    async fn hung_engine_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fake_tesseract(dir.path(), "sleep 10");
        config.timeout = Duration::from_millis(200);
        let engine = TesseractEngine::new(config);
        let err = engine.extract(&png_bytes()).await.unwrap_err();
        assert_matches!(err, OcrError::Processing(msg) if msg.contains("timed out"));
    }
}
