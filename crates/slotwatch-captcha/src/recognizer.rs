//! OCR engine boundary.

use crate::error::{CaptchaError, Result};
use async_trait::async_trait;
use slotwatch_core::CaptchaConfig;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::trace;

/// Raw OCR output for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    /// Text as read by the engine, not normalized
    pub text: String,
    /// Engine confidence, 0 to 100
    pub confidence: f32,
}

/// Black-box OCR engine: image in, text and confidence out.
///
/// Implementations are not retried at this layer.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Read the text in a PNG image.
    async fn recognize(&self, image: &[u8]) -> Result<Recognition>;
}

/// Runs the `tesseract` command line tool.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: String,
    language: String,
    page_seg_mode: u8,
    timeout: Duration,
}

impl TesseractRecognizer {
    /// Recognizer using the binary, language and page segmentation mode from config.
    #[must_use]
    pub fn from_config(config: &CaptchaConfig) -> Self {
        Self {
            binary: config.tesseract_bin.clone(),
            language: config.ocr_language.clone(),
            page_seg_mode: config.ocr_psm,
            timeout: Duration::from_secs(20),
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
            "--psm".to_string(),
            self.page_seg_mode.to_string(),
            "tsv".to_string(),
        ]
    }

    async fn run(&self, image: &[u8]) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CaptchaError::Recognition(format!("cannot start {}: {e}", self.binary)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image)
                .await
                .map_err(|e| CaptchaError::Recognition(e.to_string()))?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CaptchaError::Recognition("tesseract timed out".to_string()))?
            .map_err(|e| CaptchaError::Recognition(e.to_string()))?;

        if !output.status.success() {
            return Err(CaptchaError::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Recognizer for TesseractRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<Recognition> {
        let tsv = self.run(image).await?;
        let recognition = parse_tsv(&tsv);
        trace!(
            "tesseract read {:?} at {:.1}%",
            recognition.text,
            recognition.confidence
        );
        Ok(recognition)
    }
}

/// Join the word rows of Tesseract's TSV output and average their confidence.
#[must_use]
pub fn parse_tsv(tsv: &str) -> Recognition {
    let mut words = Vec::new();
    let mut total = 0.0_f32;

    for line in tsv.lines().skip(1) {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < 12 || columns[0] != "5" {
            continue;
        }
        let Ok(confidence) = columns[10].trim().parse::<f32>() else {
            continue;
        };
        let text = columns[11].trim();
        if confidence < 0.0 || text.is_empty() {
            continue;
        }
        words.push(text);
        total += confidence;
    }

    if words.is_empty() {
        return Recognition {
            text: String::new(),
            confidence: 0.0,
        };
    }

    #[allow(clippy::cast_precision_loss)]
    let confidence = total / words.len() as f32;
    Recognition {
        text: words.join(" "),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tsv_joins_words_and_averages() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t400\t133\t-1\t\n\
             4\t1\t1\t1\t1\t0\t12\t30\t370\t70\t-1\t\n\
             5\t1\t1\t1\t1\t1\t12\t30\t150\t70\t90.5\tAB\n\
             5\t1\t1\t1\t1\t2\t180\t30\t190\t70\t81.5\t12\n"
        );
        let recognition = parse_tsv(&tsv);
        assert_eq!(recognition.text, "AB 12");
        assert!((recognition.confidence - 86.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_tsv_without_words() {
        let tsv = format!("{HEADER}\n1\t1\t0\t0\t0\t0\t0\t0\t400\t133\t-1\t\n");
        assert_eq!(
            parse_tsv(&tsv),
            Recognition {
                text: String::new(),
                confidence: 0.0
            }
        );
    }

    #[test]
    fn test_parse_tsv_skips_blank_words() {
        let tsv = format!("{HEADER}\n5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t95\t \n5\t1\t1\t1\t1\t2\t0\t0\t10\t10\t60\tx7\n");
        let recognition = parse_tsv(&tsv);
        assert_eq!(recognition.text, "x7");
        assert!((recognition.confidence - 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_args_follow_config() {
        let config = CaptchaConfig {
            ocr_language: "pol".to_string(),
            ocr_psm: 8,
            ..CaptchaConfig::default()
        };
        let recognizer = TesseractRecognizer::from_config(&config);
        assert_eq!(
            recognizer.args(),
            vec!["stdin", "stdout", "-l", "pol", "--psm", "8", "tsv"]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_recognition_error() {
        let config = CaptchaConfig {
            tesseract_bin: "slotwatch-no-such-tesseract".to_string(),
            ..CaptchaConfig::default()
        };
        let err = TesseractRecognizer::from_config(&config)
            .recognize(b"png")
            .await
            .unwrap_err();
        assert!(matches!(err, CaptchaError::Recognition(_)));
    }
}
