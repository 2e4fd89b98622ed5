//! Text recognition through the `tesseract` command-line tool.

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use async_trait::async_trait;
use tokio::task;

use super::dependencies::TextRecognizer;
use super::types::{OcrText, RecognitionError, WordConfidence};

/// TSV rows at this level are single words.
const WORD_LEVEL: &str = "5";

/// Runs `tesseract stdin stdout -l <langs> tsv` with the PNG on stdin.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: String,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractRecognizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, png: &[u8], languages: &str) -> Result<String, RecognitionError> {
        log::debug!(
            "Running {} on {} bytes (languages {})",
            self.program,
            png.len(),
            languages
        );

        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "-l", languages, "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RecognitionError::Unavailable(self.program.clone()),
                _ => RecognitionError::Io(e),
            })?;

        // tesseract reads all of stdin before producing output
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png)?;
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(RecognitionError::Process {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, png: &[u8], languages: &[String]) -> Result<OcrText, RecognitionError> {
        let recognizer = self.clone();
        let png = png.to_vec();
        let languages = language_arg(languages);
        let tsv = task::spawn_blocking(move || recognizer.run(&png, &languages))
            .await
            .map_err(|e| RecognitionError::Task(e.to_string()))??;
        Ok(parse_tsv(&tsv))
    }
}

/// Map an ISO 639-1 code to tesseract's traineddata name.
pub fn tesseract_language(code: &str) -> String {
    let mapped = match code.to_lowercase().as_str() {
        "es" => "spa",
        "en" => "eng",
        "fr" => "fra",
        "de" => "deu",
        "it" => "ita",
        "pt" => "por",
        "ca" => "cat",
        "nl" => "nld",
        other => return other.to_string(),
    };
    mapped.to_string()
}

/// Languages in tesseract's `spa+eng` form; English when none are configured.
pub fn language_arg(languages: &[String]) -> String {
    let mapped: Vec<String> = languages
        .iter()
        .map(|code| code.trim())
        .filter(|code| !code.is_empty())
        .map(tesseract_language)
        .collect();
    if mapped.is_empty() {
        "eng".to_string()
    } else {
        mapped.join("+")
    }
}

/// Extract words and confidences from tesseract TSV output.
///
/// Rows that are not words, carry a negative confidence or empty text are skipped.
pub fn parse_tsv(tsv: &str) -> OcrText {
    let mut words = Vec::new();
    for line in tsv.lines().skip(1) {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < 12 || columns[0] != WORD_LEVEL {
            continue;
        }
        let Ok(conf) = columns[10].trim().parse::<f64>() else {
            continue;
        };
        let text = columns[11..].join("\t");
        let text = text.trim();
        if conf < 0.0 || text.is_empty() {
            continue;
        }
        words.push(WordConfidence {
            text: text.to_string(),
            confidence: (conf / 100.0).clamp(0.0, 1.0),
        });
    }
    OcrText::from_words(words)
}
