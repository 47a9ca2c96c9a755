//! In-memory doubles shared by the pipeline unit tests.

use crate::core::{MdxDocument, Question, QuestionGenerator, Storage};
use crate::core::mdx::parse_front_matter;
use crate::domain::model::OPTION_KEYS;
use crate::utils::error::{QuizError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub fn question(text: &str) -> Question {
    Question {
        question: text.to_string(),
        options: OPTION_KEYS
            .iter()
            .map(|k| (k.to_string(), format!("{} ({})", text, k)))
            .collect(),
        correct_answer: "A".to_string(),
        question_id: None,
        source_file: None,
    }
}

pub fn document(path: &str, raw: &str) -> MdxDocument {
    let path = PathBuf::from(path);
    let (front_matter, body) = parse_front_matter(raw);
    MdxDocument {
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path,
        front_matter,
        body: Some(body),
        raw: Some(raw.to_string()),
        error: None,
    }
}

#[derive(Clone, Default)]
pub struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockStorage {
    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(path).cloned()
    }
}

impl Storage for MockStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            QuizError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.files.lock().await.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.lock().await.contains_key(path))
    }

    async fn list(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = glob::Pattern::new(pattern)?;
        let options = glob::MatchOptions {
            require_literal_separator: true,
            ..glob::MatchOptions::new()
        };
        let mut found: Vec<String> = self
            .files
            .lock()
            .await
            .keys()
            .filter(|path| pattern.matches_with(path, options))
            .cloned()
            .collect();
        found.sort();
        Ok(found)
    }

    fn locate(&self, path: &str) -> String {
        format!("mock://{}", path)
    }
}

/// Answers every request with `count` questions derived from the text and
/// records what it was asked.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    calls: Arc<Mutex<Vec<(String, usize)>>>,
    fail_when_contains: Option<String>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ScriptedGenerator {
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_when_contains: Some(needle.to_string()),
            ..Self::default()
        }
    }

    /// Each request takes `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().await.clone()
    }

    /// Most requests that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionGenerator for ScriptedGenerator {
    async fn generate(&self, text: &str, count: usize) -> Result<Vec<Question>> {
        self.calls.lock().await.push((text.to_string(), count));

        if let Some(delay) = self.delay {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        if let Some(needle) = &self.fail_when_contains {
            if text.contains(needle.as_str()) {
                return Err(QuizError::GenerationError {
                    message: "scripted failure".to_string(),
                });
            }
        }

        let head: String = text.trim().chars().take(24).collect();
        Ok((1..=count).map(|i| question(&format!("{} #{}", head, i))).collect())
    }
}
