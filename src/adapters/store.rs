use crate::core::{Question, QuestionBank, QuestionStore};
use crate::utils::error::{QuizError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// A question collection kept in a single JSON file, `{dir}/{collection}.json`.
pub struct JsonFileStore {
    path: PathBuf,
    // serialises read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>, collection: &str) -> Self {
        Self {
            path: dir.into().join(format!("{}.json", collection)),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<QuestionBank>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| QuizError::StoreError {
                message: format!("{} is not a valid collection: {}", self.path.display(), e),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, banks: &[QuestionBank]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(banks)?).await?;
        Ok(())
    }
}

#[async_trait]
impl QuestionStore for JsonFileStore {
    async fn find(&self, key: &str) -> Result<Option<QuestionBank>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.into_iter().find(|b| b.key == key))
    }

    async fn insert(&self, bank: &QuestionBank) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut banks = self.read_all().await?;
        if banks.iter().any(|b| b.key == bank.key) {
            return Err(QuizError::StoreError {
                message: format!("bank `{}` already exists", bank.key),
            });
        }
        banks.push(bank.clone());
        self.write_all(&banks).await
    }

    async fn update_questions(&self, key: &str, questions: &[Question]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut banks = self.read_all().await?;
        let bank = banks
            .iter_mut()
            .find(|b| b.key == key)
            .ok_or_else(|| QuizError::StoreError {
                message: format!("bank `{}` does not exist", key),
            })?;
        bank.questions = questions.to_vec();
        self.write_all(&banks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bank(key: &str, texts: &[&str]) -> QuestionBank {
        QuestionBank {
            key: key.to_string(),
            questions: texts
                .iter()
                .map(|t| Question {
                    question: t.to_string(),
                    options: Default::default(),
                    correct_answer: "A".to_string(),
                    question_id: Some(1),
                    source_file: Some(key.to_string()),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_insert_find_update() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path(), "Mcqs");

        assert!(store.find("react_hooks").await.unwrap().is_none());

        store.insert(&bank("react_hooks", &["Q1"])).await.unwrap();
        store.insert(&bank("angular_di", &["Q2"])).await.unwrap();
        assert!(store.insert(&bank("react_hooks", &["Q9"])).await.is_err());

        let updated = bank("react_hooks", &["Q1", "Q3"]);
        store
            .update_questions("react_hooks", &updated.questions)
            .await
            .unwrap();

        let found = store.find("react_hooks").await.unwrap().unwrap();
        assert_eq!(found, updated);
        assert!(dir.path().join("Mcqs.json").is_file());
    }

    #[tokio::test]
    async fn test_update_missing_bank_fails() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path(), "Mcqs");
        let err = store.update_questions("nope", &[]).await.unwrap_err();
        assert!(matches!(err, QuizError::StoreError { .. }));
    }
}
