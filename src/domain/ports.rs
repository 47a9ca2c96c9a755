use crate::domain::model::{Question, QuestionBank, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Byte storage addressed by relative paths (output and mirror directories).
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
    /// Sorted relative paths matching the glob `pattern`; `*` stops at `/`.
    fn list(&self, pattern: &str)
        -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    /// Human-readable location of `path`, used in logs and run summaries.
    fn locate(&self, path: &str) -> String;
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, text: &str, count: usize) -> Result<Vec<Question>>;
}

/// Document collection holding one `{ key, questions }` entry per bank.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn find(&self, key: &str) -> Result<Option<QuestionBank>>;
    async fn insert(&self, bank: &QuestionBank) -> Result<()>;
    async fn update_questions(&self, key: &str, questions: &[Question]) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Item: Send;

    fn name(&self) -> &str;
    async fn extract(&self) -> Result<Vec<Self::Item>>;
    async fn transform(&self, items: Vec<Self::Item>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
