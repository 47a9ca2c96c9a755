use crate::config::toml_config::QuizConfig;
use crate::core::bank::save_bank;
use crate::core::{mdx, naming, tokens};
use crate::core::{MdxDocument, Pipeline, QuestionBank, QuestionGenerator, Storage, TransformResult};
use crate::domain::model::SkippedItem;
use crate::utils::error::Result;
use crate::utils::validation;
use std::time::Duration;

/// Full-length bank for one topic, built from batches of the topic's documents.
pub struct TopicPipeline<S: Storage, G: QuestionGenerator> {
    storage: S,
    generator: G,
    config: QuizConfig,
    topic: String,
}

/// Concatenated document text sent in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicBatch {
    pub documents: Vec<String>,
    pub text: String,
    pub tokens: usize,
}

impl<S: Storage, G: QuestionGenerator> TopicPipeline<S, G> {
    pub fn new(storage: S, generator: G, config: QuizConfig) -> Result<Self> {
        let topic = validation::validate_required_field("topic.name", &config.topic.name)?.clone();
        validation::validate_non_empty_string("topic.name", &topic)?;

        Ok(Self {
            storage,
            generator,
            config,
            topic,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Bank path relative to the output storage.
    pub fn bank_path(&self) -> String {
        format!(
            "{}/{}.json",
            self.config.topic.output_dir.trim_end_matches('/'),
            self.topic
        )
    }

    /// Groups documents into batches bounded by `docs_per_batch` and
    /// `max_batch_tokens`; the last partial batch is kept.
    pub fn batches(&self, docs: &[MdxDocument]) -> (Vec<TopicBatch>, Vec<SkippedItem>) {
        let root = self.config.content_root();
        let topic = &self.config.topic;
        let mut batches = Vec::new();
        let mut skipped = Vec::new();
        let mut current = TopicBatch {
            documents: Vec::new(),
            text: String::new(),
            tokens: 0,
        };

        for doc in docs {
            let Some(body) = doc.usable_body() else {
                skipped.push(SkippedItem {
                    source: doc.path.display().to_string(),
                    reason: doc.error.clone().unwrap_or_else(|| "empty body".to_string()),
                });
                continue;
            };

            let file_name = naming::bank_file_name(&doc.path, &root);
            let chunk = format!("\n\n{}\n\n{}", file_name, body);
            let chunk_tokens = tokens::estimate_tokens(&chunk);

            let full = current.documents.len() >= topic.docs_per_batch
                || current.tokens + chunk_tokens > topic.max_batch_tokens;
            if full && !current.documents.is_empty() {
                batches.push(std::mem::replace(
                    &mut current,
                    TopicBatch {
                        documents: Vec::new(),
                        text: String::new(),
                        tokens: 0,
                    },
                ));
            }
            if chunk_tokens > topic.max_batch_tokens {
                tracing::warn!(
                    "⚠️ {} alone is ~{} tokens, above the batch budget of {}",
                    file_name,
                    chunk_tokens,
                    topic.max_batch_tokens
                );
            }

            current.documents.push(file_name);
            current.text.push_str(&chunk);
            current.tokens += chunk_tokens;
        }

        if !current.documents.is_empty() {
            batches.push(current);
        }
        (batches, skipped)
    }
}

#[async_trait::async_trait]
impl<S: Storage, G: QuestionGenerator> Pipeline for TopicPipeline<S, G> {
    type Item = MdxDocument;

    fn name(&self) -> &str {
        "topic"
    }

    async fn extract(&self) -> Result<Vec<MdxDocument>> {
        let root = self.config.content_root();
        let docs: Vec<MdxDocument> = mdx::read_all(&root)?
            .into_iter()
            .filter(|doc| naming::bank_key(&doc.path, &root).contains(self.topic.as_str()))
            .collect();

        if docs.is_empty() {
            tracing::warn!("⚠️ No documents match topic \"{}\"", self.topic);
        } else {
            tracing::info!("🔎 {} document(s) match topic \"{}\"", docs.len(), self.topic);
        }
        Ok(docs)
    }

    async fn transform(&self, docs: Vec<MdxDocument>) -> Result<TransformResult> {
        let (batches, mut skipped) = self.batches(&docs);
        let generator = &self.config.generator;
        let count = self.config.topic.questions_per_batch;
        let mut questions = Vec::new();

        for (index, batch) in batches.iter().enumerate() {
            if index > 0 && index % generator.batch_size == 0 && generator.cooldown_seconds > 0 {
                tracing::info!("⏳ Sent {} requests, pausing {}s", index, generator.cooldown_seconds);
                tokio::time::sleep(Duration::from_secs(generator.cooldown_seconds)).await;
            }

            tracing::info!(
                "📦 Batch {}/{}: {} document(s), ~{} tokens",
                index + 1,
                batches.len(),
                batch.documents.len(),
                batch.tokens
            );
            match self.generator.generate(&batch.text, count).await {
                Ok(generated) => {
                    tracing::info!("📝 {} question(s) from batch {}", generated.len(), index + 1);
                    questions.extend(generated);
                }
                Err(e) => {
                    tracing::error!("❌ Generation failed for batch {}: {}", index + 1, e);
                    skipped.push(SkippedItem {
                        source: format!("batch {} ({})", index + 1, batch.documents.join(", ")),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let banks = if questions.is_empty() {
            Vec::new()
        } else {
            vec![QuestionBank {
                key: self.topic.clone(),
                questions,
            }]
        };
        Ok(TransformResult { banks, skipped })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let path = self.bank_path();
        let incoming: Vec<_> = result.banks.into_iter().flat_map(|b| b.questions).collect();
        if incoming.is_empty() {
            tracing::warn!("⚠️ No questions generated for \"{}\", {} left untouched", self.topic, path);
            return Ok(format!("no questions for {}", self.topic));
        }
        let (summary, _) = save_bank(&self.storage, &path, incoming).await?;

        tracing::info!(
            "✅ Saved {} (existing: {}, new: {}, total: {})",
            self.storage.locate(&path),
            summary.existing,
            summary.incoming,
            summary.total
        );
        Ok(self.storage.locate(&path))
    }
}
