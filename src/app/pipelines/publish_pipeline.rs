use crate::config::toml_config::QuizConfig;
use crate::core::bank::read_bank_dir;
use crate::core::{Pipeline, QuestionBank, QuestionStore, TransformResult};
use crate::utils::error::Result;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Inserted,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishCounts {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl PublishCounts {
    fn record(&mut self, outcome: PublishOutcome) {
        match outcome {
            PublishOutcome::Inserted => self.inserted += 1,
            PublishOutcome::Updated => self.updated += 1,
            PublishOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

impl fmt::Display for PublishCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} updated, {} unchanged",
            self.inserted, self.updated, self.unchanged
        )
    }
}

/// Numbers questions and tags them with their bank key.
pub fn prepare_bank(mut bank: QuestionBank) -> QuestionBank {
    for (index, question) in bank.questions.iter_mut().enumerate() {
        question.question_id.get_or_insert(index as u64 + 1);
        question.source_file = Some(bank.key.clone());
    }
    bank
}

/// Upserts question banks from a directory into a [`QuestionStore`].
pub struct PublishPipeline<Q: QuestionStore> {
    store: Q,
    source: PathBuf,
    dry_run: bool,
}

impl<Q: QuestionStore> PublishPipeline<Q> {
    pub fn new(store: Q, config: &QuizConfig) -> Self {
        Self {
            store,
            source: PathBuf::from(&config.publish.source_path),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn store(&self) -> &Q {
        &self.store
    }

    pub async fn upsert(&self, bank: &QuestionBank) -> Result<PublishOutcome> {
        let outcome = match self.store.find(&bank.key).await? {
            None => {
                if !self.dry_run {
                    self.store.insert(bank).await?;
                }
                PublishOutcome::Inserted
            }
            Some(existing) if existing.questions != bank.questions => {
                if !self.dry_run {
                    self.store.update_questions(&bank.key, &bank.questions).await?;
                }
                PublishOutcome::Updated
            }
            Some(_) => PublishOutcome::Unchanged,
        };

        match outcome {
            PublishOutcome::Inserted => tracing::info!("➕ Inserted {}", bank.key),
            PublishOutcome::Updated => tracing::info!("🔄 Updated {}", bank.key),
            PublishOutcome::Unchanged => tracing::debug!("{} unchanged", bank.key),
        }
        Ok(outcome)
    }
}

#[async_trait::async_trait]
impl<Q: QuestionStore> Pipeline for PublishPipeline<Q> {
    type Item = QuestionBank;

    fn name(&self) -> &str {
        "publish"
    }

    async fn extract(&self) -> Result<Vec<QuestionBank>> {
        let banks = read_bank_dir(&self.source)?;
        tracing::info!("📚 Found {} bank(s) in {}", banks.len(), self.source.display());
        Ok(banks)
    }

    async fn transform(&self, banks: Vec<QuestionBank>) -> Result<TransformResult> {
        Ok(TransformResult {
            banks: banks.into_iter().map(prepare_bank).collect(),
            skipped: Vec::new(),
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        if self.dry_run {
            tracing::info!("🔍 DRY RUN MODE - the store will not be modified");
        }

        let mut counts = PublishCounts::default();
        for bank in &result.banks {
            counts.record(self.upsert(bank).await?);
        }
        Ok(counts.to_string())
    }
}
