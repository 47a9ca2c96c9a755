use crate::config::toml_config::QuizConfig;
use crate::core::bank::{load_bank, save_bank};
use crate::core::export::bundle_zip;
use crate::core::{mdx, naming, tokens};
use crate::core::{MdxDocument, Pipeline, Question, QuestionBank, QuestionGenerator, Storage, TransformResult};
use crate::domain::model::SkippedItem;
use crate::utils::error::Result;
use futures_util::stream::{self, StreamExt};
use std::time::Duration;

/// One bank per MDX document, written to the output storage and its mirrors.
pub struct QuizPipeline<S: Storage, G: QuestionGenerator> {
    storage: S,
    mirrors: Vec<S>,
    generator: G,
    config: QuizConfig,
}

struct GenerationJob {
    key: String,
    body: String,
}

impl<S: Storage, G: QuestionGenerator> QuizPipeline<S, G> {
    pub fn new(storage: S, generator: G, config: QuizConfig) -> Self {
        Self {
            storage,
            mirrors: Vec::new(),
            generator,
            config,
        }
    }

    pub fn with_mirrors(mut self, mirrors: Vec<S>) -> Self {
        self.mirrors = mirrors;
        self
    }

    /// Documents that would be sent to the model, with the reason for every other one.
    pub async fn plan(&self, docs: &[MdxDocument]) -> Result<(Vec<(String, usize)>, Vec<SkippedItem>)> {
        let (jobs, skipped) = self.jobs(docs).await?;
        let planned = jobs
            .into_iter()
            .map(|job| {
                let estimate = tokens::estimate_tokens(&job.body);
                (job.key, estimate)
            })
            .collect();
        Ok((planned, skipped))
    }

    async fn jobs(&self, docs: &[MdxDocument]) -> Result<(Vec<GenerationJob>, Vec<SkippedItem>)> {
        let root = self.config.content_root();
        let generator = &self.config.generator;
        let mut jobs = Vec::new();
        let mut skipped = Vec::new();

        for doc in docs {
            let key = naming::bank_key(&doc.path, &root);
            let skip = |reason: String| SkippedItem {
                source: doc.path.display().to_string(),
                reason,
            };

            let Some(body) = doc.usable_body() else {
                let reason = doc.error.clone().unwrap_or_else(|| "empty body".to_string());
                tracing::warn!("⚠️ Skipping {}: {}", doc.path.display(), reason);
                skipped.push(skip(reason));
                continue;
            };

            let file_name = format!("{}.json", key);
            if generator.skip_existing && self.storage.exists(&file_name).await? {
                tracing::info!("⏭️ Skipping {}: {} already exists", doc.filename, file_name);
                skipped.push(skip(format!("{} already exists", file_name)));
                continue;
            }

            let estimate = tokens::estimate_tokens(body);
            if estimate > generator.max_input_tokens {
                tracing::warn!(
                    "⚠️ Skipping {}: ~{} tokens exceeds the limit of {}",
                    doc.filename,
                    estimate,
                    generator.max_input_tokens
                );
                skipped.push(skip(format!(
                    "~{} tokens exceeds the limit of {}",
                    estimate, generator.max_input_tokens
                )));
                continue;
            }

            jobs.push(GenerationJob {
                key,
                body: body.to_string(),
            });
        }

        Ok((jobs, skipped))
    }

    async fn write_everywhere(&self, bank: &QuestionBank) -> Result<()> {
        let name = bank.file_name();
        let (summary, json) = save_bank(&self.storage, &name, bank.questions.clone()).await?;
        tracing::info!(
            "✅ Saved {} (existing: {}, new: {}, total: {})",
            self.storage.locate(&name),
            summary.existing,
            summary.incoming,
            summary.total
        );

        for mirror in &self.mirrors {
            mirror.write_file(&name, &json).await?;
            tracing::debug!("Mirrored {} to {}", name, mirror.locate(&name));
        }
        Ok(())
    }

    /// Every non-empty bank in the output storage, this run's and earlier ones.
    async fn stored_banks(&self) -> Result<Vec<QuestionBank>> {
        let mut banks = Vec::new();
        for name in self.storage.list("*.json").await? {
            let Some(key) = name.strip_suffix(".json") else {
                continue;
            };
            let questions = load_bank(&self.storage, &name).await;
            if !questions.is_empty() {
                banks.push(QuestionBank {
                    key: key.to_string(),
                    questions,
                });
            }
        }
        Ok(banks)
    }
}

#[async_trait::async_trait]
impl<S: Storage, G: QuestionGenerator> Pipeline for QuizPipeline<S, G> {
    type Item = MdxDocument;

    fn name(&self) -> &str {
        "generate"
    }

    async fn extract(&self) -> Result<Vec<MdxDocument>> {
        mdx::read_all(&self.config.content_root())
    }

    async fn transform(&self, docs: Vec<MdxDocument>) -> Result<TransformResult> {
        let (jobs, mut skipped) = self.jobs(&docs).await?;
        let generator = &self.config.generator;
        let count = generator.questions_per_document;
        let mut banks = Vec::new();

        tracing::info!(
            "Generating {} question(s) for each of {} document(s)",
            count,
            jobs.len()
        );

        for (batch_index, batch) in jobs.chunks(generator.batch_size).enumerate() {
            if batch_index > 0 && generator.cooldown_seconds > 0 {
                tracing::info!(
                    "⏳ Sent {} requests, pausing {}s",
                    batch_index * generator.batch_size,
                    generator.cooldown_seconds
                );
                tokio::time::sleep(Duration::from_secs(generator.cooldown_seconds)).await;
            }

            let results: Vec<(usize, Result<Vec<Question>>)> = stream::iter(0..batch.len())
                .map(|i| {
                    let job = &batch[i];
                    async move { (i, self.generator.generate(&job.body, count).await) }
                })
                .buffered(generator.concurrent_requests)
                .collect()
                .await;

            for (i, result) in results {
                let job = &batch[i];
                match result {
                    Ok(questions) if questions.is_empty() => {
                        tracing::warn!("⚠️ No usable questions for {}", job.key);
                        skipped.push(SkippedItem {
                            source: job.key.clone(),
                            reason: "model returned no usable questions".to_string(),
                        });
                    }
                    Ok(questions) => {
                        tracing::info!("📝 {} question(s) for {}", questions.len(), job.key);
                        banks.push(QuestionBank {
                            key: job.key.clone(),
                            questions,
                        });
                    }
                    Err(e) => {
                        tracing::error!("❌ Generation failed for {}: {}", job.key, e);
                        skipped.push(SkippedItem {
                            source: job.key.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(TransformResult { banks, skipped })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        for bank in &result.banks {
            self.write_everywhere(bank).await?;
        }

        if let Some(compression) = self.config.load.compression.as_ref().filter(|c| c.enabled) {
            let banks = self.stored_banks().await?;
            if banks.is_empty() {
                tracing::warn!("⚠️ No banks in {}, not writing {}", self.storage.locate(""), compression.filename);
                return Ok(self.storage.locate(""));
            }
            let zip = bundle_zip(&banks, chrono::Utc::now())?;
            tracing::debug!("Writing {} ({} bytes)", compression.filename, zip.len());
            self.storage.write_file(&compression.filename, &zip).await?;
            return Ok(self.storage.locate(&compression.filename));
        }

        Ok(self.storage.locate(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipelines::test_support::{document, question, MockStorage, ScriptedGenerator};
    use crate::config::toml_config::CompressionConfig;
    use std::io::Read;
    use tokio::time::Instant;

    fn config() -> QuizConfig {
        let mut config = QuizConfig::default();
        config.content.root = "site/pages".to_string();
        config.generator.questions_per_document = 2;
        config.generator.cooldown_seconds = 0;
        config
    }

    fn docs() -> Vec<MdxDocument> {
        vec![
            document("site/pages/javascript/closures.mdx", "Closures capture scope."),
            document("site/pages/react/hooks.mdx", "Hooks let you use state."),
            document("site/pages/index.mdx", "   "),
        ]
    }

    #[tokio::test]
    async fn test_transform_generates_one_bank_per_document() {
        let generator = ScriptedGenerator::default();
        let pipeline = QuizPipeline::new(MockStorage::default(), generator.clone(), config());

        let result = pipeline.transform(docs()).await.unwrap();

        let keys: Vec<&str> = result.banks.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["javascript_closures", "react_hooks"]);
        assert_eq!(result.question_count(), 4);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].reason, "empty body");
        assert_eq!(
            generator.calls().await,
            vec![
                ("Closures capture scope.".to_string(), 2),
                ("Hooks let you use state.".to_string(), 2),
            ]
        );
    }

    #[tokio::test]
    async fn test_existing_banks_are_skipped() {
        let storage = MockStorage::default();
        storage.write_file("react_hooks.json", b"[]").await.unwrap();

        let pipeline = QuizPipeline::new(storage.clone(), ScriptedGenerator::default(), config());
        let result = pipeline.transform(docs()).await.unwrap();
        assert_eq!(result.banks.len(), 1);
        assert!(result.skipped.iter().any(|s| s.reason.contains("already exists")));

        let mut forced = config();
        forced.generator.skip_existing = false;
        let pipeline = QuizPipeline::new(storage, ScriptedGenerator::default(), forced);
        assert_eq!(pipeline.transform(docs()).await.unwrap().banks.len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_documents_are_skipped() {
        let mut config = config();
        config.generator.max_input_tokens = 5;
        let pipeline = QuizPipeline::new(MockStorage::default(), ScriptedGenerator::default(), config);

        let (planned, skipped) = pipeline.plan(&docs()).await.unwrap();
        assert!(planned.is_empty());
        assert_eq!(skipped.len(), 3);
        assert!(skipped[0].reason.contains("exceeds the limit of 5"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_not_fatal() {
        let generator = ScriptedGenerator::failing_on("Hooks");
        let mut config = config();
        config.generator.concurrent_requests = 4;
        config.generator.batch_size = 1;
        let pipeline = QuizPipeline::new(MockStorage::default(), generator, config);

        let result = pipeline.transform(docs()).await.unwrap();
        assert_eq!(result.banks.len(), 1);
        assert_eq!(result.banks[0].key, "javascript_closures");
        assert!(result
            .skipped
            .iter()
            .any(|s| s.source == "react_hooks" && s.reason.contains("scripted failure")));
    }

    #[tokio::test]
    async fn test_load_merges_and_mirrors() {
        let storage = MockStorage::default();
        let mirror = MockStorage::default();
        storage
            .write_file(
                "react_hooks.json",
                &crate::core::bank::to_pretty_json(&[question("Old question")]).unwrap(),
            )
            .await
            .unwrap();

        let mut config = config();
        config.load.compression = Some(CompressionConfig {
            enabled: true,
            filename: "bundle.zip".to_string(),
        });
        let pipeline = QuizPipeline::new(storage.clone(), ScriptedGenerator::default(), config)
            .with_mirrors(vec![mirror.clone()]);

        let result = TransformResult {
            banks: vec![QuestionBank {
                key: "react_hooks".to_string(),
                questions: vec![question("Old question"), question("New question")],
            }],
            skipped: vec![],
        };
        let output = pipeline.load(result).await.unwrap();
        assert_eq!(output, "mock://bundle.zip");

        let saved: Vec<Question> =
            serde_json::from_slice(&storage.get("react_hooks.json").await.unwrap()).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(
            mirror.get("react_hooks.json").await,
            storage.get("react_hooks.json").await
        );
        assert!(storage.get("bundle.zip").await.is_some());
    }

    fn bundled_keys(zip: Vec<u8>) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip)).unwrap();
        let mut manifest = String::new();
        archive
            .by_name("manifest.json")
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
        manifest["banks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["key"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_bundle_keeps_banks_from_earlier_runs() {
        let storage = MockStorage::default();
        let mut config = config();
        config.load.compression = Some(CompressionConfig {
            enabled: true,
            filename: "bundle.zip".to_string(),
        });
        let pipeline = QuizPipeline::new(storage.clone(), ScriptedGenerator::default(), config);

        let first = pipeline.transform(docs()).await.unwrap();
        pipeline.load(first).await.unwrap();
        assert_eq!(
            bundled_keys(storage.get("bundle.zip").await.unwrap()),
            vec!["javascript_closures", "react_hooks"]
        );

        // every page already has a bank, so nothing new is generated
        let rerun = pipeline.transform(docs()).await.unwrap();
        assert!(rerun.banks.is_empty());
        assert_eq!(pipeline.load(rerun).await.unwrap(), "mock://bundle.zip");
        assert_eq!(
            bundled_keys(storage.get("bundle.zip").await.unwrap()),
            vec!["javascript_closures", "react_hooks"]
        );
    }

    #[tokio::test]
    async fn test_empty_output_writes_no_bundle() {
        let storage = MockStorage::default();
        let mut config = config();
        config.load.compression = Some(CompressionConfig {
            enabled: true,
            filename: "bundle.zip".to_string(),
        });
        let pipeline = QuizPipeline::new(storage.clone(), ScriptedGenerator::default(), config);

        let output = pipeline.load(TransformResult::default()).await.unwrap();
        assert_eq!(output, "mock://");
        assert!(storage.get("bundle.zip").await.is_none());
    }

    fn numbered_docs(n: usize) -> Vec<MdxDocument> {
        (1..=n)
            .map(|i| document(&format!("site/pages/page{}.mdx", i), &format!("Page {} body.", i)))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_between_batches() {
        let mut config = config();
        config.generator.batch_size = 1;
        config.generator.cooldown_seconds = 30;
        let generator = ScriptedGenerator::default();
        let pipeline = QuizPipeline::new(MockStorage::default(), generator.clone(), config);

        let started = Instant::now();
        let result = pipeline.transform(numbered_docs(3)).await.unwrap();

        assert_eq!(result.banks.len(), 3);
        assert_eq!(generator.calls().await.len(), 3);
        // no pause before the first batch
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(60), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(90), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_in_a_batch_run_concurrently() {
        let mut config = config();
        config.generator.batch_size = 10;
        config.generator.concurrent_requests = 2;
        let generator = ScriptedGenerator::default().with_delay(Duration::from_secs(5));
        let pipeline = QuizPipeline::new(MockStorage::default(), generator.clone(), config);

        let started = Instant::now();
        let result = pipeline.transform(numbered_docs(4)).await.unwrap();

        let keys: Vec<&str> = result.banks.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["page1", "page2", "page3", "page4"]);
        assert_eq!(generator.peak_in_flight(), 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(15), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_request_at_a_time() {
        let mut config = config();
        config.generator.concurrent_requests = 1;
        let generator = ScriptedGenerator::default().with_delay(Duration::from_secs(5));
        let pipeline = QuizPipeline::new(MockStorage::default(), generator.clone(), config);

        let started = Instant::now();
        pipeline.transform(numbered_docs(3)).await.unwrap();
        assert_eq!(generator.peak_in_flight(), 1);
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_extract_reads_content_root() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("dotnet")).unwrap();
        std::fs::write(
            dir.path().join("dotnet/clr.mdx"),
            "---\ntitle: CLR\n---\nThe runtime.",
        )
        .unwrap();

        let mut config = config();
        config.content.root = dir.path().to_string_lossy().into_owned();
        let pipeline = QuizPipeline::new(MockStorage::default(), ScriptedGenerator::default(), config);

        let docs = pipeline.extract().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].front_matter.title(), Some("CLR"));
        assert_eq!(naming::bank_key(&docs[0].path, dir.path()), "dotnet_clr");
        assert!(docs[0].path.ends_with("dotnet/clr.mdx"));
    }
}
