use clap::Parser;
use mdx_quiz::adapters::storage::LocalStorage;
use mdx_quiz::config::cli::{ExportArgs, GenerateArgs, PublishArgs, TopicArgs};
use mdx_quiz::config::{Cli, Command, QuizConfig};
use mdx_quiz::core::links::{classify, extract_links};
use mdx_quiz::core::lint::{lint_documents, LintOptions};
use mdx_quiz::core::{bank, export, mdx, naming, tokens, Pipeline, QuestionStore};
use mdx_quiz::utils::error::{QuizError, Result};
use mdx_quiz::utils::{logger, validation::Validate};
use mdx_quiz::{EtlEngine, JsonFileStore, OpenAiGenerator, PublishPipeline, QuizPipeline, TopicPipeline};
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose, cli.log_format);

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(path) = &cli.config {
        tracing::info!("📁 Loading configuration from: {}", path.display());
    }
    let mut config = QuizConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Command::Scan(args) | Command::Links(args) => args.apply(&mut config),
        Command::Lint(args) => args.apply(&mut config),
        Command::Generate(args) => args.apply(&mut config),
        Command::Topic(args) => args.apply(&mut config),
        Command::Publish(args) => args.apply(&mut config),
        Command::Export(_) => {}
    }

    config.validate()?;
    tracing::debug!("Configuration: {:?}", config);

    let monitor = cli.monitor || config.monitoring_enabled();
    if monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    match cli.command {
        Command::Scan(_) => scan(&config),
        Command::Lint(_) => lint(&config),
        Command::Links(_) => links(&config),
        Command::Generate(args) => generate(config, &args, monitor).await,
        Command::Topic(args) => topic(config, &args, monitor).await,
        Command::Publish(args) => publish(config, &args, monitor).await,
        Command::Export(args) => export_csv(&config, &args),
    }
}

fn scan(config: &QuizConfig) -> Result<()> {
    let root = config.content_root();
    let docs = mdx::read_all(&root)?;
    let links = extract_links(&docs);

    for doc in &docs {
        let key = naming::bank_key(&doc.path, &root);
        let title = doc.front_matter.title().unwrap_or("-");
        let link_count = links.get(&doc.path).map_or(0, Vec::len);
        let estimate = doc.body.as_deref().map_or(0, tokens::estimate_tokens);
        match &doc.error {
            Some(error) => println!("{}\t{}\terror: {}", key, doc.path.display(), error),
            None => println!("{}\t{}\t{} link(s)\t~{} tokens", key, title, link_count, estimate),
        }
    }
    println!("{} document(s) in {}", docs.len(), root.display());
    Ok(())
}

fn links(config: &QuizConfig) -> Result<()> {
    let docs = mdx::read_all(&config.content_root())?;

    for (path, links) in extract_links(&docs) {
        if links.is_empty() {
            continue;
        }
        println!("{}", path.display());
        for link in links {
            println!("  [{}] {} ({})", link.text, link.url, classify(&link.url));
        }
    }
    Ok(())
}

fn lint(config: &QuizConfig) -> Result<()> {
    let root = config.content_root();
    let docs = mdx::read_all(&root)?;
    let options = LintOptions {
        root,
        public_dir: config.lint.public_dir.as_ref().map(PathBuf::from),
    };

    let report = lint_documents(&docs, &options);
    for issue in &report.issues {
        println!("{}", issue);
    }
    println!(
        "{} document(s) checked: {} error(s), {} warning(s)",
        report.documents,
        report.error_count(),
        report.warning_count()
    );

    match report.error_count() {
        0 => Ok(()),
        errors => Err(QuizError::LintError { errors }),
    }
}

fn generator(config: &QuizConfig) -> Result<OpenAiGenerator> {
    let api_key = config.api_key()?;
    let generator = OpenAiGenerator::new(&config.generator, api_key)?;
    tracing::info!("🤖 Using model {} at {}", generator.model(), config.generator.endpoint);
    Ok(generator)
}

async fn generate(config: QuizConfig, args: &GenerateArgs, monitor: bool) -> Result<()> {
    let storage = LocalStorage::new(config.output_path());
    let mirrors = config
        .load
        .mirror_paths
        .iter()
        .map(|path| LocalStorage::new(path.as_str()))
        .collect();

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No model requests will be sent");
        let docs = mdx::read_all(&config.content_root())?;
        let pipeline = QuizPipeline::new(storage, NoGenerator, config);
        let (planned, skipped) = pipeline.plan(&docs).await?;
        for (key, estimate) in &planned {
            println!("generate\t{}.json\t~{} tokens", key, estimate);
        }
        for item in &skipped {
            println!("skip\t{}\t{}", item.source, item.reason);
        }
        println!("{} to generate, {} skipped", planned.len(), skipped.len());
        return Ok(());
    }

    let pipeline = QuizPipeline::new(storage, generator(&config)?, config).with_mirrors(mirrors);
    report(EtlEngine::new_with_monitoring(pipeline, monitor)).await
}

async fn topic(config: QuizConfig, args: &TopicArgs, monitor: bool) -> Result<()> {
    let storage = LocalStorage::new(config.output_path());

    if args.generate.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No model requests will be sent");
        let pipeline = TopicPipeline::new(storage, NoGenerator, config)?;
        let docs = pipeline.extract().await?;
        let (batches, _) = pipeline.batches(&docs);
        for (index, batch) in batches.iter().enumerate() {
            println!(
                "batch {}\t~{} tokens\t{}",
                index + 1,
                batch.tokens,
                batch.documents.join(", ")
            );
        }
        println!("{} batch(es) for {}", batches.len(), pipeline.bank_path());
        return Ok(());
    }

    let pipeline = TopicPipeline::new(storage, generator(&config)?, config)?;
    report(EtlEngine::new_with_monitoring(pipeline, monitor)).await
}

async fn publish(config: QuizConfig, args: &PublishArgs, monitor: bool) -> Result<()> {
    match config.publish.backend.as_str() {
        "mongo" => publish_to(mongo_store(&config).await?, &config, args, monitor).await,
        _ => {
            let store = JsonFileStore::new(&config.publish.store_dir, &config.publish.collection);
            tracing::info!("🗄️ Publishing into {}", store.path().display());
            publish_to(store, &config, args, monitor).await
        }
    }
}

async fn publish_to<Q: QuestionStore>(
    store: Q,
    config: &QuizConfig,
    args: &PublishArgs,
    monitor: bool,
) -> Result<()> {
    let pipeline = PublishPipeline::new(store, config).with_dry_run(args.dry_run);
    report(EtlEngine::new_with_monitoring(pipeline, monitor)).await
}

#[cfg(feature = "mongo")]
async fn mongo_store(config: &QuizConfig) -> Result<mdx_quiz::adapters::mongo::MongoStore> {
    let credential = |name: &str| {
        std::env::var(name).map_err(|_| QuizError::MissingConfigError {
            field: name.to_string(),
        })
    };
    use mdx_quiz::config::toml_config::{MONGO_PASSWORD_ENV, MONGO_USERNAME_ENV};

    let uri = config.mongo_uri(&credential(MONGO_USERNAME_ENV)?, &credential(MONGO_PASSWORD_ENV)?)?;
    mdx_quiz::adapters::mongo::MongoStore::connect(
        &uri,
        &config.publish.database,
        &config.publish.collection,
    )
    .await
}

#[cfg(not(feature = "mongo"))]
async fn mongo_store(_config: &QuizConfig) -> Result<JsonFileStore> {
    Err(QuizError::ConfigError {
        message: "the mongo backend requires building with `--features mongo`".to_string(),
    })
}

fn export_csv(config: &QuizConfig, args: &ExportArgs) -> Result<()> {
    let source = args.source.clone().unwrap_or_else(|| config.output_path());
    let banks = bank::read_bank_dir(&source)?;
    let csv = export::questions_csv(&banks)?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&args.output, csv)?;

    let questions: usize = banks.iter().map(|b| b.questions.len()).sum();
    println!(
        "✅ Exported {} question(s) from {} bank(s) to {}",
        questions,
        banks.len(),
        args.output.display()
    );
    Ok(())
}

async fn report<P: Pipeline>(engine: EtlEngine<P>) -> Result<()> {
    let summary = engine.run().await?;
    tracing::info!("✅ {} pipeline completed successfully!", summary.pipeline);
    println!("✅ {}", summary);
    Ok(())
}

/// Stand-in generator for dry runs; never called.
struct NoGenerator;

#[async_trait::async_trait]
impl mdx_quiz::core::QuestionGenerator for NoGenerator {
    async fn generate(&self, _text: &str, _count: usize) -> Result<Vec<mdx_quiz::core::Question>> {
        Err(QuizError::GenerationError {
            message: "dry run".to_string(),
        })
    }
}
