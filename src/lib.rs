pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{openai::OpenAiGenerator, storage::LocalStorage, store::JsonFileStore};
pub use app::pipelines::{PublishPipeline, QuizPipeline, TopicPipeline};
pub use config::QuizConfig;
pub use core::etl::{EtlEngine, RunSummary};
pub use utils::error::{QuizError, Result};
