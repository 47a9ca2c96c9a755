pub mod publish_pipeline;
pub mod quiz_pipeline;
pub mod topic_pipeline;

#[cfg(test)]
pub(crate) mod test_support;

pub use publish_pipeline::{PublishCounts, PublishOutcome, PublishPipeline};
pub use quiz_pipeline::QuizPipeline;
pub use topic_pipeline::TopicPipeline;
