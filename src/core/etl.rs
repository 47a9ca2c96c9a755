use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pipeline: String,
    pub extracted: usize,
    pub banks: usize,
    pub questions: usize,
    pub skipped: usize,
    pub output: String,
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} item(s) read, {} bank(s) with {} question(s), {} skipped in {:.1?} -> {}",
            self.pipeline,
            self.extracted,
            self.banks,
            self.questions,
            self.skipped,
            self.elapsed,
            self.output
        )
    }
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let name = self.pipeline.name().to_string();
        tracing::info!("🚀 Starting {} pipeline", name);
        self.monitor.log_stats("start");

        tracing::info!("📥 Extracting...");
        let items = self.pipeline.extract().await?;
        let extracted = items.len();
        tracing::info!("Extracted {} item(s)", extracted);
        self.monitor.log_stats("extract");

        tracing::info!("🛠️ Transforming...");
        let result = self.pipeline.transform(items).await?;
        let banks = result.banks.len();
        let questions = result.question_count();
        let skipped = result.skipped.len();
        for item in &result.skipped {
            tracing::debug!("Skipped {}: {}", item.source, item.reason);
        }
        tracing::info!(
            "Transformed into {} bank(s), {} question(s), {} skipped",
            banks,
            questions,
            skipped
        );
        self.monitor.log_stats("transform");

        tracing::info!("💾 Loading...");
        let output = self.pipeline.load(result).await?;
        tracing::info!("📁 Load result: {}", output);
        self.monitor.log_stats("load");
        self.monitor.log_final_stats();

        Ok(RunSummary {
            pipeline: name,
            extracted,
            banks,
            questions,
            skipped,
            output,
            elapsed: started.elapsed(),
        })
    }
}
