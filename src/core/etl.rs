use crate::core::{
    Aggregator, CountDelta, FailedSource, FetchOutcome, FetchReport, Pipeline, SourceDefinition,
};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs every source through the pipeline in order, then writes the summary.
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

    /// A failed download only skips that source; storage and serialization
    /// errors abort the run.
    pub async fn run(&self) -> Result<FetchReport> {
        let sources = self.pipeline.sources();
        tracing::info!("Fetching {} blocklists", sources.len());

        let mut aggregator = Aggregator::new();
        let mut updated = Vec::with_capacity(sources.len());
        let mut failed = Vec::new();

        for source in sources {
            match self.fetch_and_update(source, &mut aggregator).await {
                Ok(outcome) => {
                    report_outcome(&outcome);
                    updated.push(outcome);
                }
                Err(e) if e.is_source_local() => {
                    tracing::warn!("Skipping {}: {} ({})", source.name, e, e.recovery_suggestion());
                    println!("Error downloading {}: {}", source.name, e);
                    failed.push(FailedSource {
                        list_name: source.name.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
            self.monitor.log_stats(&source.name);
        }

        let summary = self.pipeline.finalize(&aggregator).await?;
        println!("{} updated.", summary.details_path);
        println!(
            "{} created with {} unique IPs.",
            summary.union_path, summary.summary.total_unique_ips
        );
        tracing::info!(
            "Run finished: {} lists updated, {} failed, {} unique IPs",
            updated.len(),
            failed.len(),
            summary.summary.total_unique_ips
        );
        self.monitor.log_final_stats();

        Ok(FetchReport {
            updated,
            failed,
            summary,
        })
    }

    async fn fetch_and_update(
        &self,
        source: &SourceDefinition,
        aggregator: &mut Aggregator,
    ) -> Result<FetchOutcome> {
        println!("Downloading {}...", source.name);

        let body = self.pipeline.extract(source).await?;
        let entries = self.pipeline.transform(&body);
        tracing::debug!("Parsed {} entries for {}", entries.len(), source.name);

        self.pipeline.load(source, entries, aggregator).await
    }
}

fn report_outcome(outcome: &FetchOutcome) {
    println!(
        "Updated {}: {} IPs -> {} IPs",
        outcome.list_name,
        outcome.old_count(),
        outcome.new_count
    );
    println!("  {}", outcome.delta);

    if outcome.delta != CountDelta::Unchanged {
        tracing::info!(
            "{}: {} -> {} ({:+})",
            outcome.list_name,
            outcome.old_count(),
            outcome.new_count,
            outcome.delta.signed()
        );
    }
}
