use clap::Parser;
use firehol_fetcher::utils::error::EtlError;
use firehol_fetcher::utils::{logger, validation::Validate};
use firehol_fetcher::{BlocklistPipeline, CliConfig, EtlEngine, LocalStorage};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting firehol-fetcher");
    tracing::debug!("CLI config: {:?}", cli);

    let config = match cli.resolve().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            exit_with(&e);
        }
    };

    tracing::info!(
        "{} sources, data -> {}, summary -> {}",
        config.sources.len(),
        config.data_dir,
        config.assets_dir
    );

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    // Output paths are relative to the directory the tool is started from.
    let storage = LocalStorage::new(".");
    let pipeline = BlocklistPipeline::new(storage, config)?;
    let engine = EtlEngine::new_with_monitoring(pipeline, cli.monitor);

    match engine.run().await {
        Ok(report) => {
            if !report.failed.is_empty() {
                tracing::warn!(
                    "{} of {} lists could not be downloaded",
                    report.failed.len(),
                    report.failed.len() + report.updated.len()
                );
            }
        }
        Err(e) => {
            tracing::error!("❌ Run aborted ({:?}): {}", e.category(), e);
            exit_with(&e);
        }
    }

    Ok(())
}

fn exit_with(e: &EtlError) -> ! {
    tracing::error!("💡 {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    std::process::exit(e.severity().exit_code())
}
