use std::sync::Arc;

use clap::Parser;

use agri_quote::utils::{logger, validation::Validate};
use agri_quote::{
    AppConfig, BulkOrchestrator, ChirpsClient, Cli, CropRegistry, JsonFieldStore, QuoteEngine,
    QuoteRequest, StaticZoneLookup, TemplateNarrative,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::info!("starting agri-quote");
    if cli.verbose {
        tracing::debug!("cli arguments: {:?}", cli);
    }

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(endpoint) = &cli.endpoint {
        config.provider.endpoint = endpoint.clone();
    }
    if let Err(e) = config.validate() {
        tracing::error!("configuration validation failed: {}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }

    let provider = Arc::new(ChirpsClient::new(&config.provider)?);
    let registry = Arc::new(CropRegistry::new()?);
    let engine = QuoteEngine::new(
        provider,
        registry,
        Arc::new(StaticZoneLookup::new()),
        config.engine.clone(),
    )
    .with_narrative(Arc::new(TemplateNarrative));

    if let Some(path) = &cli.requests {
        let content = std::fs::read_to_string(path)?;
        let requests: Vec<QuoteRequest> = serde_json::from_str(&content)?;
        tracing::info!(requests = requests.len(), "running bulk quotes");

        let mut orchestrator = BulkOrchestrator::new(engine, config.bulk.max_concurrent);
        if let Some(fields_path) = &cli.fields {
            let store = JsonFieldStore::from_file(fields_path)?;
            tracing::debug!(fields = store.len(), "field store loaded");
            orchestrator = orchestrator.with_field_store(Arc::new(store));
        }

        let outcomes = orchestrator.run(requests).await;
        let failed = outcomes.iter().filter(|o| o.as_failure().is_some()).count();
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        if failed > 0 {
            tracing::warn!(failed, total = outcomes.len(), "batch finished with failures");
        } else {
            tracing::info!(total = outcomes.len(), "batch finished");
        }
    } else {
        let request = cli.single_request()?;
        match engine.quote(&request).await {
            Ok(quote) => {
                tracing::info!(
                    crop = %quote.crop,
                    premium_rate = quote.premium_rate,
                    "quote completed"
                );
                println!("{}", serde_json::to_string_pretty(&quote)?);
            }
            Err(e) => {
                tracing::error!("quote failed: {}", e);
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
