use std::sync::Arc;

use chrono::Local;
use futures_util::future::join_all;
use tracing::{info, error, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crpt_api::api::CrptApi;
use crpt_api::config::{Config, LogFormat};
use crpt_api::document::{Description, Document, Product};
use crpt_api::error::{AppError, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Load Config
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config)?;

    info!("Starting CRPT document client...");
    info!(
        "Endpoint: {} | Limit: {} requests per {:?}",
        config.endpoint_url,
        config.request_limit,
        config.time_unit.duration()
    );

    let api = Arc::new(CrptApi::from_config(&config)?);

    let submissions = (0..config.demo_documents).map(|_| {
        let api = api.clone();
        let signature = config.signature.clone();
        async move {
            let document = demo_document();
            match api.submit(&document, &signature).await {
                Ok(()) => info!("Document {} created", document.doc_id),
                Err(e) => error!("Document {} failed: {}", document.doc_id, e),
            }
        }
    });

    tokio::select! {
        _ = join_all(submissions) => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning pending submissions");
        }
    }

    info!("Shutting down...");
    api.shutdown();
    api.stats().log_stats();

    Ok(())
}

fn init_logging(config: &Config) -> Result<()> {
    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| AppError::Init(format!("Invalid log level {}: {}", config.log_level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    Ok(())
}

/// Sample "introduce goods" document with a single product.
fn demo_document() -> Document {
    let today = Local::now().format("%Y-%m-%d").to_string();

    Document {
        description: Description {
            participant_inn: "0123456789".into(),
        },
        doc_id: Uuid::new_v4().to_string(),
        doc_status: "NEW".into(),
        doc_type: "LP_INTRODUCE_GOODS".into(),
        import_request: true,
        owner_inn: "4455667788".into(),
        participant_inn: "1212121212".into(),
        producer_inn: "3434343434".into(),
        production_date: today.clone(),
        production_type: "TYPE".into(),
        products: vec![Product {
            certificate_document: "doc".into(),
            certificate_document_date: today.clone(),
            certificate_document_number: "123".into(),
            owner_inn: "9988776655".into(),
            producer_inn: "5544332211".into(),
            production_date: today.clone(),
            tnved_code: "0000".into(),
            uit_code: "1111".into(),
            uitu_code: "2222".into(),
        }],
        reg_date: today,
        reg_number: "987654321".into(),
    }
}
