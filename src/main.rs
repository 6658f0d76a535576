use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use wit_estimator::config::LogFormat;
use wit_estimator::utils::error::{EstimatorError, ErrorSeverity};
use wit_estimator::utils::{logger, validation::Validate};
use wit_estimator::{AppState, AzureDevOpsConnector, CliConfig, RecalculationSettings};

fn exit_code(e: &EstimatorError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: EstimatorError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            fail(e);
        }
    };

    logger::init_logger(
        config.logging.verbose,
        config.logging.format == LogFormat::Json,
    );
    tracing::info!("Starting wit-estimator");
    tracing::debug!("Effective config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed");
        fail(e);
    }

    let connector = match AzureDevOpsConnector::from_config(&config) {
        Ok(connector) => connector,
        Err(e) => fail(e),
    };
    let state = Arc::new(AppState {
        connector,
        settings: RecalculationSettings::from_config(&config),
    });

    let listener = match TcpListener::bind(config.bind_address()).await {
        Ok(listener) => listener,
        Err(e) => fail(EstimatorError::Io(e)),
    };

    wit_estimator::serve(listener, state).await?;
    Ok(())
}
