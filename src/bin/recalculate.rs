use clap::Parser;
use wit_estimator::config::LogFormat;
use wit_estimator::core::{ConfigProvider, TrackerConnector};
use wit_estimator::utils::error::ErrorSeverity;
use wit_estimator::utils::validation::{self, Validate};
use wit_estimator::utils::logger;
use wit_estimator::{AzureDevOpsConnector, CliConfig, EstimateRecalculator, RecalculationSettings};

const TOKEN_ENV: &str = "AZURE_DEVOPS_PAT";

/// 不經過 webhook，直接對設定的專案執行一次重新計算
#[derive(Debug, Parser)]
#[command(name = "recalculate")]
#[command(about = "Runs one estimate recalculation pass without the webhook server")]
struct Args {
    #[command(flatten)]
    config: CliConfig,

    #[arg(long, help = "Personal access token (defaults to $AZURE_DEVOPS_PAT)")]
    token: Option<String>,

    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

/// `--token` wins over the environment; one of them must be set.
fn resolve_token(flag: Option<String>, env: Option<String>) -> wit_estimator::Result<String> {
    let token = flag.or(env);
    validation::validate_required_field(&format!("--token or ${}", TOKEN_ENV), &token).cloned()
}

async fn run(args: &Args) -> wit_estimator::Result<()> {
    let config = args.config.load()?;
    logger::init_logger(
        config.logging.verbose,
        config.logging.format == LogFormat::Json,
    );
    config.validate()?;

    let token = resolve_token(args.token.clone(), std::env::var(TOKEN_ENV).ok())?;

    tracing::info!(
        "🔄 Recalculating estimates in {} for {:?}",
        config.organization_url(),
        config.target_projects()
    );

    let tracker = AzureDevOpsConnector::from_config(&config)?.connect(&token)?;
    let recalculator = EstimateRecalculator::new(tracker, RecalculationSettings::from_config(&config));
    let report = recalculator.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for project in &report.projects {
            println!("📁 {}", project.project);
            println!("   work items: {}", project.work_items_found);
            for item in &project.updated {
                println!("   ✅ #{} -> {}", item.id, item.total);
            }
            for id in &project.skipped {
                println!("   ⏭️ #{} skipped (missing inputs)", id);
            }
            for failure in &project.failed {
                println!("   ❌ #{}: {}", failure.id, failure.error);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args).await {
        tracing::error!("❌ Recalculation failed: {} (Category: {:?})", e, e.category());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}
