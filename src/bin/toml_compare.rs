use anyhow::Context;
use clap::Parser;
use hotel_compare::config::toml_config::TomlConfig;
use hotel_compare::domain::model::CompareRequest;
use hotel_compare::domain::ports::ConfigProvider;
use hotel_compare::utils::{logger, validation::Validate};
use hotel_compare::HotelComparator;

#[derive(Parser)]
#[command(name = "toml-compare")]
#[command(about = "Hotel price comparison with TOML configuration support")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "hotel-compare.toml")]
    config: String,

    /// City to search
    #[arg(long)]
    city: Option<String>,

    #[arg(long)]
    min_price: Option<f64>,

    #[arg(long)]
    max_price: Option<f64>,

    /// Print a health report instead of comparing
    #[arg(long)]
    health: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dry run - show the resolved configuration without contacting suppliers
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based hotel comparison");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No supplier will be contacted");
        return Ok(());
    }

    let comparator = HotelComparator::from_config(&config);
    let outcome = run(&args, &comparator).await;
    comparator.shutdown().await;

    println!("{}", outcome?);
    Ok(())
}

async fn run(args: &Args, comparator: &HotelComparator) -> anyhow::Result<String> {
    if args.health {
        let report = comparator.health().await;
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    let city = args
        .city
        .clone()
        .context("--city is required unless --health is given")?;
    let request = CompareRequest::new(city, args.min_price, args.max_price);

    let hotels = comparator
        .compare(&request)
        .await
        .with_context(|| format!("comparison for '{}' failed", request.city))?;
    tracing::info!("✅ Found {} hotels for {}", hotels.len(), request.city);

    Ok(serde_json::to_string_pretty(&hotels)?)
}

fn display_config_summary(config: &TomlConfig) {
    tracing::info!("📋 Configuration Summary:");
    tracing::info!("  Service: {}", config.service_name());
    for supplier in config.suppliers() {
        tracing::info!(
            "  Supplier: {} -> {} (timeout {:?})",
            supplier.id,
            supplier.endpoint,
            supplier.timeout
        );
    }

    let cache = config.cache_config();
    match &cache.redis_url {
        Some(url) => tracing::info!("  Cache: Redis at {} with in-memory fallback", url),
        None => tracing::info!("  Cache: in-memory only"),
    }

    let workflow = config.workflow_config();
    if workflow.enabled {
        tracing::info!(
            "  Workflow: queue '{}', {} attempts, step timeout {:?}",
            workflow.task_queue,
            workflow.max_attempts,
            workflow.step_timeout
        );
    } else {
        tracing::info!("  Workflow: disabled, direct execution only");
    }
}
