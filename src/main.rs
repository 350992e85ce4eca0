use clap::Parser;
use hotel_compare::domain::model::CompareRequest;
use hotel_compare::utils::error::{CompareError, ErrorSeverity};
use hotel_compare::utils::logger;
use hotel_compare::utils::validation::{validate_required_field, Validate};
use hotel_compare::{CliConfig, HotelComparator};
use serde::Serialize;

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, CompareError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn exit_code(e: &CompareError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn report_failure(e: &CompareError) -> ! {
    tracing::error!(
        "❌ Hotel comparison failed: {} (Kind: {:?}, Severity: {:?})",
        e,
        e.kind(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e).max(1));
}

async fn run(config: &CliConfig, comparator: &HotelComparator) -> Result<String, CompareError> {
    if config.health {
        let report = comparator.health().await;
        tracing::info!("🩺 Health status: {:?}", report.status);
        return to_json(&report, config.pretty);
    }

    let city = validate_required_field("city", &config.city)?.clone();
    let request = CompareRequest::new(city, config.min_price, config.max_price);

    let hotels = comparator.compare(&request).await?;
    tracing::info!("✅ Found {} hotels for {}", hotels.len(), request.city);
    to_json(&hotels, config.pretty)
}

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting hotel-compare CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        report_failure(&e);
    }

    let comparator = HotelComparator::from_config(&config);
    let outcome = run(&config, &comparator).await;
    comparator.shutdown().await;

    match outcome {
        Ok(json) => println!("{}", json),
        Err(e) => report_failure(&e),
    }
}
