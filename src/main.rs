use clap::Parser;
use member_query::core::render::SqlFilter;
use member_query::utils::error::{ErrorSeverity, QueryError};
use member_query::utils::{logger, validation::Validate};
use member_query::{CliConfig, FixtureConfig, InMemoryStore, QueryFactory};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting member-query CLI");
    tracing::debug!("CLI config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(&config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!(
                "❌ Search failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }
    }
}

async fn run(config: &CliConfig) -> Result<(), QueryError> {
    let fixtures = match &config.fixtures {
        Some(path) => {
            tracing::info!("📁 Loading fixtures from: {}", path);
            FixtureConfig::from_file(path)?
        }
        None => FixtureConfig::default(),
    };
    fixtures.validate()?;

    let store = InMemoryStore::new();
    fixtures.seed(&store).await?;
    let factory = QueryFactory::new(store);

    let search = config.search();
    let condition = search.condition();
    if config.show_sql {
        let filter = SqlFilter::from_condition(&condition);
        println!("{}", serde_json::to_string_pretty(&filter)?);
    }

    let mut query = search.query().offset(config.offset);
    if let Some(limit) = config.limit {
        query = query.limit(limit);
    }

    let results = factory.fetch_results(&query).await?;
    tracing::info!(
        "✅ {} of {} matching members returned",
        results.results.len(),
        results.total
    );
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
