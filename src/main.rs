use anyhow::Result;
use ingredient_guard::bot::{self, BotContext};
use ingredient_guard::config::AppConfig;
use ingredient_guard::db;
use ingredient_guard::errors::error_logging;
use ingredient_guard::instance_manager::OcrInstanceManager;
use ingredient_guard::localization;
use ingredient_guard::observability;
use ingredient_guard::scanner::ScanService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::{Duration, Instant};
use teloxide::prelude::*;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let startup = Instant::now();

    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    observability::init_tracing(&config.observability)?;

    if let Err(e) = config.validate() {
        error_logging::log_config_error(&e, "app_config", "startup_validation");
        return Err(e.into());
    }
    info!("{}", config.summary());

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await?;

    db::init_database_schema(&pool).await?;

    // Wrap pool in Arc for sharing across async tasks
    let shared_pool = Arc::new(pool);

    observability::init_metrics_server(
        config.server.metrics_port,
        Some(Arc::clone(&shared_pool)),
        config.ocr.languages.clone(),
    )
    .await?;

    let localization_manager = localization::create_localization_manager()?;

    let instance_manager = Arc::new(OcrInstanceManager::new());
    let scanner = Arc::new(ScanService::new(
        Arc::clone(&shared_pool),
        config.ocr.clone(),
        instance_manager,
    ));

    let app = Arc::new(BotContext {
        pool: Arc::clone(&shared_pool),
        localization: localization_manager,
        scanner,
        scan_config: config.scan.clone(),
    });

    // Initialize the bot with custom client configuration for better reliability
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.bot.http_timeout_secs))
        .build()?;

    let bot = Bot::with_client(config.bot.token.clone(), client);

    observability::record_startup_metrics(startup.elapsed());
    info!(
        http_timeout_secs = config.bot.http_timeout_secs,
        "Bot initialized, starting dispatcher"
    );

    let handler = dptree::entry().branch(Update::filter_message().endpoint({
        let app = Arc::clone(&app);
        move |bot: Bot, msg: Message| {
            let app = Arc::clone(&app);
            async move { bot::message_handler(bot, msg, app).await }
        }
    }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
