use todo_service::adapters::{AppState, HttpServer};
use todo_service::config::AppConfig;
use todo_service::storage::StoreAccessor;
use todo_service::storage::sqlite::SqliteStore;

#[cfg(feature = "tracing")]
fn init_tracing(format: todo_service::config::LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()));
    match format {
        todo_service::config::LogFormat::Json => builder.json().init(),
        todo_service::config::LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    #[cfg(feature = "tracing")]
    init_tracing(config.log_format);

    let store_config = config.clone();
    let store = StoreAccessor::lazy(move || {
        let config = store_config.clone();
        async move {
            SqliteStore::open(&config.database_url, config.max_connections, config.store_timeout)
                .await
        }
    });

    let server = HttpServer::new(AppState::new(store), &config.http()).await?;
    server.run().await
}
