use store_server::core::{Config, Server, ServerState};
use store_server::utils::init_logger_with_file;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    info!(
        port = config.http_port,
        db = %config.db_path,
        "Starting store server"
    );

    let state = ServerState::initialize(config).await?;
    Server::new(state).run().await?;
    Ok(())
}
