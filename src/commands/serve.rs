use anyhow::Result;
use michiru::{
    config::Config,
    http::{AppState, HttpServer},
    shutdown::{listen_for_signals, Shutdown},
};
use tracing::info;

pub async fn serve(config: Config) -> Result<()> {
    let engine = super::connect(&config)?;
    let state = AppState::new(engine, &config.engine);

    let (trigger, shutdown) = Shutdown::channel();
    tokio::spawn(listen_for_signals(trigger));

    info!("Searching index {}", config.engine.index_name);
    HttpServer::new(config.server, state).run(shutdown).await
}
