use anyhow::Result;
use michiru::{
    config::Config,
    index::{IndexSynchronizer, TaskWaiter},
    shutdown::{listen_for_signals, Shutdown},
};

pub async fn reset(config: Config, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("Refusing to delete every index without --yes");
    }

    let engine = super::connect(&config)?;

    let (trigger, shutdown) = Shutdown::channel();
    tokio::spawn(listen_for_signals(trigger));

    let waiter = TaskWaiter::new(engine.clone())
        .with_timeout(config.engine.task_timeout())
        .with_poll_interval(config.engine.task_poll_interval())
        .with_shutdown(shutdown);
    let synchronizer = IndexSynchronizer::new(
        engine,
        waiter,
        config.engine.index_name,
        config.engine.metadata_index,
    );

    let deleted = synchronizer.reset_all().await?;
    println!("Deleted {} indexes", deleted);
    Ok(())
}
