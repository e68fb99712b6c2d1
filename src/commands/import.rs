use anyhow::Result;
use michiru::{
    config::Config,
    import::{DumpInput, ImportPipeline},
    shutdown::{listen_for_signals, Shutdown},
};
use std::path::PathBuf;
use tracing::info;

pub async fn import(config: Config, dump_file: Option<PathBuf>) -> Result<()> {
    let input = DumpInput::resolve(dump_file, config.import.dump_url.as_deref())?;
    let engine = super::connect(&config)?;

    let (trigger, shutdown) = Shutdown::channel();
    tokio::spawn(listen_for_signals(trigger));

    info!("Importing into {}", config.engine.index_name);
    let stats = ImportPipeline::new(engine, &config, shutdown)
        .run(&input)
        .await?;

    println!("\nImport Complete!");
    println!("================");
    println!("Documents imported: {}", stats.documents_imported);
    println!("Records skipped:    {}", stats.records_skipped);
    println!("Dump size:          {} bytes", stats.bytes_processed);
    println!("Processing rate:    {:.1} docs/sec", stats.docs_per_second);
    println!("Elapsed time:       {:.1}s", stats.elapsed_seconds);

    Ok(())
}
