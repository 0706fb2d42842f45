//! Harvester - crawl Exchange mailboxes into JSON lines

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use harvest::{
    EwsClient, FolderSyncTokenStore, HarvestSettings, JsonLinesSink, LastSyncStore,
    NoCheckpoints, SqliteCheckpointStore, harvest,
};
use log::{error, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Bootstrap config directory
    config::init()?;

    let mut settings = HarvestSettings::load(cli.config.as_deref())?;
    if let Some(mode) = cli.mode {
        settings.sync_mode = mode.into();
    }
    let mailboxes = if cli.mailboxes.is_empty() {
        settings.mailboxes.clone()
    } else {
        cli.mailboxes
    };
    if mailboxes.is_empty() {
        anyhow::bail!("No mailboxes configured; pass --mailbox or set \"mailboxes\" in settings");
    }

    let client = EwsClient::new(&settings.endpoint, settings.auth()?, settings.timeout())?
        .with_impersonation(settings.impersonate);

    let (last_sync, sync_tokens): (Arc<dyn LastSyncStore>, Arc<dyn FolderSyncTokenStore>) =
        if cli.stateless {
            info!("Stateless run, checkpoints are neither read nor written");
            let store = Arc::new(NoCheckpoints);
            (store.clone(), store)
        } else {
            let path = settings.checkpoint_db_path()?;
            info!("Using checkpoint database {}", path.display());
            let store = Arc::new(SqliteCheckpointStore::open(&path)?);
            (store.clone(), store)
        };
    let run_config = settings.run_config(last_sync, sync_tokens);
    info!(
        "Harvesting {} mailboxes from {} ({:?})",
        mailboxes.len(),
        settings.endpoint,
        run_config
    );

    let writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut sink = JsonLinesSink::new(BufWriter::new(writer));

    let stats = harvest(&client, &run_config, &mailboxes, &mut sink)?;
    info!(
        "Done: {} records, {}/{} mailboxes complete, {}ms",
        stats.records_stored,
        stats.mailboxes - stats.failed_mailboxes.len().min(stats.mailboxes),
        stats.mailboxes,
        stats.duration_ms
    );
    for failure in &stats.failed_mailboxes {
        error!("Incomplete mailbox {}: {}", failure.mailbox, failure.error);
    }
    Ok(())
}
