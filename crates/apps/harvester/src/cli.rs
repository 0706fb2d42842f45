use clap::{Parser, ValueEnum};
use harvest::SyncMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Settings file (defaults to ~/.config/harvest/harvest.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write records here as JSON lines instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Mailbox to crawl; repeatable, replaces the mailboxes from settings
    #[arg(long = "mailbox", value_name = "ADDR")]
    pub mailboxes: Vec<String>,

    /// Neither read nor persist checkpoints (full crawl)
    #[arg(long)]
    pub stateless: bool,

    /// Override the checkpoint mode from settings
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ModeArg {
    SyncToken,
    LastSynced,
}

impl From<ModeArg> for SyncMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::SyncToken => SyncMode::SyncToken,
            ModeArg::LastSynced => SyncMode::LastSynced,
        }
    }
}
