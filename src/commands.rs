//! CLI commands, dispatched onto the filesystem provider.

use std::collections::VecDeque;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use clap::Subcommand;
use onelake_api::{OneLake, OneLakeError};
use onelake_fs::{Address, EntryKind, FsError, OneLakeFs, RemoteApi};
use secrecy::SecretString;
use thiserror::Error;
use tokio::select;
use tracing::{debug, info};

use crate::app_config::{Config, ConfigError};

#[derive(Subcommand)]
pub enum Command {
    /// Show the metadata of a file or directory.
    Stat {
        /// A `onelake://workspace/item.Type/path` URI.
        uri: String,
    },

    /// List a directory.
    Ls { uri: String },

    /// Print a file to stdout.
    Cat { uri: String },

    /// Copy a file, or a directory tree, to the local disk.
    Download {
        uri: String,
        /// Local destination path.
        target: PathBuf,
    },

    /// Print the effective configuration with secrets masked.
    Config,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no access token: pass --token or set ONELAKE_ACCESS_TOKEN")]
    MissingToken,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not connect to OneLake: {0}")]
    Connect(#[from] OneLakeError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("interrupted")]
    Interrupted,
}

/// Run `command` to completion on a fresh multi-threaded runtime.
pub fn run(config: Config, token: Option<SecretString>, command: Command) -> Result<(), CommandError> {
    if let Command::Config = command {
        print!("{}", config.to_masked_toml()?);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute(config, token, command))
}

async fn execute(
    config: Config,
    token: Option<SecretString>,
    command: Command,
) -> Result<(), CommandError> {
    let token = token
        .or_else(|| config.api.token.clone())
        .ok_or(CommandError::MissingToken)?;

    let client = OneLake::builder()
        .base_url(config.api.base_url.clone())
        .token(token)
        .timeout(config.http_timeout())
        .proxy(config.http.proxy.clone())
        .strict_ssl(config.http.strict_ssl)
        .build()?;
    client.initialize().await?;
    info!(base_url = %client.base_url(), "connected to OneLake");

    let fs = OneLakeFs::new(Arc::new(client), config.cache_settings());
    select! {
        result = dispatch(&fs, command) => result,
        _ = tokio::signal::ctrl_c() => {
            debug!("Received Ctrl+C signal, shutting down...");
            Err(CommandError::Interrupted)
        }
    }
}

async fn dispatch<A: RemoteApi>(fs: &OneLakeFs<A>, command: Command) -> Result<(), CommandError> {
    match command {
        Command::Stat { uri } => {
            let meta = fs.stat(&uri).await?;
            let size = meta.size.map_or_else(|| "-".to_owned(), |s| s.to_string());
            let mut out = std::io::stdout().lock();
            writeln!(out, "kind:     {}", kind_label(meta.kind))?;
            writeln!(out, "size:     {size}")?;
            writeln!(out, "created:  {}", format_time(meta.created))?;
            writeln!(out, "modified: {}", format_time(meta.modified))?;
        }
        Command::Ls { uri } => {
            let entries = fs.read_directory(&uri).await?;
            let mut out = std::io::stdout().lock();
            for entry in entries {
                let suffix = if entry.kind.is_dir() { "/" } else { "" };
                writeln!(out, "{}{suffix}", entry.name)?;
            }
        }
        Command::Cat { uri } => {
            let content = fs.read_file(&uri).await?;
            let mut out = std::io::stdout().lock();
            out.write_all(&content)?;
            out.flush()?;
        }
        Command::Download { uri, target } => {
            let files = download(fs, &uri, target).await?;
            info!(files, "download complete");
        }
        Command::Config => {}
    }
    Ok(())
}

/// Copy `uri` to `target`, walking directories breadth first. Returns the
/// number of files written.
///
/// Children are addressed from their parent's [`Address`], so names with
/// reserved URI characters are never re-parsed.
async fn download<A: RemoteApi>(
    fs: &OneLakeFs<A>,
    uri: &str,
    target: PathBuf,
) -> Result<usize, CommandError> {
    let store = fs.store();
    let mut queue = VecDeque::from([(Address::decode(uri)?, target)]);
    let mut files = 0;

    while let Some((address, path)) = queue.pop_front() {
        match store.stat(&address).await?.kind {
            EntryKind::File => {
                let content = store.read(&address).await?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, &content).await?;
                debug!(%address, path = %path.display(), bytes = content.len(), "downloaded");
                files += 1;
            }
            EntryKind::Directory => {
                tokio::fs::create_dir_all(&path).await?;
                for entry in store.list(&address).await? {
                    let child = address.child(&entry.name)?;
                    queue.push_back((child, path.join(&entry.name)));
                }
            }
        }
    }
    Ok(files)
}

fn kind_label(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::File => "file",
        EntryKind::Directory => "directory",
    }
}

fn format_time(time: Option<SystemTime>) -> String {
    time.map_or_else(
        || "-".to_owned(),
        |t| DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}
