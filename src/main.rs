use std::io::SeekFrom;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dropfs::{config, storage, FileInfo, Fs};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Parser)]
#[command(
    name = "dropfs",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("DROPFS_BUILD_TIME"), ")"),
    about = "File-style access to remote object storage"
)]
struct Cli {
    /// Config file, defaults to ./config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a folder
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// Entries fetched per readdir call, 0 reads everything at once
        #[arg(long, default_value_t = 0)]
        page: i64,
    },
    /// Print a file to stdout
    Cat {
        path: String,
        /// Start reading at this byte offset
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Upload a local file
    Put { local: PathBuf, remote: String },
    /// Show metadata
    Stat { path: String },
    /// Create a folder
    Mkdir { path: String },
    /// Delete a file or folder
    Rm { path: String },
    /// Move or rename
    Mv { from: String, to: String },
}

fn print_info(info: &FileInfo) {
    let kind = if info.is_dir() { 'd' } else { '-' };
    let modified = info.modified()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("{}{:o} {:>12} {:>16} {}", kind, info.mode(), info.size(), modified, info.name());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dropfs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let app_config = config::load_config(&config_path)?;

    let storage = storage::create_storage(&app_config.storage.driver, app_config.storage.config.clone())?;
    let fs = Fs::new(storage).with_dir_list_limit(app_config.listing.dir_list_limit);
    tracing::debug!("Using storage driver: {}", fs.name());

    match cli.command {
        Command::Ls { path, page } => {
            let mut dir = fs.open(&path).await?;
            if page <= 0 {
                for info in dir.readdir(0).await? {
                    print_info(&info);
                }
            } else {
                loop {
                    let entries = dir.readdir(page).await?;
                    for info in &entries {
                        print_info(info);
                    }
                    if (entries.len() as i64) < page {
                        break;
                    }
                }
            }
            dir.close().await?;
        }
        Command::Cat { path, offset } => {
            let mut file = fs.open(&path).await?;
            if offset > 0 {
                file.seek(SeekFrom::Start(offset)).await?;
            }

            let mut stdout = tokio::io::stdout();
            let mut buf = vec![0u8; COPY_BUFFER_SIZE];
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                stdout.write_all(&buf[..n]).await?;
            }
            stdout.flush().await?;
            file.close().await?;
        }
        Command::Put { local, remote } => {
            let mut source = tokio::fs::File::open(&local).await
                .with_context(|| format!("Failed to open {:?}", local))?;

            let mut file = fs.create(&remote).await?;
            let mut buf = vec![0u8; COPY_BUFFER_SIZE];
            loop {
                let n = source.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                file.write(&buf[..n]).await?;
            }
            file.close().await?;

            let info = file.stat().await?;
            tracing::info!("Uploaded {} ({} bytes)", remote, info.size());
        }
        Command::Stat { path } => {
            let info = fs.stat(&path).await?;
            print_info(&info);
            println!("{}", serde_json::to_string_pretty(info.metadata())?);
        }
        Command::Mkdir { path } => {
            fs.mkdir(&path).await?;
        }
        Command::Rm { path } => {
            fs.remove(&path).await?;
        }
        Command::Mv { from, to } => {
            let info = fs.rename(&from, &to).await?;
            print_info(&info);
        }
    }

    Ok(())
}
