use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use drive_auth::{AccessToken, DriveAuthService, DRIVE_FILE_SCOPE};
use memo_sync::database::{self, SqliteStore};
use memo_sync::models::keys::is_backup_key;
use memo_sync::services::{export_import_service, AuthStateMonitor};
use memo_sync::{DriveClient, KvStore, SyncConfig, SyncEngine, SyncError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Keeps memo data in sync with a Google Drive backup folder
#[derive(Parser)]
#[command(name = "memo-sync", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(long, default_value = "memo-sync.toml")]
    config: PathBuf,

    /// SQLite database holding the key-value store
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the engine and keep syncing until Ctrl-C
    Run,
    /// Run one sync cycle now
    Sync,
    /// Show authentication and sync state
    Status,
    /// Store a Drive access token
    Login {
        #[arg(long)]
        token: String,
        /// Token lifetime in seconds
        #[arg(long)]
        expires_in: Option<i64>,
        /// Ask the token-info endpoint for the real expiry
        #[arg(long)]
        verify: bool,
    },
    /// Remove the stored token
    Logout,
    /// Enable or disable automatic sync
    AutoSync {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Manage the backup folder
    Folders {
        #[command(subcommand)]
        action: FolderCommand,
    },
    /// Write a synced key, as the memo app would
    Set { key: String, value: String },
    /// Write a local backup file
    Export {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Restore a local backup file
    Import { file: PathBuf },
}

#[derive(Subcommand)]
enum FolderCommand {
    List,
    Search {
        query: String,
    },
    Create {
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    Select {
        id: String,
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), SyncError> {
    let config = SyncConfig::load(&cli.config)?;
    let db_path = cli.db.unwrap_or_else(database::get_database_path);
    let store: Arc<dyn KvStore> = Arc::new(SqliteStore::open(&db_path)?);

    let auth = AuthStateMonitor::new(store.clone());
    let client = DriveClient::new(&config, auth.clone())?;
    let engine = SyncEngine::new(config, store.clone(), Arc::new(client))?;

    match cli.command {
        Command::Run => {
            engine.start();
            tokio::signal::ctrl_c().await?;
            engine.shutdown();
        }
        Command::Sync => match engine.manual_sync().await? {
            Some(outcome) => println!(
                "{}: {} keys ({})",
                outcome.action,
                outcome.updated_keys.len(),
                outcome.updated_keys.join(", ")
            ),
            None => println!("A sync is already running"),
        },
        Command::Status => {
            let status = engine.get_sync_status();
            println!("device:        {}", status.device_id);
            println!("authenticated: {}", status.is_authenticated);
            println!("auto-sync:     {}", engine.is_auto_sync_enabled());
            match status.last_sync_time {
                Some(at) => println!("last sync:     {}", at.to_rfc3339()),
                None => println!("last sync:     never"),
            }
            match engine.folder_selection()? {
                Some(folder) => println!("folder:        {} ({})", folder.folder_name, folder.folder_id),
                None => println!("folder:        not selected"),
            }
        }
        Command::Login {
            token,
            expires_in,
            verify,
        } => {
            let expires_at = if verify {
                let info = DriveAuthService::new().verify_token(&token).await?;
                if !info.has_scope(DRIVE_FILE_SCOPE) {
                    log::warn!("Token lacks the {} scope", DRIVE_FILE_SCOPE);
                }
                info.expires_at(Utc::now())
            } else {
                expires_in.map(|secs| Utc::now() + Duration::seconds(secs))
            };
            auth.store_credential(&AccessToken::new(token, expires_at))?;
            println!("Signed in");
        }
        Command::Logout => {
            auth.sign_out()?;
            println!("Signed out");
        }
        Command::AutoSync { state } => {
            engine.toggle_auto_sync(matches!(state, Toggle::On))?;
        }
        Command::Folders { action } => match action {
            FolderCommand::List => {
                for folder in engine.list_folders().await? {
                    println!("{}\t{}", folder.id, folder.name);
                }
            }
            FolderCommand::Search { query } => {
                for folder in engine.search_folders(&query).await? {
                    println!("{}\t{}", folder.id, folder.name);
                }
            }
            FolderCommand::Create { name, parent } => {
                let folder = engine.create_folder(&name, parent.as_deref()).await?;
                engine.select_folder(&folder.id, &folder.name)?;
                println!("Created and selected {}\t{}", folder.id, folder.name);
            }
            FolderCommand::Select { id, name } => {
                engine.select_folder(&id, &name)?;
            }
        },
        Command::Set { key, value } => {
            if !is_backup_key(&key) {
                return Err(SyncError::Config(format!("'{}' is not a synced key", key)));
            }
            store.set(&key, &value)?;
            engine.notify_data_changed(&key)?;
            println!("Saved {}; it is uploaded on the next sync", key);
        }
        Command::Export { dir } => {
            let dir = dir.unwrap_or_else(export_import_service::default_export_dir);
            let path = engine.export_backup(&dir)?;
            println!("{}", path.display());
        }
        Command::Import { file } => {
            let report = engine.import_backup(&file)?;
            println!("Restored {} keys", report.written.len());
            for failure in &report.failed {
                eprintln!("{}", failure);
            }
        }
    }

    Ok(())
}
