mod config;
mod core;
mod infra;

use log::info;
use std::sync::Arc;

use crate::config::{Config, StoreMode};
use crate::core::app::App;
use crate::core::controller::MediaController;
use crate::core::service::MediaService;
use crate::core::storage::{KeyValueStore, StorageError};
use crate::infra::database::Database;
use crate::infra::memory::MemoryStore;
use crate::infra::terminal::{TerminalInput, TerminalView};

fn main() {
    // Load .env (silently ignore if missing)
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            std::process::exit(1);
        }
    };

    rt.block_on(async {
        let store = match open_store(&config.store).await {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Failed to open the data store: {e}");
                std::process::exit(1);
            }
        };

        let books = MediaController::new(MediaService::new(store.clone()), TerminalView::new());
        let movies = MediaController::new(MediaService::new(store), TerminalView::new());

        let mut app = App::new(TerminalInput, books, movies);
        app.run().await;
    });
}

async fn open_store(mode: &StoreMode) -> Result<Arc<dyn KeyValueStore>, StorageError> {
    match mode {
        StoreMode::Local { path } => {
            let db = Database::local(path).await?;
            info!("Store schema version {}", db.store_version().await?);
            Ok(Arc::new(db))
        }
        StoreMode::Memory => {
            info!("Using an in-memory store; nothing will be saved");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
