pub mod api;
pub mod cli;
pub mod config;
pub mod db;

pub use db::DbPool;

use config::Config;

/// Shared state handed to every request handler. Holds no mutable data of
/// its own; all persistent state lives in the database.
pub struct AppState {
    pub config: Config,
    pub db: DbPool,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        Self { config, db }
    }
}
