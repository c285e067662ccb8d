pub mod api;
pub mod config;
pub mod db;
pub mod mail;
pub mod utils;

pub use db::DbPool;

use config::Config;
use mail::Mailer;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub mailer: Option<Mailer>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, mailer: Option<Mailer>) -> Self {
        Self { config, db, mailer }
    }
}
