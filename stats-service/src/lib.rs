use sqlx::PgPool;

use config::Config;

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
}
