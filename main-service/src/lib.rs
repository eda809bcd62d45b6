use std::sync::Arc;

use sqlx::PgPool;

use config::Config;
use stats::StatsGateway;

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod stats;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub stats: Arc<StatsGateway>,
}
