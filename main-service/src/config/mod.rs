use std::env;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub stats_server_url: String,
    pub app_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            server_host: env::var("SERVER_HOST")?,
            server_port: env::var("SERVER_PORT")?.parse().unwrap_or(8080),
            stats_server_url: env::var("STATS_SERVER_URL")?,
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "afisha-server".into()),
        })
    }
}
