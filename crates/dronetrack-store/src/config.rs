//! Store configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// json-server style file to seed from; starts empty when unset
    pub seed_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("STORE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3001),
            seed_path: env::var("STORE_SEED_PATH")
                .ok()
                .filter(|path| !path.trim().is_empty()),
        }
    }
}
