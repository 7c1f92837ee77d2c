use motusdao_common::{ChainConfig, DatabaseConfig, ServerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub chain: ChainConfig,
    pub environment: String,
    /// Development convenience: serve canned list payloads when the
    /// database is unreachable. Never intended for production.
    pub use_mock_data: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let use_mock_data = environment == "development"
            && std::env::var("USE_MOCK_DATA").unwrap_or_default() == "true";

        Ok(Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .unwrap_or(8000),
                cors_origins: std::env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            database: DatabaseConfig {
                host: std::env::var("DATABASE_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: std::env::var("DATABASE_PORT")
                    .unwrap_or_else(|_| "5432".to_string())
                    .parse()
                    .unwrap_or(5432),
                username: std::env::var("DATABASE_USERNAME")
                    .unwrap_or_else(|_| "motusdao_user".to_string()),
                password: std::env::var("DATABASE_PASSWORD")
                    .unwrap_or_else(|_| "motusdao_password".to_string()),
                database: std::env::var("DATABASE_NAME")
                    .unwrap_or_else(|_| "motusdao".to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            chain: ChainConfig {
                enabled: std::env::var("CHAIN_ENABLED").unwrap_or_default() == "true",
                rpc_url: std::env::var("CHAIN_RPC_URL")
                    .unwrap_or_else(|_| "https://alfajores-forno.celo-testnet.org".to_string()),
                contract_address: std::env::var("CHAIN_ASSIGNMENTS_CONTRACT")
                    .unwrap_or_default(),
                chain_id: std::env::var("CHAIN_ID")
                    .unwrap_or_else(|_| "44787".to_string())
                    .parse()
                    .unwrap_or(44787),
                signer_key: std::env::var("CHAIN_SIGNER_KEY")
                    .ok()
                    .filter(|k| !k.is_empty()),
            },
            environment,
            use_mock_data,
        })
    }
}
