//! Application configuration.
//!
//! Every value is resolved with priority: config.toml > environment (.env is
//! loaded first) > default.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// ==================== Defaults ====================

/// Default base URL of the RetoMate API
pub const DEFAULT_API_URL: &str = "http://localhost:4000/api";

/// Server address to bind to
pub const SERVER_ADDR: &str = "127.0.0.1";

/// Server port
pub const SERVER_PORT: u16 = 3000;

/// Pause between locking a selection and revealing the verdict
pub const GRADING_DELAY_MS: u64 = 800;

/// Number of blocks in the course
pub const BLOCK_COUNT: u32 = 5;

pub const DEFAULT_DB_PATH: &str = "data/retomate.db";

// ==================== config.toml ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
  api: Option<ApiSection>,
  database: Option<DatabaseSection>,
  server: Option<ServerSection>,
  flow: Option<FlowSection>,
  blocks: Option<BlocksSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
  base_url: Option<String>,
  token: Option<String>,
  user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseSection {
  path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
  addr: Option<String>,
  port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct FlowSection {
  grading_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BlocksSection {
  count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub api_url: String,
  pub api_token: Option<String>,
  pub user_id: String,
  pub database_path: PathBuf,
  pub server_addr: String,
  pub server_port: u16,
  pub grading_delay: Duration,
  pub block_count: u32,
}

impl Config {
  pub fn bind_addr(&self) -> String {
    format!("{}:{}", self.server_addr, self.server_port)
  }
}

fn env_var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve configuration from file contents and an environment lookup.
fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Config {
  let api = file.api.unwrap_or_default();
  let database = file.database.unwrap_or_default();
  let server = file.server.unwrap_or_default();
  let flow = file.flow.unwrap_or_default();
  let blocks = file.blocks.unwrap_or_default();

  let parse_env = |name: &str| env(name).and_then(|v| v.parse::<u64>().ok());

  Config {
    api_url: api
      .base_url
      .or_else(|| env("RETOMATE_API_URL"))
      .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
    api_token: api.token.or_else(|| env("RETOMATE_API_TOKEN")),
    user_id: api
      .user_id
      .or_else(|| env("RETOMATE_USER_ID"))
      .unwrap_or_else(|| "local".to_string()),
    database_path: database
      .path
      .or_else(|| env("DATABASE_PATH"))
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
    server_addr: server
      .addr
      .or_else(|| env("RETOMATE_ADDR"))
      .unwrap_or_else(|| SERVER_ADDR.to_string()),
    server_port: server
      .port
      .or_else(|| parse_env("RETOMATE_PORT").and_then(|p| u16::try_from(p).ok()))
      .unwrap_or(SERVER_PORT),
    grading_delay: Duration::from_millis(
      flow
        .grading_delay_ms
        .or_else(|| parse_env("RETOMATE_GRADING_DELAY_MS"))
        .unwrap_or(GRADING_DELAY_MS),
    ),
    block_count: blocks
      .count
      .or_else(|| parse_env("RETOMATE_BLOCKS").and_then(|c| u32::try_from(c).ok()))
      .unwrap_or(BLOCK_COUNT)
      .max(1),
  }
}

/// Load configuration from ./config.toml and the environment
pub fn load() -> Config {
  // Load .env file if present
  let _ = dotenvy::dotenv();

  let file = match std::fs::read_to_string("config.toml") {
    Ok(contents) => match toml::from_str::<FileConfig>(&contents) {
      Ok(config) => {
        tracing::info!("Using config.toml");
        config
      }
      Err(e) => {
        tracing::warn!("Ignoring malformed config.toml: {}", e);
        FileConfig::default()
      }
    },
    Err(_) => FileConfig::default(),
  };

  let config = resolve(file, env_var);
  tracing::info!(
    api_url = %config.api_url,
    user_id = %config.user_id,
    database = %config.database_path.display(),
    "Configuration loaded"
  );
  config
}
