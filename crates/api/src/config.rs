use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for running generation jobs (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT verification settings.
    pub jwt: JwtConfig,
    /// Upstream inference credentials, in rotation order.
    pub inference_api_keys: Vec<String>,
    /// Per-attempt inference timeout in seconds (default: `120`).
    pub inference_timeout_secs: u64,
    /// Directory generated images are written under (default: `storage/images`).
    pub storage_root: String,
    /// Optional JSON file replacing the built-in model catalog.
    pub model_catalog_path: Option<String>,
    /// Running jobs older than this are marked abandoned (default: `30`).
    pub job_stale_after_mins: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                    |
    /// |--------------------------|----------------------------|
    /// | `HOST`                   | `0.0.0.0`                  |
    /// | `PORT`                   | `3000`                     |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `30`                       |
    /// | `INFERENCE_API_KEYS`     | (empty)                    |
    /// | `INFERENCE_TIMEOUT_SECS` | `120`                      |
    /// | `STORAGE_ROOT`           | `storage/images`           |
    /// | `MODEL_CATALOG_PATH`     | (built-in catalog)         |
    /// | `JOB_STALE_AFTER_MINS`   | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = split_list(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();

        let inference_api_keys = split_list(&std::env::var("INFERENCE_API_KEYS").unwrap_or_default());

        let inference_timeout_secs: u64 = std::env::var("INFERENCE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("INFERENCE_TIMEOUT_SECS must be a valid u64");

        let storage_root =
            std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "storage/images".into());

        let model_catalog_path = std::env::var("MODEL_CATALOG_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty());

        let job_stale_after_mins: i64 = std::env::var("JOB_STALE_AFTER_MINS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("JOB_STALE_AFTER_MINS must be a valid i64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            inference_api_keys,
            inference_timeout_secs,
            storage_root,
            model_catalog_path,
            job_stale_after_mins,
        }
    }
}

/// Split a comma-separated env value, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
