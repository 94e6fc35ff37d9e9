use std::path::PathBuf;

/// Server configuration
///
/// # Environment variables
///
/// Every field can be overridden through an environment variable:
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | WORK_DIR | /var/lib/laundry/hub | Working directory (database, logs) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | ENVIRONMENT | development | Runtime environment |
/// | FREE_REQUESTS_PER_WEEK | 2 | Free weekly request allowance per student |
/// | EXTRA_CHARGE_PER_REQUEST | 10 | Charge (₹) per over-allowance request |
/// | REQUEST_TIMEOUT_MS | 30000 | Request timeout (ms) |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | Graceful shutdown timeout (ms) |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/hub HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the database and log files
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Free weekly request allowance per student
    pub free_requests_per_week: u32,
    /// Charge (₹) accrued per request beyond the allowance
    pub extra_charge_per_request: u32,
    /// Request timeout (milliseconds)
    pub request_timeout_ms: u64,
    /// Graceful shutdown timeout (milliseconds)
    pub shutdown_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/laundry/hub".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            free_requests_per_week: std::env::var("FREE_REQUESTS_PER_WEEK")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(2),
            extra_charge_per_request: std::env::var("EXTRA_CHARGE_PER_REQUEST")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
            shutdown_timeout_ms: std::env::var("SHUTDOWN_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
        }
    }

    /// Override the work directory and port, commonly for tests
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// Directory holding the redb database file
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// Directory holding rolling log files
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// Create the work directory layout if it does not exist yet
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
