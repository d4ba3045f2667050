/// Server configuration from environment variables. Optional settings
/// disable their feature instead of failing startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub sec_user_agent: Option<String>,
    pub enable_scheduler: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "sqlite:hedge.db".to_string()),
            bind_addr: std::env::var("BIND_ADDR")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            sec_user_agent: std::env::var("SEC_USER_AGENT").ok().filter(|s| !s.is_empty()),
            enable_scheduler: std::env::var("ENABLE_SCHEDULER")
                .map(|v| v != "0" && v.to_lowercase() != "false")
                .unwrap_or(true),
        }
    }
}
