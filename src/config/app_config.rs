use serde::Deserialize;

/// Application configuration
///
/// Layered: optional config files, `APP__`-prefixed environment, then the
/// fixed deployment variables (`REDIS_URL`, `GROQ_API_KEY`, ...) on top.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cache: CacheSettings,
    pub rate_limit: RateLimitSettings,
    pub lock: LockSettings,
    pub breaker: BreakerSettings,
    pub generator: GeneratorSettings,
    pub embedding: EmbeddingSettings,
    pub auth: AuthSettings,
    pub drain: DrainSettings,
    /// Exposes the admin cache routes
    pub debug_mode: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub ttl_seconds: u64,
    pub key_prefix: String,
    pub scan_batch: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub requests: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LockSettings {
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub cooldown_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub dimensions: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub user_keys: Vec<String>,
    pub admin_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DrainSettings {
    pub timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_seconds: 3600,
            key_prefix: "sentinel:cache:".to_string(),
            scan_batch: 100,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests: 100,
            window_seconds: 60,
        }
    }
}

impl Default for LockSettings {
    fn default() -> Self {
        Self { ttl_seconds: 30 }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_seconds: 60,
        }
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout_seconds: 30,
            max_attempts: 3,
            initial_backoff_ms: 1000,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "jina-embeddings-v3".to_string(),
            dimensions: 1024,
            timeout_seconds: 30,
        }
    }
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self { timeout_seconds: 10 }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: Self = config.try_deserialize()?;
        app_config.apply_overrides(|name| std::env::var(name).ok());
        Ok(app_config)
    }

    /// Applies the fixed deployment variable names on top of the layered
    /// sources. Takes a lookup so tests can inject values without touching
    /// the process environment.
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(url) = get("REDIS_URL") {
            self.cache.redis_url = Some(url);
        }
        if let Some(key) = get("GROQ_API_KEY") {
            self.generator.api_key = Some(key);
        }
        if let Some(key) = get("JINA_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Some(value) = get("DEBUG_MODE") {
            self.debug_mode = value.eq_ignore_ascii_case("true");
        }
        if let Some(requests) = get("RATE_LIMIT_REQUESTS").and_then(|v| v.parse().ok()) {
            self.rate_limit.requests = requests;
        }
        if let Some(window) = get("RATE_LIMIT_WINDOW").and_then(|v| v.parse().ok()) {
            self.rate_limit.window_seconds = window;
        }
        if let Some(keys) = get("SENTINEL_USER_KEYS") {
            self.auth.user_keys = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(key) = get("SENTINEL_ADMIN_KEY") {
            self.auth.admin_key = Some(key);
        }
    }
}
