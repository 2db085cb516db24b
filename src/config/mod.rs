mod app_config;

pub use app_config::{
    AppConfig, AuthSettings, BreakerSettings, CacheSettings, DrainSettings, EmbeddingSettings,
    GeneratorSettings, LockSettings, LogFormat, LoggingConfig, RateLimitSettings, ServerConfig,
};
