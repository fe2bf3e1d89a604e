pub mod settings;

pub use settings::{
    CorsConfig, DatabaseConfig, JwtConfig, LlmConfig, RateLimitConfig, RedisConfig, ServerConfig,
    Settings,
};
