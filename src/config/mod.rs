use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::models::TtlClass;

/// 各缓存使用级别的 TTL（秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct CacheTtlConfig {
    pub very_short: u64,
    pub default: u64,
    pub medium: u64,
    pub long: u64,
    pub extended: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            very_short: 30,
            default: 300,
            medium: 900,
            long: 3600,
            extended: 86400,
        }
    }
}

impl CacheTtlConfig {
    pub fn seconds(&self, class: TtlClass) -> u64 {
        match class {
            TtlClass::VeryShort => self.very_short,
            TtlClass::Default => self.default,
            TtlClass::Medium => self.medium,
            TtlClass::Long => self.long,
            TtlClass::Extended => self.extended,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// 未配置时使用进程内存储
    pub redis_url: Option<String>,
    pub database_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub cache_prefix: String,
    pub cache_ttl: CacheTtlConfig,
    pub session_ttl_secs: u64,
    pub password_reset_ttl_secs: u64,
    pub email_verification_ttl_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: None,
            database_url: None,
            server_host: "::".to_string(),
            server_port: 3000,
            cache_prefix: "app".to_string(),
            cache_ttl: CacheTtlConfig::default(),
            session_ttl_secs: 7 * 24 * 3600,
            password_reset_ttl_secs: 3600,
            email_verification_ttl_secs: 86400,
            rate_limit_window_secs: 60,
            rate_limit_requests: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 从任意键值来源构造配置，无法解析的值回退到默认值
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        let ttl = defaults.cache_ttl;

        Config {
            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_or(lookup("SERVER_PORT"), defaults.server_port),
            cache_prefix: lookup("CACHE_PREFIX")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.cache_prefix),
            cache_ttl: CacheTtlConfig {
                very_short: positive_or(lookup("CACHE_TTL_VERY_SHORT"), ttl.very_short),
                default: positive_or(lookup("CACHE_TTL_DEFAULT"), ttl.default),
                medium: positive_or(lookup("CACHE_TTL_MEDIUM"), ttl.medium),
                long: positive_or(lookup("CACHE_TTL_LONG"), ttl.long),
                extended: positive_or(lookup("CACHE_TTL_EXTENDED"), ttl.extended),
            },
            session_ttl_secs: positive_or(lookup("SESSION_TTL_SECS"), defaults.session_ttl_secs),
            password_reset_ttl_secs: positive_or(
                lookup("PASSWORD_RESET_TTL_SECS"),
                defaults.password_reset_ttl_secs,
            ),
            email_verification_ttl_secs: positive_or(
                lookup("EMAIL_VERIFICATION_TTL_SECS"),
                defaults.email_verification_ttl_secs,
            ),
            rate_limit_window_secs: positive_or(
                lookup("RATE_LIMIT_WINDOW"),
                defaults.rate_limit_window_secs,
            ),
            rate_limit_requests: parse_or(
                lookup("RATE_LIMIT_REQUESTS"),
                defaults.rate_limit_requests,
            ),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// 可配置 TTL 的上限（十年）
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

// TTL 必须为正，超过上限时截断
fn positive_or(raw: Option<String>, default: u64) -> u64 {
    match parse_or(raw, default) {
        0 => default,
        secs => secs.min(MAX_TTL_SECS),
    }
}
