/*
 * Responsibility
 * - 環境変数の読み込み (upstream URL, timeout, CORS 許可など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - テストでは env を汚さないよう from_lookup に任意の lookup を渡す
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    // user-service は identity directory と /api/users の upstream を兼ねる
    pub user_service_url: Url,
    pub activity_service_url: Url,
    pub ai_service_url: Url,

    pub directory_timeout: Duration,
    pub upstream_timeout: Duration,
    pub max_body_bytes: usize,

    // 認証情報は IdP 側にあるため、登録時には固定のプレースホルダを送る
    pub register_placeholder_password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 8080,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let user_service_url = required_url(&lookup, "USER_SERVICE_URL")?;
        let activity_service_url = required_url(&lookup, "ACTIVITY_SERVICE_URL")?;
        let ai_service_url = required_url(&lookup, "AI_SERVICE_URL")?;

        let directory_timeout = Duration::from_millis(
            lookup("DIRECTORY_TIMEOUT_MS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(3000),
        );

        let upstream_timeout = Duration::from_secs(
            lookup("UPSTREAM_TIMEOUT_SECONDS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(30),
        );

        let max_body_bytes = lookup("MAX_BODY_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        let register_placeholder_password = lookup("REGISTER_PLACEHOLDER_PASSWORD")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "dummyPassword".to_string());

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            user_service_url,
            activity_service_url,
            ai_service_url,
            directory_timeout,
            upstream_timeout,
            max_body_bytes,
            register_placeholder_password,
        })
    }

    /// Gateway-wide deadline for one request: the sync step may spend up to
    /// two directory calls before the forwarded call gets its own timeout.
    pub fn request_timeout(&self) -> Duration {
        self.upstream_timeout + self.directory_timeout * 2
    }
}

fn required_url<F>(lookup: &F, key: &'static str) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).ok_or(ConfigError::Missing(key))?;
    let url = Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid(key))?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(ConfigError::Invalid(key)),
    }
}
