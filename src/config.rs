use std::collections::HashMap;
use std::fmt;

use axum::http::HeaderValue;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// `development` enables diagnostic error envelopes; anything else is treated as production.
    pub environment: String,
}

/// The shared credential checked against `x-api-key`.
///
/// Custom `Debug` redacts the key so configuration dumps never leak it.
#[derive(Clone, Deserialize, Default)]
pub struct AuthConfig {
    pub api_key: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub window_seconds: u64,
    pub max_requests: usize,
    pub cleanup_interval_seconds: u64,
    /// Key clients by `X-Forwarded-For` / `X-Real-IP` instead of the socket address.
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub origin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsConfig {
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub app: AppSection,
    #[serde(default)]
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub downloads: DownloadsConfig,
    pub security: Option<SecurityConfig>,
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.app.environment.eq_ignore_ascii_case("development")
    }

    /// The configured API key, if any. An empty value counts as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.auth.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

/// Plain environment variables honoured on top of the `MOMO__` prefixed ones.
const LEGACY_VARS: [(&str, &str); 4] = [
    ("API_KEY", "auth.api_key"),
    ("PORT", "server.port"),
    ("CORS_ORIGIN", "cors.origin"),
    ("APP_ENV", "app.environment"),
];

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();
    load_from_vars(std::env::vars().collect())
}

/// Builds the configuration against an explicit set of environment variables.
///
/// Precedence, lowest first: embedded defaults, `momo-gateway.toml` in the CWD,
/// the file named by `MOMO_GATEWAY_CONFIG`, `MOMO__SECTION__KEY` variables and
/// finally the plain legacy variables.
pub fn load_from_vars(vars: HashMap<String, String>) -> anyhow::Result<AppConfig> {
    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        .add_source(::config::File::with_name("momo-gateway").required(false));

    if let Some(custom_path) = vars.get("MOMO_GATEWAY_CONFIG") {
        builder = builder.add_source(::config::File::with_name(custom_path).required(false));
    }
    builder = builder.add_source(
        ::config::Environment::with_prefix("MOMO")
            .separator("__")
            .source(Some(vars.clone())),
    );

    for (var, key) in LEGACY_VARS {
        if let Some(value) = vars.get(var).filter(|v| !v.is_empty()) {
            builder = builder.set_override(key, value.clone())?;
        }
    }

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }
    if cfg.server.body_limit_bytes == 0 {
        return Err(anyhow::anyhow!("server.body_limit_bytes must be > 0"));
    }
    if cfg.app.environment.trim().is_empty() {
        return Err(anyhow::anyhow!("app.environment must not be empty"));
    }

    // Rate limiting
    if cfg.rate_limit.window_seconds == 0 {
        return Err(anyhow::anyhow!("rate_limit.window_seconds must be > 0"));
    }
    if cfg.rate_limit.max_requests == 0 {
        return Err(anyhow::anyhow!("rate_limit.max_requests must be > 0"));
    }
    if cfg.rate_limit.cleanup_interval_seconds == 0 {
        return Err(anyhow::anyhow!("rate_limit.cleanup_interval_seconds must be > 0"));
    }

    // CORS with credentials cannot use a wildcard origin
    if cfg.cors.origin.trim() == "*" {
        return Err(anyhow::anyhow!("cors.origin must name a concrete origin, not '*'"));
    }
    if HeaderValue::from_str(&cfg.cors.origin).is_err() {
        return Err(anyhow::anyhow!("invalid cors.origin: {:?}", cfg.cors.origin));
    }

    if cfg.api_key().is_none() {
        tracing::warn!("auth.api_key (API_KEY) is not set - protected routes will answer 500");
    }

    Ok(())
}
