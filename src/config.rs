use std::env;

use anyhow::Context;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub cors_extra_origins: Vec<String>,

    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,

    pub google: GoogleConfig,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

/// Token lifetime in seconds. Must be positive and representable as a
/// `chrono::Duration`.
fn parse_ttl(raw: &str) -> anyhow::Result<i64> {
    let secs: i64 = raw.trim().parse().context("JWT_TTL_SECS must be a number")?;
    match chrono::Duration::try_seconds(secs) {
        Some(_) if secs > 0 => Ok(secs),
        _ => anyhow::bail!("JWT_TTL_SECS must be a positive number of seconds, got {}", secs),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            host: var_or("HOST", "0.0.0.0"),
            port: var_or("PORT", "4000")
                .parse()
                .context("PORT must be a number")?,
            frontend_url: var_or("FRONTEND_URL", "http://localhost:5173"),
            cors_extra_origins: env::var("CORS_EXTRA_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_ttl_secs: parse_ttl(&var_or("JWT_TTL_SECS", "3600"))?,

            google: GoogleConfig {
                client_id: var_or("GOOGLE_CLIENT_ID", ""),
                client_secret: var_or("GOOGLE_CLIENT_SECRET", ""),
                redirect_url: var_or(
                    "GOOGLE_REDIRECT_URL",
                    "http://localhost:4000/api/auth/google/callback",
                ),
                auth_url: var_or("GOOGLE_AUTH_URL", GOOGLE_AUTH_URL),
                token_url: var_or("GOOGLE_TOKEN_URL", GOOGLE_TOKEN_URL),
                userinfo_url: var_or("GOOGLE_USERINFO_URL", GOOGLE_USERINFO_URL),
            },
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the OAuth callback is served over TLS.
    pub fn secure_cookies(&self) -> bool {
        self.google.redirect_url.starts_with("https://")
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        database_url: "postgres://postgres@localhost/timesheeter_test".into(),
        host: "127.0.0.1".into(),
        port: 4000,
        frontend_url: "http://localhost:5173".into(),
        cors_extra_origins: Vec::new(),
        jwt_secret: "test-secret-with-enough-entropy".into(),
        jwt_ttl_secs: 3600,
        google: GoogleConfig {
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            redirect_url: "http://localhost:4000/api/auth/google/callback".into(),
            auth_url: GOOGLE_AUTH_URL.into(),
            token_url: GOOGLE_TOKEN_URL.into(),
            userinfo_url: GOOGLE_USERINFO_URL.into(),
        },
    }
}
