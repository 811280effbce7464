use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_min_connections: u32,
    pub database_acquire_timeout_secs: u64,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub google_books_api_url: String,
    pub external_lookup_timeout_secs: u64,
    pub cors_origins: Vec<String>,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        // 有效期以小时配置，允许带 h 后缀
        let jwt_expiration = optional("JWT_EXPIRATION")
            .and_then(|v| v.trim_end_matches('h').parse::<u64>().ok())
            .unwrap_or(168);

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", 10),
            database_min_connections: parsed("DATABASE_MIN_CONNECTIONS", 2),
            database_acquire_timeout_secs: parsed("DATABASE_ACQUIRE_TIMEOUT", 5),
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration * 3600,
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parsed("SERVER_PORT", 5000),
            api_base_uri: optional("API_BASE_URI").unwrap_or_else(|| "/api".into()),
            google_books_api_url: optional("GOOGLE_BOOKS_API_URL")
                .unwrap_or_else(|| "https://www.googleapis.com/books/v1".into()),
            external_lookup_timeout_secs: parsed("EXTERNAL_LOOKUP_TIMEOUT", 10),
            cors_origins: optional("CORS_ORIGINS")
                .map(|v| split_origins(&v))
                .unwrap_or_default(),
            cookie_secure: parsed("COOKIE_SECURE", false),
            bcrypt_cost: parsed("BCRYPT_COST", bcrypt::DEFAULT_COST),
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn database_acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.database_acquire_timeout_secs)
    }

    pub fn external_lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.external_lookup_timeout_secs)
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    optional(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_empty_entries_dropped() {
        let origins = split_origins(" http://localhost:3000/ ,, https://example.org");
        assert_eq!(origins, vec!["http://localhost:3000", "https://example.org"]);
    }

    #[test]
    fn durations_follow_configured_seconds() {
        let config = Config {
            database_url: "postgres://localhost/books".into(),
            database_max_connections: 10,
            database_min_connections: 2,
            database_acquire_timeout_secs: 5,
            jwt_secret: "secret".into(),
            jwt_expiration_secs: 7200,
            server_host: "127.0.0.1".into(),
            server_port: 5000,
            api_base_uri: "/api".into(),
            google_books_api_url: "http://localhost".into(),
            external_lookup_timeout_secs: 3,
            cors_origins: vec![],
            cookie_secure: false,
            bcrypt_cost: 4,
        };
        assert_eq!(config.jwt_expiration(), Duration::from_secs(7200));
        assert_eq!(config.external_lookup_timeout(), Duration::from_secs(3));
        assert_eq!(config.database_acquire_timeout(), Duration::from_secs(5));
    }
}
