use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Spoonacular credentials. Import is disabled when this is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub app_version: String,
    pub profile: String,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub import: Option<ImportConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "recipe-catalog".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "recipe-catalog-users".into()),
            ttl_minutes: parse_var("JWT_TTL_MINUTES").unwrap_or(60),
        };

        let import = std::env::var("SPOONACULAR_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|api_key| ImportConfig {
                api_key,
                base_url: std::env::var("SPOONACULAR_BASE_URL")
                    .unwrap_or_else(|_| "https://api.spoonacular.com".into()),
            });

        Ok(Self {
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "recipe-catalog".into()),
            app_version: std::env::var("APP_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").into()),
            profile: std::env::var("APP_PROFILE").unwrap_or_else(|_| "default".into()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("APP_PORT").unwrap_or(8080),
            database_url: std::env::var("DATABASE_URL").ok(),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS").unwrap_or(10),
            jwt,
            import,
        })
    }

    /// Config for tests and local runs without an environment.
    pub fn local(secret: &str) -> Self {
        Self {
            app_name: "recipe-catalog".into(),
            app_version: env!("CARGO_PKG_VERSION").into(),
            profile: "test".into(),
            host: "127.0.0.1".into(),
            port: 8080,
            database_url: None,
            db_max_connections: 1,
            jwt: JwtConfig {
                secret: secret.into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            import: None,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
