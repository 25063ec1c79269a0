use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    LogMeal,
    Vision,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logmeal" => Ok(Self::LogMeal),
            "vision" | "gemini" => Ok(Self::Vision),
            other => anyhow::bail!("unknown RECOGNITION_PROVIDER: {other}"),
        }
    }
}

/// Backing store for food logs and profile counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStoreKind {
    Postgres,
    /// Process-local, lost on restart. For local runs and demos.
    Memory,
}

impl FromStr for LogStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown LOG_STORE: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionConfig {
    pub provider: ProviderKind,
    pub logmeal_base_url: String,
    pub logmeal_api_token: Option<String>,
    pub vision_base_url: String,
    pub vision_api_key: Option<String>,
    pub vision_model: String,
    pub timeout_secs: u64,
    /// Used for 429 responses that carry no Retry-After.
    pub cooldown_secs: u64,
}

/// S3-compatible bucket holding food photos (MinIO in development).
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoStorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Create the bucket at startup when it does not exist yet.
    pub create_bucket: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub photos: PhotoStorageConfig,
    pub log_store: LogStoreKind,
    pub recognition: RecognitionConfig,
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: var_or("JWT_ISSUER", "nutrilog"),
            audience: var_or("JWT_AUDIENCE", "nutrilog-users"),
            ttl_minutes: parsed_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: parsed_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let recognition = RecognitionConfig {
            provider: var_or("RECOGNITION_PROVIDER", "logmeal").parse()?,
            logmeal_base_url: var_or("LOGMEAL_BASE_URL", "https://api.logmeal.com"),
            logmeal_api_token: std::env::var("LOGMEAL_API_TOKEN").ok(),
            vision_base_url: var_or(
                "VISION_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            vision_api_key: std::env::var("VISION_API_KEY").ok(),
            vision_model: var_or("VISION_MODEL", "gemini-1.5-flash"),
            timeout_secs: parsed_or("PROVIDER_TIMEOUT_SECS", 30),
            cooldown_secs: parsed_or("PROVIDER_COOLDOWN_SECS", 60),
        };
        Ok(Self {
            database_url,
            jwt,
            photos: PhotoStorageConfig {
                endpoint: var_or("MINIO_ENDPOINT", "http://localhost:9000"),
                bucket: var_or("MINIO_BUCKET", "food-photos"),
                region: var_or("MINIO_REGION", "us-east-1"),
                access_key: var_or("MINIO_ACCESS_KEY", "minioadmin"),
                secret_key: var_or("MINIO_SECRET_KEY", "minioadmin"),
                create_bucket: parsed_or("MINIO_CREATE_BUCKET", true),
            },
            log_store: var_or("LOG_STORE", "postgres").parse()?,
            recognition,
        })
    }
}
