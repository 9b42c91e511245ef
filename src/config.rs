use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub minio_endpoint: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    /// Base URL photo links are built from. Falls back to the endpoint;
    /// set separately when clients reach the bucket through another host.
    pub minio_public_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "pasar".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "pasar-api".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let minio_endpoint =
            std::env::var("MINIO_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".into());
        let minio_public_url =
            std::env::var("MINIO_PUBLIC_URL").unwrap_or_else(|_| minio_endpoint.clone());
        Ok(Self {
            database_url,
            jwt,
            minio_bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "pasar".into()),
            minio_access_key: std::env::var("MINIO_ACCESS_KEY")
                .unwrap_or_else(|_| "minioadmin".into()),
            minio_secret_key: std::env::var("MINIO_SECRET_KEY")
                .unwrap_or_else(|_| "minioadmin".into()),
            minio_endpoint,
            minio_public_url,
        })
    }

    /// Public URL for a stored photo key.
    pub fn photo_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.minio_public_url.trim_end_matches('/'),
            self.minio_bucket,
            key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_url_joins_without_double_slash() {
        let config = AppConfig {
            database_url: "postgres://localhost/pasar".into(),
            jwt: JwtConfig {
                secret: "s".into(),
                issuer: "pasar".into(),
                audience: "pasar-api".into(),
                ttl_minutes: 60,
                refresh_ttl_minutes: 120,
            },
            minio_endpoint: "http://localhost:9000".into(),
            minio_bucket: "pasar".into(),
            minio_access_key: "k".into(),
            minio_secret_key: "k".into(),
            minio_public_url: "http://cdn.local:9000/".into(),
        };
        assert_eq!(
            config.photo_url("products/abc.png"),
            "http://cdn.local:9000/pasar/products/abc.png"
        );
    }
}
