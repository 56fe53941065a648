use anyhow::{Context, Result, anyhow};
use chrono::Duration;
use platform_authn::{AuthConfig, DEFAULT_TOKEN_TTL_HOURS};
use products_tutoring::CloudinaryConfig;
use products_tutoring::images::{DEFAULT_API_BASE, DEFAULT_FOLDER, DEFAULT_MAX_BYTES};

pub const DEFAULT_PORT: u16 = 5000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub cors_allowed_origins: Vec<String>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub upload_folder: String,
    pub upload_max_bytes: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or_else(|| anyhow!("missing env JWT_SECRET"))?;
        let ttl_hours = match get("TOKEN_TTL_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .with_context(|| format!("invalid TOKEN_TTL_HOURS {raw:?}"))?,
            None => DEFAULT_TOKEN_TTL_HOURS,
        };
        let auth = AuthConfig::new(jwt_secret).with_ttl(Duration::hours(ttl_hours));

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let cloudinary = match (get("CLOUDINARY_CLOUD_NAME"), get("CLOUDINARY_UPLOAD_PRESET")) {
            (Some(cloud_name), Some(upload_preset)) => Some(CloudinaryConfig {
                cloud_name,
                upload_preset,
                api_key: get("CLOUDINARY_API_KEY"),
                api_secret: get("CLOUDINARY_API_SECRET"),
                api_base: get("CLOUDINARY_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            }),
            _ => None,
        };

        let upload_max_bytes = match get("UPLOAD_MAX_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("invalid UPLOAD_MAX_BYTES {raw:?}"))?,
            None => DEFAULT_MAX_BYTES,
        };

        Ok(Self {
            auth,
            cors_allowed_origins,
            cloudinary,
            upload_folder: get("CLOUDINARY_FOLDER").unwrap_or_else(|| DEFAULT_FOLDER.into()),
            upload_max_bytes,
        })
    }
}
