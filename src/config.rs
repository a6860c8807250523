use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub upload_preset: String,
    pub folder: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cloudinary: CloudinaryConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        // A missing signing secret is a fatal misconfiguration; fail startup.
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            ttl_days: std::env::var("JWT_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let cloudinary = CloudinaryConfig {
            cloud_name: std::env::var("CLOUDINARY_CLOUD_NAME")?,
            api_key: std::env::var("CLOUDINARY_API_KEY")?,
            api_secret: std::env::var("CLOUDINARY_API_SECRET")?,
            upload_preset: std::env::var("CLOUDINARY_UPLOAD_PRESET")?,
            folder: std::env::var("CLOUDINARY_FOLDER")
                .unwrap_or_else(|_| "motortech/cars".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            cloudinary,
        })
    }
}
