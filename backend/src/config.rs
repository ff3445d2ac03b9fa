use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub cors_origins: Vec<String>,
    /// Public URL of the web client, used for checkout redirects.
    pub site_url: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub sendgrid_api_key: Option<String>,
    pub email_from: String,
    /// Inbox that receives contact form messages.
    pub contact_email: String,
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_upload_preset: String,
    /// Photo URLs must start with this prefix to be accepted. Always ends
    /// with `/`.
    pub image_host_prefix: String,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = var_or(name, default);
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { var: name, value })
}

/// Ensure a URL prefix ends at a path boundary, so `https://host` cannot
/// match `https://host.elsewhere`.
fn url_prefix(value: String) -> String {
    let value = value.trim().to_string();
    if value.is_empty() || value.ends_with('/') {
        value
    } else {
        format!("{}/", value)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: var_or("HOST", "127.0.0.1"),
            port: parse_var("PORT", "8080")?,
            database_url: var_or("DATABASE_URL", "sqlite:family_connect.db?mode=rwc"),
            jwt_secret: var_or("JWT_SECRET", "development-secret-key-change-in-production"),
            jwt_expiration_hours: parse_var("JWT_EXPIRATION_HOURS", "24")?,
            cors_origins: var_or("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            site_url: var_or("SITE_URL", "http://localhost:3000"),
            stripe_secret_key: var_or("STRIPE_SECRET_KEY", ""),
            stripe_webhook_secret: var_or("STRIPE_WEBHOOK_SECRET", ""),
            sendgrid_api_key: optional_var("SENDGRID_API_KEY"),
            email_from: var_or("EMAIL_FROM", "noreply@familyconnect.app"),
            contact_email: var_or("CONTACT_EMAIL", "support@familyconnect.app"),
            cloudinary_cloud_name: optional_var("CLOUDINARY_CLOUD_NAME"),
            cloudinary_upload_preset: var_or("CLOUDINARY_UPLOAD_PRESET", "family_connect"),
            image_host_prefix: url_prefix(var_or("IMAGE_HOST_PREFIX", "https://res.cloudinary.com/")),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global, so config tests run serially
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "HOST",
        "PORT",
        "DATABASE_URL",
        "JWT_SECRET",
        "JWT_EXPIRATION_HOURS",
        "CORS_ORIGINS",
        "SITE_URL",
        "STRIPE_SECRET_KEY",
        "STRIPE_WEBHOOK_SECRET",
        "SENDGRID_API_KEY",
        "EMAIL_FROM",
        "CONTACT_EMAIL",
        "CLOUDINARY_CLOUD_NAME",
        "CLOUDINARY_UPLOAD_PRESET",
        "IMAGE_HOST_PREFIX",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    /// Config used by service and handler tests, independent of the environment.
    pub(crate) fn test_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_expiration_hours: 1,
            cors_origins: vec!["http://localhost:3000".to_string()],
            site_url: "http://localhost:3000".to_string(),
            stripe_secret_key: String::new(),
            stripe_webhook_secret: "whsec_test".to_string(),
            sendgrid_api_key: None,
            email_from: "noreply@familyconnect.app".to_string(),
            contact_email: "support@familyconnect.app".to_string(),
            cloudinary_cloud_name: None,
            cloudinary_upload_preset: "family_connect".to_string(),
            image_host_prefix: "https://res.cloudinary.com/".to_string(),
        }
    }

    #[test]
    fn test_config_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let config = Config::from_env().unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite:family_connect.db?mode=rwc");
        assert_eq!(config.jwt_expiration_hours, 24);
        assert_eq!(config.cors_origins, vec!["http://localhost:3000".to_string()]);
        assert!(config.sendgrid_api_key.is_none());
        assert!(config.cloudinary_cloud_name.is_none());
        assert_eq!(config.image_host_prefix, "https://res.cloudinary.com/");
    }

    #[test]
    fn test_config_from_env() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        env::set_var("HOST", "0.0.0.0");
        env::set_var("PORT", "3000");
        env::set_var("DATABASE_URL", "sqlite:test.db");
        env::set_var("JWT_SECRET", "test-secret");
        env::set_var("JWT_EXPIRATION_HOURS", "48");
        env::set_var("CORS_ORIGINS", "https://a.example, https://b.example");
        env::set_var("SENDGRID_API_KEY", "SG.key");
        env::set_var("CLOUDINARY_CLOUD_NAME", "family");

        let config = Config::from_env().unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, "sqlite:test.db");
        assert_eq!(config.jwt_secret, "test-secret");
        assert_eq!(config.jwt_expiration_hours, 48);
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.sendgrid_api_key.as_deref(), Some("SG.key"));
        assert_eq!(config.cloudinary_cloud_name.as_deref(), Some("family"));

        clear_env();
    }

    #[test]
    fn test_image_host_prefix_ends_at_path_boundary() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        env::set_var("IMAGE_HOST_PREFIX", "https://res.cloudinary.com");
        let config = Config::from_env().unwrap();
        assert_eq!(config.image_host_prefix, "https://res.cloudinary.com/");
        assert!(!crate::services::photos::is_hosted_image(
            "https://res.cloudinary.com.evil.example/x.jpg",
            &config.image_host_prefix
        ));

        clear_env();
    }

    #[test]
    fn test_config_rejects_bad_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        env::set_var("PORT", "eighty");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("PORT"));

        clear_env();
    }
}
