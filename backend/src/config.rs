use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    DynamoDb,
    Memory,
}

#[derive(Debug, Clone)]
pub struct TableNames {
    pub admins: String,
    pub devices: String,
    pub images: String,
    pub results: String,
    pub feedbacks: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub storage_backend: StorageBackend,
    pub tables: TableNames,
    pub staging_dir: PathBuf,
    pub images_dir: PathBuf,
    pub classifier_config_path: PathBuf,
    pub max_upload_bytes: usize,
    pub default_admin_email: String,
    pub default_admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let session_secret = lookup("SESSION_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("SESSION_SECRET"))?;

        let port = parse_number(&lookup, "PORT", 8081u16)?;
        let session_ttl_hours = parse_number(&lookup, "SESSION_TTL_HOURS", 24i64)?;
        if session_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_TTL_HOURS",
                value: session_ttl_hours.to_string(),
            });
        }
        let max_upload_bytes = parse_number(&lookup, "MAX_UPLOAD_BYTES", 50 * 1024 * 1024usize)?;

        let storage_backend = match or_default("STORAGE_BACKEND", "dynamodb")
            .to_ascii_lowercase()
            .as_str()
        {
            "dynamodb" => StorageBackend::DynamoDb,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let tables = TableNames {
            admins: or_default("DYNAMODB_ADMINS_TABLE", "admins"),
            devices: or_default("DYNAMODB_DEVICES_TABLE", "devices"),
            images: or_default("DYNAMODB_IMAGES_TABLE", "images"),
            results: or_default("DYNAMODB_RESULTS_TABLE", "results"),
            feedbacks: or_default("DYNAMODB_FEEDBACKS_TABLE", "feedbacks"),
        };

        Ok(Self {
            host: or_default("HOST", "0.0.0.0"),
            port,
            session_secret,
            session_ttl_hours,
            storage_backend,
            tables,
            staging_dir: PathBuf::from(or_default("STAGING_DIR", "static/uploads")),
            images_dir: PathBuf::from(or_default("IMAGES_DIR", "static/images")),
            classifier_config_path: PathBuf::from(or_default(
                "CLASSIFIER_CONFIG",
                "config/classifier.yaml",
            )),
            max_upload_bytes,
            default_admin_email: or_default("DEFAULT_ADMIN_EMAIL", "admin@freshscan.local"),
            default_admin_password: lookup("DEFAULT_ADMIN_PASSWORD").filter(|p| !p.is_empty()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[("SESSION_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.storage_backend, StorageBackend::DynamoDb);
        assert_eq!(config.tables.results, "results");
        assert_eq!(config.staging_dir, PathBuf::from("static/uploads"));
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert!(config.default_admin_password.is_none());
        assert_eq!(config.bind_address(), "0.0.0.0:8081");
    }

    #[test]
    fn missing_secret_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SESSION_SECRET")));
    }

    #[test]
    fn unparsable_numbers_are_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("SESSION_SECRET", "s3cret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn memory_backend_is_selectable() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SESSION_SECRET", "s3cret"),
            ("STORAGE_BACKEND", "Memory"),
            ("DYNAMODB_IMAGES_TABLE", "freshscan-images"),
        ]))
        .unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.tables.images, "freshscan-images");
    }
}
