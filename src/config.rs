use std::net::SocketAddr;
use std::path::PathBuf;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Application-level constants
pub const APP_NAME: &str = "Medic Assist";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address for the local API. Loopback only: the browser form
/// runs on the same machine.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// Default generative model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Generative Language API base URL.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Default transport timeout for a single model call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default browser origin allowed to call the API (the intake form).
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Interviews idle longer than this are dropped from memory.
pub const DEFAULT_INTERVIEW_TTL_SECS: u64 = 12 * 60 * 60;

/// Shortest access token accepted from the environment.
pub const MIN_ACCESS_TOKEN_CHARS: usize = 16;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,medic_assist_lib=debug,tower_http=info"
}

/// Get the application data directory
/// ~/MedicAssist/ on all platforms. Falls back to the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("MedicAssist")
}

/// Path of the session history archive inside a data directory.
pub fn history_db_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("history.db")
}

/// Shared secret the form presents as `Authorization: Bearer <token>`.
/// Zeroed on drop, never printed by `Debug`.
#[derive(Clone)]
pub struct AccessToken {
    value: Zeroizing<String>,
    generated: bool,
}

impl AccessToken {
    /// Random token for this process run.
    pub fn generate() -> Self {
        Self {
            value: Zeroizing::new(uuid::Uuid::new_v4().simple().to_string()),
            generated: true,
        }
    }

    /// Operator-supplied token. `None` when shorter than
    /// `MIN_ACCESS_TOKEN_CHARS`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < MIN_ACCESS_TOKEN_CHARS {
            return None;
        }
        Some(Self {
            value: Zeroizing::new(trimmed.to_string()),
            generated: false,
        })
    }

    /// Constant-time comparison with a presented token.
    pub fn matches(&self, presented: &str) -> bool {
        self.value.as_bytes().ct_eq(presented.as_bytes()).into()
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    /// True when no token was configured and one was generated at start-up.
    pub fn is_generated(&self) -> bool {
        self.generated
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Runtime configuration, resolved from environment variables with defaults.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub bind_addr: SocketAddr,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
    pub data_dir: PathBuf,
    /// Only this origin receives CORS headers.
    pub allowed_origin: String,
    pub access_token: AccessToken,
    pub interview_ttl_secs: u64,
}

/// Configuration errors surface at start-up only.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            data_dir: app_data_dir(),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            access_token: AccessToken::generate(),
            interview_ttl_secs: DEFAULT_INTERVIEW_TTL_SECS,
        }
    }
}

impl AssistantConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (the environment in production,
    /// a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = non_blank(lookup("MEDIC_ASSIST_BIND")) {
            config.bind_addr = value.parse().map_err(|_| ConfigError::InvalidValue {
                var: "MEDIC_ASSIST_BIND",
                value,
            })?;
        }
        if let Some(value) = non_blank(lookup("MEDIC_ASSIST_MODEL")) {
            config.model = value;
        }
        if let Some(value) = non_blank(lookup("MEDIC_ASSIST_API_BASE")) {
            config.api_base = value.trim_end_matches('/').to_string();
        }
        if let Some(value) = non_blank(lookup("MEDIC_ASSIST_TIMEOUT_SECS")) {
            config.timeout_secs = match value.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "MEDIC_ASSIST_TIMEOUT_SECS",
                        value,
                    })
                }
            };
        }
        if let Some(value) = non_blank(lookup("MEDIC_ASSIST_DATA_DIR")) {
            config.data_dir = PathBuf::from(value);
        }
        if let Some(value) = non_blank(lookup("MEDIC_ASSIST_ALLOWED_ORIGIN")) {
            let origin = value.trim_end_matches('/');
            let valid = (origin.starts_with("http://") || origin.starts_with("https://"))
                && !origin.contains(char::is_whitespace)
                && !origin.contains('*');
            if !valid {
                return Err(ConfigError::InvalidValue {
                    var: "MEDIC_ASSIST_ALLOWED_ORIGIN",
                    value,
                });
            }
            config.allowed_origin = origin.to_string();
        }
        if let Some(value) = non_blank(lookup("MEDIC_ASSIST_ACCESS_TOKEN")) {
            config.access_token =
                AccessToken::parse(&value).ok_or(ConfigError::InvalidValue {
                    var: "MEDIC_ASSIST_ACCESS_TOKEN",
                    value: "(too short)".into(),
                })?;
        }
        if let Some(value) = non_blank(lookup("MEDIC_ASSIST_INTERVIEW_TTL_SECS")) {
            config.interview_ttl_secs = match value.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "MEDIC_ASSIST_INTERVIEW_TTL_SECS",
                        value,
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn history_db_path(&self) -> PathBuf {
        history_db_path(&self.data_dir)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
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
    fn app_data_dir_ends_with_app_folder() {
        assert!(app_data_dir().ends_with("MedicAssist"));
    }

    #[test]
    fn history_db_under_data_dir() {
        let dir = PathBuf::from("/tmp/medic");
        assert_eq!(history_db_path(&dir), PathBuf::from("/tmp/medic/history.db"));
    }

    #[test]
    fn defaults_when_environment_empty() {
        let config = AssistantConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AssistantConfig::from_lookup(lookup_from(&[
            ("MEDIC_ASSIST_BIND", "0.0.0.0:9000"),
            ("MEDIC_ASSIST_MODEL", "gemini-2.0-pro"),
            ("MEDIC_ASSIST_API_BASE", "http://localhost:1234/"),
            ("MEDIC_ASSIST_TIMEOUT_SECS", "30"),
            ("MEDIC_ASSIST_DATA_DIR", "/var/lib/medic"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.model, "gemini-2.0-pro");
        assert_eq!(config.api_base, "http://localhost:1234");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(
            config.history_db_path(),
            PathBuf::from("/var/lib/medic/history.db")
        );
    }

    #[test]
    fn blank_values_are_ignored() {
        let config =
            AssistantConfig::from_lookup(lookup_from(&[("MEDIC_ASSIST_MODEL", "   ")])).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn invalid_bind_address_rejected() {
        let err = AssistantConfig::from_lookup(lookup_from(&[("MEDIC_ASSIST_BIND", "nope")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var: "MEDIC_ASSIST_BIND", .. }
        ));
    }

    #[test]
    fn zero_timeout_rejected() {
        let result =
            AssistantConfig::from_lookup(lookup_from(&[("MEDIC_ASSIST_TIMEOUT_SECS", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn allowed_origin_from_environment() {
        let config = AssistantConfig::from_lookup(lookup_from(&[(
            "MEDIC_ASSIST_ALLOWED_ORIGIN",
            "https://form.clinic.local/",
        )]))
        .unwrap();
        assert_eq!(config.allowed_origin, "https://form.clinic.local");

        let defaults = AssistantConfig::from_lookup(|_| None).unwrap();
        assert_eq!(defaults.allowed_origin, DEFAULT_ALLOWED_ORIGIN);
    }

    #[test]
    fn wildcard_origin_rejected() {
        for origin in ["*", "http://*", "localhost:3000"] {
            let err = AssistantConfig::from_lookup(lookup_from(&[(
                "MEDIC_ASSIST_ALLOWED_ORIGIN",
                origin,
            )]))
            .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { var: "MEDIC_ASSIST_ALLOWED_ORIGIN", .. }
            ));
        }
    }

    #[test]
    fn access_token_configured_or_generated() {
        let config = AssistantConfig::from_lookup(lookup_from(&[(
            "MEDIC_ASSIST_ACCESS_TOKEN",
            "0123456789abcdef-form",
        )]))
        .unwrap();
        assert!(!config.access_token.is_generated());
        assert!(config.access_token.matches("0123456789abcdef-form"));
        assert!(!config.access_token.matches("0123456789abcdef"));

        let generated = AssistantConfig::from_lookup(|_| None).unwrap();
        assert!(generated.access_token.is_generated());
        assert_eq!(generated.access_token.expose().len(), 32);
        assert_ne!(
            generated.access_token.expose(),
            AccessToken::generate().expose()
        );
    }

    #[test]
    fn short_access_token_rejected() {
        let err = AssistantConfig::from_lookup(lookup_from(&[(
            "MEDIC_ASSIST_ACCESS_TOKEN",
            "short",
        )]))
        .unwrap_err();
        assert!(!err.to_string().contains("short"));
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::parse("0123456789abcdef-form").unwrap();
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
    }

    #[test]
    fn interview_ttl_from_environment() {
        let config = AssistantConfig::from_lookup(lookup_from(&[(
            "MEDIC_ASSIST_INTERVIEW_TTL_SECS",
            "600",
        )]))
        .unwrap();
        assert_eq!(config.interview_ttl_secs, 600);
        assert!(AssistantConfig::from_lookup(lookup_from(&[(
            "MEDIC_ASSIST_INTERVIEW_TTL_SECS",
            "0"
        )]))
        .is_err());
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
