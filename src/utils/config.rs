use std::path::Path;

use crate::error::ConfigError;
use crate::models::Settings;

const ENV_DB_PATH: &str = "CONTEXTFLOW_DB_PATH";
const ENV_TIMEZONE: &str = "CONTEXTFLOW_TIMEZONE";
const ENV_CONTEXT_TTL: &str = "CONTEXTFLOW_CONTEXT_TTL_SECS";
const ENV_PRIMARY_LOCALE: &str = "CONTEXTFLOW_PRIMARY_LOCALE";

pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Read settings from a JSON file. Missing sections fall back to defaults.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let settings: Settings = serde_json::from_str(&raw)?;
    Ok(settings)
}

pub fn apply_env_defaults(settings: &mut Settings) {
    if let Some(path) = env_value(ENV_DB_PATH) {
        settings.general.db_path = path;
    }
    if let Some(tz) = env_value(ENV_TIMEZONE) {
        settings.general.timezone = tz;
    }
    if let Some(ttl) = env_value(ENV_CONTEXT_TTL) {
        match ttl.parse::<u64>() {
            Ok(secs) => settings.cache.context_ttl_secs = secs,
            Err(_) => log::warn!("[Config] ignoring non-numeric {}={}", ENV_CONTEXT_TTL, ttl),
        }
    }
    if let Some(locale) = env_value(ENV_PRIMARY_LOCALE) {
        settings.extraction.primary_locale = locale;
    }
}

/// Reject settings the engine can't run with.
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if crate::utils::parse_timezone(&settings.general.timezone).is_none() {
        return Err(ConfigError::Timezone(settings.general.timezone.clone()));
    }
    for locale in [
        &settings.extraction.primary_locale,
        &settings.extraction.secondary_locale,
    ] {
        if crate::services::entity_extractor::Locale::parse(locale).is_none() {
            return Err(ConfigError::Locale(locale.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_file_uses_defaults() {
        let dir = std::env::temp_dir().join(format!("contextflow-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(
            &path,
            r#"{"version":"1.0.0","general":{"timezone":"Europe/Madrid","db_path":"x.db"}}"#,
        )
        .unwrap();
        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.general.timezone, "Europe/Madrid");
        assert_eq!(settings.cache.context_ttl_secs, 300);
        assert_eq!(settings.loader.max_tasks, 15);
        assert!(validate(&settings).is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_section_keeps_other_fields() {
        let settings: Settings =
            serde_json::from_str(r#"{"version":"1.0.0","loader":{"max_tasks":20}}"#).unwrap();
        assert_eq!(settings.loader.max_tasks, 20);
        assert_eq!(settings.loader.max_contacts, 10);
        assert_eq!(settings.loader.store_timeout_ms, 2000);

        let settings: Settings =
            serde_json::from_str(r#"{"version":"1.0.0","cache":{"context_ttl_secs":60},"general":{}}"#).unwrap();
        assert_eq!(settings.cache.context_ttl_secs, 60);
        assert_eq!(settings.cache.max_entries, Settings::default().cache.max_entries);
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_timezone_and_locale() {
        let mut settings = Settings::default();
        settings.general.timezone = "Mars/Olympus".into();
        assert!(matches!(validate(&settings), Err(ConfigError::Timezone(_))));

        let mut settings = Settings::default();
        settings.extraction.secondary_locale = "xx".into();
        assert!(matches!(validate(&settings), Err(ConfigError::Locale(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_settings(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
