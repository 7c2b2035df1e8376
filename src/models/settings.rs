use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub version: String,
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub loader: LoaderSettings,
    #[serde(default)]
    pub compaction: CompactionSettings,
    #[serde(default)]
    pub extraction: ExtractionSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub actions: ActionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            general: GeneralSettings::default(),
            cache: CacheSettings::default(),
            loader: LoaderSettings::default(),
            compaction: CompactionSettings::default(),
            extraction: ExtractionSettings::default(),
            history: HistorySettings::default(),
            actions: ActionSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// IANA name; hour and weekday bucketing happen in this zone.
    pub timezone: String,
    pub db_path: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            db_path: "contextflow.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub context_ttl_secs: u64,
    pub profile_ttl_secs: u64,
    pub behavior_ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            context_ttl_secs: 5 * 60,
            profile_ttl_secs: 60 * 60,
            behavior_ttl_secs: 60 * 60,
            max_entries: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    pub max_contacts: usize,
    pub max_tasks: usize,
    pub max_projects: usize,
    pub max_notes: usize,
    pub max_conversations: usize,
    pub recent_contact_days: i64,
    pub store_timeout_ms: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_contacts: 10,
            max_tasks: 15,
            max_projects: 8,
            max_notes: 5,
            max_conversations: 5,
            recent_contact_days: 7,
            store_timeout_ms: default_store_timeout_ms(),
        }
    }
}

fn default_store_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionSettings {
    pub max_contacts: usize,
    pub max_tasks: usize,
    pub max_projects: usize,
    pub max_notes: usize,
    pub max_conversations: usize,
    pub message_preview_chars: usize,
}

impl Default for CompactionSettings {
    fn default() -> Self {
        Self {
            max_contacts: 5,
            max_tasks: 8,
            max_projects: 5,
            max_notes: 3,
            max_conversations: 3,
            message_preview_chars: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub primary_locale: String,
    pub secondary_locale: String,
    pub max_input_chars: usize,
    pub max_matches_per_group: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            primary_locale: "es".to_string(),
            secondary_locale: "en".to_string(),
            max_input_chars: 10_000,
            max_matches_per_group: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub behavior_window_days: i64,
    pub preference_conversations: usize,
    pub preference_tasks: usize,
    pub habit_conversations: usize,
    pub habit_tasks: usize,
    pub relationship_conversations: usize,
    pub pattern_conversations: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            behavior_window_days: 30,
            preference_conversations: 100,
            preference_tasks: 50,
            habit_conversations: 200,
            habit_tasks: 100,
            relationship_conversations: 300,
            pattern_conversations: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSettings {
    pub enabled: bool,
    pub default_project_days: i64,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_project_days: 30,
        }
    }
}
