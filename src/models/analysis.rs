use serde::{Deserialize, Serialize};

use super::EntitySet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Question,
    Command,
    TaskCreation,
    ContactLookup,
    ProjectStatus,
    Scheduling,
    DataRetrieval,
    Planning,
    Greeting,
    Information,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Question => "question",
            Intent::Command => "command",
            Intent::TaskCreation => "task_creation",
            Intent::ContactLookup => "contact_lookup",
            Intent::ProjectStatus => "project_status",
            Intent::Scheduling => "scheduling",
            Intent::DataRetrieval => "data_retrieval",
            Intent::Planning => "planning",
            Intent::Greeting => "greeting",
            Intent::Information => "information",
        }
    }

    pub fn parse(s: &str) -> Option<Intent> {
        Some(match s {
            "question" => Intent::Question,
            "command" => Intent::Command,
            "task_creation" => Intent::TaskCreation,
            "contact_lookup" => Intent::ContactLookup,
            "project_status" => Intent::ProjectStatus,
            "scheduling" => Intent::Scheduling,
            "data_retrieval" => Intent::DataRetrieval,
            "planning" => Intent::Planning,
            "greeting" => Intent::Greeting,
            "information" => Intent::Information,
            _ => return None,
        })
    }

    /// Intents for which only open tasks are loaded.
    pub fn wants_open_tasks(&self) -> bool {
        matches!(self, Intent::TaskCreation | Intent::Scheduling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Urgency> {
        Some(match s {
            "low" => Urgency::Low,
            "medium" => Urgency::Medium,
            "high" => Urgency::High,
            "critical" => Urgency::Critical,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub intent: Intent,
    pub urgency: Urgency,
    pub complexity: Complexity,
    pub action_required: bool,
    pub entities: EntitySet,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            intent: Intent::Information,
            urgency: Urgency::Medium,
            complexity: Complexity::Simple,
            action_required: false,
            entities: EntitySet::default(),
        }
    }
}
