use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    Contact, Conversation, Importance, Intent, Note, Priority, Project, ProjectHealth,
    ProjectStatus, Task, TaskStatus, Urgency,
};

/// Records loaded for one message, already filtered and capped per source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub contacts: Vec<Contact>,
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub notes: Vec<Note>,
    pub recent_conversations: Vec<Conversation>,
    /// Names of every project a loaded task links to, keyed by project id.
    /// Covers projects outside `projects` (on hold, archived, past the cap).
    #[serde(default)]
    pub project_names: HashMap<String, String>,
    pub relevance_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub name: String,
    pub company: Option<String>,
    pub relationship: String,
    pub importance: Importance,
    pub last_contact: Option<i64>,
    pub preferred_contact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<i64>,
    pub project: Option<String>,
    pub progress: u8,
    pub is_overdue: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub name: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub progress: u8,
    pub target_date: Option<i64>,
    pub health: ProjectHealth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub title: String,
    #[serde(rename = "type")]
    pub note_type: String,
    pub tags: Vec<String>,
    pub key_topics: Vec<String>,
    pub last_modified: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub message: String,
    pub intent: Option<Intent>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

/// Wall-clock facts about "now" in the configured timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeContext {
    pub current_time: String,
    pub timezone: String,
    pub hour: u32,
    pub weekday: u32,
    pub time_of_day: TimeOfDay,
    pub greeting: String,
    pub is_weekend: bool,
    pub is_working_hours: bool,
}

/// Bounded projection of a [`ContextSnapshot`], safe to embed in a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactContext {
    pub intent: Intent,
    pub urgency: Urgency,
    pub relevant_contacts: Vec<ContactSummary>,
    pub active_tasks: Vec<TaskSummary>,
    pub current_projects: Vec<ProjectSummary>,
    pub key_notes: Vec<NoteSummary>,
    pub recent_context: Vec<ConversationSummary>,
    pub relevance_score: f32,
    pub time_context: Option<TimeContext>,
}
