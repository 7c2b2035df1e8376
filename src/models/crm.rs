use serde::{Deserialize, Serialize};

use super::{Intent, Urgency};

pub const DAY_SECS: i64 = 24 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    Medium,
    High,
    Critical,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "low",
            Importance::Medium => "medium",
            Importance::High => "high",
            Importance::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Importance> {
        Some(match s {
            "low" => Importance::Low,
            "medium" => Importance::Medium,
            "high" => Importance::High,
            "critical" => Importance::Critical,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
            Priority::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Priority> {
        Some(match s {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            "critical" => Priority::Critical,
            _ => return None,
        })
    }

    /// Numeric rank used for SQL ordering.
    pub fn rank(&self) -> i64 {
        *self as i64
    }

    pub fn is_high(&self) -> bool {
        *self >= Priority::High
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    Blocked,
    Waiting,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Waiting => "waiting",
        }
    }

    pub fn parse(s: &str) -> Option<TaskStatus> {
        Some(match s {
            "pending" => TaskStatus::Pending,
            "in-progress" => TaskStatus::InProgress,
            "completed" => TaskStatus::Completed,
            "cancelled" => TaskStatus::Cancelled,
            "blocked" => TaskStatus::Blocked,
            "waiting" => TaskStatus::Waiting,
            _ => return None,
        })
    }

    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::InProgress => "in-progress",
            ProjectStatus::OnHold => "on-hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<ProjectStatus> {
        Some(match s {
            "planning" => ProjectStatus::Planning,
            "in-progress" => ProjectStatus::InProgress,
            "on-hold" => ProjectStatus::OnHold,
            "completed" => ProjectStatus::Completed,
            "cancelled" => ProjectStatus::Cancelled,
            _ => return None,
        })
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ProjectStatus::Planning | ProjectStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        Some(match s {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectHealth {
    Critical,
    AtRisk,
    Healthy,
    Normal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub relationship: String,
    pub importance: Importance,
    pub last_contact: Option<i64>,
    pub preferred_contact: String,
    pub source: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub category: Option<String>,
    pub project_id: Option<String>,
    pub due_date: Option<i64>,
    pub progress: u8,
    pub related_contacts: Vec<String>,
    pub last_activity: i64,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub archived: bool,
    pub source: String,
    pub original_text: Option<String>,
}

impl Task {
    pub fn is_overdue(&self, now: i64) -> bool {
        match self.due_date {
            Some(due) => due < now && self.status != TaskStatus::Completed,
            None => false,
        }
    }

    /// Hours between creation and completion, when completed.
    pub fn completion_hours(&self) -> Option<f64> {
        self.completed_at
            .filter(|done| *done >= self.created_at)
            .map(|done| (done - self.created_at) as f64 / 3600.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub progress: u8,
    pub start_date: i64,
    pub target_date: Option<i64>,
    pub risk_level: Importance,
    pub stakeholders: Vec<String>,
    pub created_at: i64,
    pub archived: bool,
    pub source: String,
}

impl Project {
    pub fn health(&self, now: i64) -> ProjectHealth {
        let past_target = self
            .target_date
            .map(|t| t < now && self.status != ProjectStatus::Completed)
            .unwrap_or(false);
        if self.risk_level == Importance::Critical {
            ProjectHealth::Critical
        } else if self.risk_level == Importance::High || past_target {
            ProjectHealth::AtRisk
        } else if self.progress > 80 {
            ProjectHealth::Healthy
        } else {
            ProjectHealth::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub note_type: String,
    pub tags: Vec<String>,
    pub key_topics: Vec<String>,
    pub pinned: bool,
    pub last_modified: i64,
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub role: Role,
    pub message: String,
    pub intent: Option<Intent>,
    pub urgency: Option<Urgency>,
    pub timestamp: i64,
}

/// Fields needed to create a contact; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub relationship: String,
    pub importance: Importance,
    pub last_contact: Option<i64>,
    pub preferred_contact: String,
    pub source: String,
}

impl NewContact {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            phone: None,
            company: None,
            relationship: "professional".to_string(),
            importance: Importance::Medium,
            last_contact: None,
            preferred_contact: "email".to_string(),
            source: "manual".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub category: Option<String>,
    pub project_id: Option<String>,
    pub due_date: Option<i64>,
    pub source: String,
    pub original_text: Option<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            category: None,
            project_id: None,
            due_date: None,
            source: "manual".to_string(),
            original_text: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub start_date: i64,
    pub target_date: Option<i64>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub note_type: String,
    pub tags: Vec<String>,
    pub key_topics: Vec<String>,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConversation {
    pub role: Role,
    pub message: String,
    pub intent: Option<Intent>,
    pub urgency: Option<Urgency>,
    pub timestamp: i64,
}
