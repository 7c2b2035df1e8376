use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Importance;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub typical_hours: Vec<u32>,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            typical_hours: vec![9, 10, 11, 14, 15, 16],
            start_hour: 9,
            end_hour: 17,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationHabits {
    pub average_words: u32,
    pub question_rate: f32,
    pub urgency_rate: f32,
    pub density: String,
}

impl Default for CommunicationHabits {
    fn default() -> Self {
        Self {
            average_words: 0,
            question_rate: 0.0,
            urgency_rate: 0.0,
            density: "moderate".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPreferences {
    pub priority_distribution: BTreeMap<String, u32>,
    pub preferred_categories: Vec<String>,
    pub urgency_tendency: String,
}

impl Default for TaskPreferences {
    fn default() -> Self {
        Self {
            priority_distribution: BTreeMap::new(),
            preferred_categories: vec![],
            urgency_tendency: "planned".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicInterest {
    pub topic: String,
    pub mentions: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub working_hours: WorkingHours,
    pub communication: CommunicationHabits,
    pub task_preferences: TaskPreferences,
    pub topic_interests: Vec<TopicInterest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductivityPeaks {
    pub peak_hours: Vec<u32>,
    pub peak_days: Vec<u32>,
    pub hourly_pattern: Vec<u32>,
    pub daily_pattern: Vec<u32>,
}

impl Default for ProductivityPeaks {
    fn default() -> Self {
        Self {
            peak_hours: vec![9, 10, 15],
            peak_days: vec![1, 2, 3],
            hourly_pattern: vec![0; 24],
            daily_pattern: vec![0; 7],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionHabits {
    pub total: u32,
    pub completed: u32,
    pub completion_rate: f32,
    pub average_hours: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningHabits {
    pub with_due_date_rate: f32,
    pub with_project_rate: f32,
    pub style: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Habits {
    pub productivity_peaks: ProductivityPeaks,
    pub task_completion: CompletionHabits,
    pub planning: PlanningHabits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRanking {
    pub contact_id: String,
    pub name: String,
    pub mentions: u32,
    pub importance: Importance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTeam {
    pub project: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    pub contact_importance: Vec<ContactRanking>,
    pub project_teams: Vec<ProjectTeam>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    pub short_term: Vec<String>,
    pub long_term: Vec<String>,
    pub learning: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyLevels {
    pub morning: u32,
    pub afternoon: u32,
    pub evening: u32,
    pub night: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingPatterns {
    pub peak_hours: Vec<u32>,
    pub energy_levels: EnergyLevels,
}

impl Default for WorkingPatterns {
    fn default() -> Self {
        Self {
            peak_hours: vec![9, 10, 15],
            energy_levels: EnergyLevels::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationStyle {
    pub formality_level: String,
    pub response_length: String,
    pub questioning_style: String,
}

impl Default for CommunicationStyle {
    fn default() -> Self {
        Self {
            formality_level: "professional".to_string(),
            response_length: "moderate".to_string(),
            questioning_style: "balanced".to_string(),
        }
    }
}

/// Long-term picture of one user, rebuilt from history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub preferences: Preferences,
    pub habits: Habits,
    pub relationships: Relationships,
    pub goals: Goals,
    pub working_patterns: WorkingPatterns,
    pub communication_style: CommunicationStyle,
    /// Conversations plus tasks that fed the profile; 0 for the fallback.
    pub data_points: u32,
    pub last_updated: i64,
}

impl UserProfile {
    /// Profile returned when history can't be read.
    pub fn fallback(user_id: &str, now: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            preferences: Preferences::default(),
            habits: Habits::default(),
            relationships: Relationships::default(),
            goals: Goals::default(),
            working_patterns: WorkingPatterns::default(),
            communication_style: CommunicationStyle::default(),
            data_points: 0,
            last_updated: now,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.data_points == 0
    }
}
