use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakHour {
    pub hour: u32,
    pub score: u32,
    pub time_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceWindow {
    pub start: String,
    pub end: String,
    pub duration_hours: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyDistribution {
    pub morning: f32,
    pub afternoon: f32,
    pub evening: f32,
    pub energy_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionTrend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletionStats {
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub completion_rate: f32,
    pub avg_completion_hours: Option<f32>,
    pub trend: CompletionTrend,
}

impl Default for TaskCompletionStats {
    fn default() -> Self {
        Self {
            total_tasks: 0,
            completed_tasks: 0,
            completion_rate: 0.0,
            avg_completion_hours: None,
            trend: CompletionTrend::InsufficientData,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductivityAnalysis {
    pub peak_hours: Vec<PeakHour>,
    pub top_performance_window: Option<PerformanceWindow>,
    pub energy_distribution: EnergyDistribution,
    pub task_completion: TaskCompletionStats,
    pub burnout_risk: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePattern {
    pub avg_response_secs: Option<f32>,
    pub fast_responses: u32,
    pub slow_responses: u32,
    pub pattern: String,
}

impl Default for ResponsePattern {
    fn default() -> Self {
        Self {
            avg_response_secs: None,
            fast_responses: 0,
            slow_responses: 0,
            pattern: "no-data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunicationAnalysis {
    pub response_times: ResponsePattern,
    pub message_volume: u32,
    pub daily_average: f32,
    pub question_rate: f32,
    pub meeting_mentions: u32,
    pub deadline_mentions: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskManagementAnalysis {
    pub created: u32,
    pub completed: u32,
    pub overdue: u32,
    pub high_priority_share: f32,
    pub procrastination_score: f32,
    pub deadline_adherence: f32,
    pub categories: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeManagementAnalysis {
    pub working_hours_share: f32,
    pub after_hours_share: f32,
    pub weekend_share: f32,
    pub urgency_handling: String,
    pub work_life_balance: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollaborationAnalysis {
    pub active_contacts: u32,
    pub linked_task_share: f32,
    pub shared_projects: u32,
    pub collaboration_level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningAnalysis {
    pub learning_mentions: u32,
    pub question_rate: f32,
    pub curiosity_level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StressAnalysis {
    pub workload_pressure: f32,
    pub urgency_stress: f32,
    pub deadline_stress: f32,
    pub overcommitment_risk: f32,
    pub stress_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationInsight {
    pub category: String,
    pub insight: String,
    pub recommendation: String,
    pub impact: String,
    pub confidence: f32,
}

/// Behavioural metrics over the recent history window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorAnalytics {
    pub user_id: String,
    pub productivity: ProductivityAnalysis,
    pub communication: CommunicationAnalysis,
    pub task_management: TaskManagementAnalysis,
    pub time_management: TimeManagementAnalysis,
    pub collaboration: CollaborationAnalysis,
    pub learning: LearningAnalysis,
    pub stress: StressAnalysis,
    pub optimization_insights: Vec<OptimizationInsight>,
    pub data_points: u32,
    pub timestamp: i64,
}

impl BehaviorAnalytics {
    pub fn fallback(user_id: &str, now: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            productivity: ProductivityAnalysis {
                burnout_risk: "low".to_string(),
                ..Default::default()
            },
            communication: CommunicationAnalysis::default(),
            task_management: TaskManagementAnalysis::default(),
            time_management: TimeManagementAnalysis {
                urgency_handling: "unknown".to_string(),
                work_life_balance: "unknown".to_string(),
                ..Default::default()
            },
            collaboration: CollaborationAnalysis {
                collaboration_level: "unknown".to_string(),
                ..Default::default()
            },
            learning: LearningAnalysis {
                curiosity_level: "unknown".to_string(),
                ..Default::default()
            },
            stress: StressAnalysis {
                stress_level: "low".to_string(),
                ..Default::default()
            },
            optimization_insights: vec![],
            data_points: 0,
            timestamp: now,
        }
    }
}
