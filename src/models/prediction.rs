use serde::{Deserialize, Serialize};

use super::Urgency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionCategory {
    ImmediateNeed,
    UpcomingAction,
    PotentialBlocker,
    OpportunityWindow,
    Collaboration,
    Optimization,
}

impl PredictionCategory {
    /// Maximum number of predictions kept for this category.
    pub fn limit(&self) -> usize {
        match self {
            PredictionCategory::ImmediateNeed => 5,
            PredictionCategory::UpcomingAction => 8,
            PredictionCategory::PotentialBlocker => 6,
            PredictionCategory::OpportunityWindow => 5,
            PredictionCategory::Collaboration => 4,
            PredictionCategory::Optimization => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub category: PredictionCategory,
    pub kind: String,
    pub description: String,
    pub probability: f32,
    pub urgency: Urgency,
    pub suggested_action: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub level: RiskLevel,
    pub score: u32,
    pub indicators: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub burnout: Risk,
    pub overcommitment: Risk,
    pub deadline: Risk,
    pub overall: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub immediate_needs: f32,
    pub upcoming_actions: f32,
    pub potential_blockers: f32,
    pub overall: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSet {
    pub immediate_needs: Vec<Prediction>,
    pub upcoming_actions: Vec<Prediction>,
    pub potential_blockers: Vec<Prediction>,
    pub opportunity_windows: Vec<Prediction>,
    pub collaboration_opportunities: Vec<Prediction>,
    pub optimization_suggestions: Vec<Prediction>,
    pub risk_assessment: RiskAssessment,
    pub confidence_scores: ConfidenceScores,
    pub generated_at: i64,
}

impl PredictionSet {
    pub fn total(&self) -> usize {
        self.immediate_needs.len()
            + self.upcoming_actions.len()
            + self.potential_blockers.len()
            + self.opportunity_windows.len()
            + self.collaboration_opportunities.len()
            + self.optimization_suggestions.len()
    }

    pub fn all(&self) -> impl Iterator<Item = &Prediction> {
        self.immediate_needs
            .iter()
            .chain(self.upcoming_actions.iter())
            .chain(self.potential_blockers.iter())
            .chain(self.opportunity_windows.iter())
            .chain(self.collaboration_opportunities.iter())
            .chain(self.optimization_suggestions.iter())
    }
}
