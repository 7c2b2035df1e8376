//! Rule-based prediction registry.
//!
//! Each rule is a plain function over [`PredictionInput`] returning zero or
//! more predictions. Rules are additive: the engine runs all of them, buckets
//! the output by category, ranks by probability and keeps the top N per
//! category. No rule can suppress another.

use std::collections::HashMap;

use chrono_tz::Tz;

use crate::models::{
    Analysis, BehaviorAnalytics, ConfidenceScores, ContextSnapshot, Importance, Intent,
    Prediction, PredictionCategory, PredictionSet, ProjectHealth, Risk, RiskAssessment,
    RiskLevel, Urgency, UserProfile, DAY_SECS,
};
use crate::services::behavior_analyzer::burnout_score;
use crate::services::history::mentions_any;
use crate::utils::{local_hour, local_weekday, time_label};

const FOLLOW_UP_MARKERS: &[&str] = &[
    "seguimiento",
    "follow up",
    "después hablamos",
    "te actualizo",
    "pendiente",
    "revisar",
    "confirmar",
];

/// Everything a rule may look at for one request.
pub struct PredictionInput<'a> {
    pub user_id: &'a str,
    pub analysis: &'a Analysis,
    pub snapshot: &'a ContextSnapshot,
    pub profile: &'a UserProfile,
    pub behavior: &'a BehaviorAnalytics,
    pub now: i64,
    /// Local hour of `now`.
    pub hour: u32,
    /// Local weekday of `now`, Sunday = 0.
    pub weekday: u32,
}

pub type PredictionRule = fn(&PredictionInput<'_>) -> Vec<Prediction>;

pub struct RuleEntry {
    pub name: String,
    pub rule: PredictionRule,
}

fn prediction(
    category: PredictionCategory,
    kind: &str,
    probability: f32,
    urgency: Urgency,
    description: impl Into<String>,
    suggested_action: impl Into<String>,
    reasoning: impl Into<String>,
) -> Prediction {
    Prediction {
        category,
        kind: kind.to_string(),
        description: description.into(),
        probability,
        urgency,
        suggested_action: suggested_action.into(),
        reasoning: reasoning.into(),
    }
}

pub struct PredictiveEngine {
    rules: Vec<RuleEntry>,
    timezone: Tz,
}

impl PredictiveEngine {
    /// Engine with no rules.
    pub fn empty(timezone: Tz) -> Self {
        Self {
            rules: Vec::new(),
            timezone,
        }
    }

    pub fn new(timezone: Tz) -> Self {
        let mut engine = Self::empty(timezone);
        engine.register("focus_session", focus_session);
        engine.register("calendar_optimization", calendar_optimization);
        engine.register("week_planning", week_planning);
        engine.register("follow_up", follow_up);
        engine.register("upcoming_meetings", upcoming_meetings);
        engine.register("upcoming_deadlines", upcoming_deadlines);
        engine.register("recurring_tasks", recurring_tasks);
        engine.register("reconnect_contacts", reconnect_contacts);
        engine.register("workload_overload", workload_overload);
        engine.register("calendar_conflicts", calendar_conflicts);
        engine.register("projects_at_risk", projects_at_risk);
        engine.register("productivity_windows", productivity_windows);
        engine.register("learning_window", learning_window);
        engine.register("collaboration", collaboration);
        engine.register("optimization_insights", optimization_suggestions);
        engine
    }

    pub fn register(&mut self, name: &str, rule: PredictionRule) {
        self.rules.push(RuleEntry {
            name: name.to_string(),
            rule,
        });
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn predict(
        &self,
        user_id: &str,
        analysis: &Analysis,
        snapshot: &ContextSnapshot,
        profile: &UserProfile,
        behavior: &BehaviorAnalytics,
        now: i64,
    ) -> PredictionSet {
        let input = PredictionInput {
            user_id,
            analysis,
            snapshot,
            profile,
            behavior,
            now,
            hour: local_hour(now, self.timezone),
            weekday: local_weekday(now, self.timezone),
        };

        let mut buckets: HashMap<PredictionCategory, Vec<Prediction>> = HashMap::new();
        for entry in &self.rules {
            let produced = (entry.rule)(&input);
            if !produced.is_empty() {
                log::debug!("[PredictiveEngine] rule {} produced {}", entry.name, produced.len());
            }
            for p in produced {
                buckets.entry(p.category).or_default().push(p);
            }
        }

        let mut take = |category: PredictionCategory| {
            let mut list = buckets.remove(&category).unwrap_or_default();
            // stable: equal probabilities keep registration order
            list.sort_by(|a, b| b.probability.total_cmp(&a.probability));
            list.truncate(category.limit());
            list
        };

        let set = PredictionSet {
            immediate_needs: take(PredictionCategory::ImmediateNeed),
            upcoming_actions: take(PredictionCategory::UpcomingAction),
            potential_blockers: take(PredictionCategory::PotentialBlocker),
            opportunity_windows: take(PredictionCategory::OpportunityWindow),
            collaboration_opportunities: take(PredictionCategory::Collaboration),
            optimization_suggestions: take(PredictionCategory::Optimization),
            risk_assessment: assess_risks(&input),
            confidence_scores: confidence_scores(profile),
            generated_at: now,
        };
        log::debug!(
            "[PredictiveEngine] {} predictions for {}, overall risk {:?}",
            set.total(),
            user_id,
            set.risk_assessment.overall
        );
        set
    }
}

fn focus_session(input: &PredictionInput<'_>) -> Vec<Prediction> {
    let peaks = &input.profile.working_patterns.peak_hours;
    let productive = if peaks.is_empty() {
        (9..=11).contains(&input.hour)
    } else {
        peaks.contains(&input.hour)
    };
    if !productive {
        return vec![];
    }
    vec![prediction(
        PredictionCategory::ImmediateNeed,
        "focus_session",
        0.85,
        Urgency::High,
        "This is one of your peak productivity hours, good for complex work",
        "Block time for a deep work session",
        "History shows high productivity at this hour",
    )]
}

fn calendar_optimization(input: &PredictionInput<'_>) -> Vec<Prediction> {
    if input.analysis.intent != Intent::Scheduling {
        return vec![];
    }
    vec![prediction(
        PredictionCategory::ImmediateNeed,
        "calendar_optimization",
        0.78,
        Urgency::Medium,
        "Calendar conflicts will need a check",
        "Review availability before confirming",
        "Scheduling requests usually involve conflicts",
    )]
}

fn week_planning(input: &PredictionInput<'_>) -> Vec<Prediction> {
    if input.weekday != 1 || input.hour >= 10 {
        return vec![];
    }
    vec![prediction(
        PredictionCategory::ImmediateNeed,
        "week_planning",
        0.72,
        Urgency::Medium,
        "Good moment to plan the week",
        "Review weekly goals and priorities",
        "Monday morning",
    )]
}

fn follow_up(input: &PredictionInput<'_>) -> Vec<Prediction> {
    let last = match input.snapshot.recent_conversations.first() {
        Some(c) => c,
        None => return vec![],
    };
    if !mentions_any(&last.message, FOLLOW_UP_MARKERS) {
        return vec![];
    }
    vec![prediction(
        PredictionCategory::ImmediateNeed,
        "follow_up",
        0.68,
        Urgency::Medium,
        "The previous conversation needs a follow-up",
        "Send a follow-up or status update",
        "Last conversation contains a follow-up cue",
    )]
}

fn upcoming_meetings(input: &PredictionInput<'_>) -> Vec<Prediction> {
    let mentions = input.behavior.communication.meeting_mentions;
    if mentions <= 2 {
        return vec![];
    }
    vec![prediction(
        PredictionCategory::UpcomingAction,
        "schedule_meeting",
        0.73,
        Urgency::Medium,
        "A meeting will likely need scheduling in the next 1-3 days",
        "Propose time slots in advance",
        format!("{} meeting mentions in recent conversations", mentions),
    )]
}

fn upcoming_deadlines(input: &PredictionInput<'_>) -> Vec<Prediction> {
    if input.behavior.communication.deadline_mentions <= 1 {
        return vec![];
    }
    vec![prediction(
        PredictionCategory::UpcomingAction,
        "deadline_management",
        0.68,
        Urgency::High,
        "Upcoming deadlines need attention in the next 2-5 days",
        "Review due dates and block time for deliverables",
        "Deadlines are a recurring topic in recent conversations",
    )]
}

fn recurring_tasks(input: &PredictionInput<'_>) -> Vec<Prediction> {
    input
        .behavior
        .task_management
        .categories
        .iter()
        .filter(|(_, count)| **count >= 3)
        .map(|(category, count)| {
            prediction(
                PredictionCategory::UpcomingAction,
                category,
                0.6,
                Urgency::Low,
                format!("Recurring {} tasks", category),
                format!("Plan the next {} task for the coming week", category),
                format!("{} {} tasks in the recent window", count, category),
            )
        })
        .collect()
}

fn reconnect_contacts(input: &PredictionInput<'_>) -> Vec<Prediction> {
    let stale = input.now - 14 * DAY_SECS;
    input
        .snapshot
        .contacts
        .iter()
        .filter(|c| c.importance >= Importance::High)
        .filter(|c| c.last_contact.map(|ts| ts < stale).unwrap_or(true))
        .map(|c| {
            prediction(
                PredictionCategory::UpcomingAction,
                "reconnect",
                0.55,
                Urgency::Low,
                format!("Reconnect with {}", c.name),
                format!("Reach out to {} via {}", c.name, c.preferred_contact),
                "Important contact with no interaction in two weeks",
            )
        })
        .collect()
}

fn workload_overload(input: &PredictionInput<'_>) -> Vec<Prediction> {
    if input.behavior.stress.workload_pressure <= 0.7 {
        return vec![];
    }
    vec![prediction(
        PredictionCategory::PotentialBlocker,
        "workload_overload",
        0.75,
        Urgency::High,
        "Risk of work overload in the next 3-5 days",
        "Reschedule non-critical tasks and delegate where possible",
        "Open task volume is near saturation",
    )]
}

fn calendar_conflicts(input: &PredictionInput<'_>) -> Vec<Prediction> {
    let horizon = input.now + 3 * DAY_SECS;
    let mut per_day: HashMap<i64, usize> = HashMap::new();
    for task in input.snapshot.tasks.iter().filter(|t| t.status.is_open()) {
        if let Some(due) = task.due_date.filter(|d| *d >= input.now && *d <= horizon) {
            *per_day.entry(due.div_euclid(DAY_SECS)).or_insert(0) += 1;
        }
    }
    let crowded = per_day.values().filter(|n| **n >= 2).count();
    if crowded == 0 {
        return vec![];
    }
    vec![prediction(
        PredictionCategory::PotentialBlocker,
        "calendar_conflicts",
        0.82,
        Urgency::Medium,
        format!("{} day(s) with overlapping due dates coming up", crowded),
        "Reorder or reschedule tasks ahead of time",
        "Several open tasks are due on the same day",
    )]
}

fn projects_at_risk(input: &PredictionInput<'_>) -> Vec<Prediction> {
    input
        .snapshot
        .projects
        .iter()
        .filter(|p| matches!(p.health(input.now), ProjectHealth::AtRisk | ProjectHealth::Critical))
        .map(|p| {
            prediction(
                PredictionCategory::PotentialBlocker,
                "project_at_risk",
                0.7,
                Urgency::High,
                format!("Project {} is at risk", p.name),
                "Review blockers and dependencies with stakeholders",
                "Project risk level or target date signals trouble",
            )
        })
        .collect()
}

fn productivity_windows(input: &PredictionInput<'_>) -> Vec<Prediction> {
    input
        .profile
        .working_patterns
        .peak_hours
        .iter()
        .map(|hour| {
            prediction(
                PredictionCategory::OpportunityWindow,
                "productivity_window",
                0.88,
                Urgency::Low,
                format!("High-productivity window at {}", time_label(*hour)),
                "Use it for complex work and important decisions",
                "Recurring daily peak",
            )
        })
        .collect()
}

fn learning_window(input: &PredictionInput<'_>) -> Vec<Prediction> {
    if input.behavior.learning.curiosity_level != "high" {
        return vec![];
    }
    vec![prediction(
        PredictionCategory::OpportunityWindow,
        "learning_window",
        0.62,
        Urgency::Low,
        "Good period for learning",
        "Set aside time for a course or reading",
        "Frequent questions and learning mentions",
    )]
}

fn collaboration(input: &PredictionInput<'_>) -> Vec<Prediction> {
    input
        .profile
        .relationships
        .contact_importance
        .iter()
        .take(5)
        .filter(|c| c.mentions >= 3)
        .map(|c| {
            prediction(
                PredictionCategory::Collaboration,
                "collaboration_opportunity",
                0.65,
                Urgency::Low,
                format!("Collaboration opportunity with {}", c.name),
                "Propose a meeting or joint project",
                format!("{} mentions in recent conversations", c.mentions),
            )
        })
        .collect()
}

fn optimization_suggestions(input: &PredictionInput<'_>) -> Vec<Prediction> {
    input
        .behavior
        .optimization_insights
        .iter()
        .map(|i| {
            prediction(
                PredictionCategory::Optimization,
                &i.category,
                i.confidence,
                if i.impact == "high" { Urgency::Medium } else { Urgency::Low },
                i.insight.clone(),
                i.recommendation.clone(),
                format!("{} impact", i.impact),
            )
        })
        .collect()
}

fn level_for(score: u32, high: u32, medium: u32) -> RiskLevel {
    if score >= high {
        RiskLevel::High
    } else if score >= medium {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn assess_risks(input: &PredictionInput<'_>) -> RiskAssessment {
    let stress = &input.behavior.stress;

    let score = burnout_score(stress);
    let burnout = Risk {
        level: level_for(score, 5, 3),
        score,
        indicators: if score > 0 {
            vec!["High workload".to_string(), "Urgency stress".to_string()]
        } else {
            vec![]
        },
        recommendation: if score >= 5 {
            "Reduce workload immediately"
        } else {
            "Monitor stress levels"
        }
        .to_string(),
    };

    let over = stress.overcommitment_risk;
    let over_level = if over > 0.6 {
        RiskLevel::High
    } else if over > 0.3 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    let overcommitment = Risk {
        level: over_level,
        score: (over * 10.0).round() as u32,
        indicators: if over_level != RiskLevel::Low {
            vec!["Many open tasks relative to completions".to_string()]
        } else {
            vec![]
        },
        recommendation: "Close or drop stale tasks before taking new ones".to_string(),
    };

    let overdue = input.behavior.task_management.overdue;
    let deadline = Risk {
        level: level_for(overdue, 4, 1),
        score: overdue,
        indicators: if overdue > 0 {
            vec![format!("{} overdue tasks", overdue)]
        } else {
            vec![]
        },
        recommendation: "Renegotiate or reschedule overdue work".to_string(),
    };

    let levels = [burnout.level, overcommitment.level, deadline.level];
    let high = levels.iter().filter(|l| **l == RiskLevel::High).count();
    let medium = levels.iter().filter(|l| **l == RiskLevel::Medium).count();
    let overall = if high > 1 {
        RiskLevel::High
    } else if high > 0 || medium > 2 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    RiskAssessment {
        burnout,
        overcommitment,
        deadline,
        overall,
    }
}

/// Confidence grows with the number of populated profile dimensions.
pub fn confidence_scores(profile: &UserProfile) -> ConfidenceScores {
    let populated = !profile.is_fallback();
    let mut recent: f32 = 0.5;
    let mut historical: f32 = 0.5;
    let mut patterns: f32 = 0.5;
    if populated && profile.preferences.communication.average_words > 0 {
        recent += 0.3;
    }
    if populated && profile.habits.productivity_peaks.hourly_pattern.iter().any(|v| *v > 0) {
        historical += 0.3;
    }
    if populated && !profile.working_patterns.peak_hours.is_empty() {
        patterns += 0.3;
    }
    ConfidenceScores {
        immediate_needs: (recent * 0.9).min(0.95),
        upcoming_actions: (historical * 0.8).min(0.95),
        potential_blockers: (patterns * 0.7).min(0.95),
        overall: ((recent + historical + patterns) / 3.0).min(0.95),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contact, Conversation, OptimizationInsight, Role, StressAnalysis};

    // 2024-01-15 08:00:00 UTC, a Monday
    const MONDAY_8AM: i64 = 1_705_305_600;

    fn predict(
        engine: &PredictiveEngine,
        analysis: &Analysis,
        snapshot: &ContextSnapshot,
        profile: &UserProfile,
        behavior: &BehaviorAnalytics,
        now: i64,
    ) -> PredictionSet {
        engine.predict("u1", analysis, snapshot, profile, behavior, now)
    }

    #[test]
    fn test_fallback_inputs_produce_bounded_set() {
        let engine = PredictiveEngine::new(Tz::UTC);
        let profile = UserProfile::fallback("u1", MONDAY_8AM);
        let behavior = BehaviorAnalytics::fallback("u1", MONDAY_8AM);
        let set = predict(
            &engine,
            &Analysis::default(),
            &ContextSnapshot::default(),
            &profile,
            &behavior,
            MONDAY_8AM,
        );
        // Monday 8:00 triggers week planning; 8 is not a default peak hour
        assert_eq!(set.immediate_needs.len(), 1);
        assert_eq!(set.immediate_needs[0].kind, "week_planning");
        assert_eq!(set.opportunity_windows.len(), 3);
        assert_eq!(set.risk_assessment.overall, RiskLevel::Low);
        assert!(set.all().all(|p| (0.0..=1.0).contains(&p.probability)));
        assert!((set.confidence_scores.overall - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_immediate_needs_ranked_by_probability() {
        let engine = PredictiveEngine::new(Tz::UTC);
        let mut profile = UserProfile::fallback("u1", MONDAY_8AM);
        profile.working_patterns.peak_hours = vec![8];
        let behavior = BehaviorAnalytics::fallback("u1", MONDAY_8AM);
        let analysis = Analysis {
            intent: Intent::Scheduling,
            ..Default::default()
        };
        let snapshot = ContextSnapshot {
            recent_conversations: vec![Conversation {
                id: "m1".into(),
                user_id: "u1".into(),
                role: Role::User,
                message: "Te actualizo mañana, queda pendiente".into(),
                intent: None,
                urgency: None,
                timestamp: MONDAY_8AM - 60,
            }],
            ..Default::default()
        };
        let set = predict(&engine, &analysis, &snapshot, &profile, &behavior, MONDAY_8AM);
        let kinds: Vec<&str> = set.immediate_needs.iter().map(|p| p.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["focus_session", "calendar_optimization", "week_planning", "follow_up"]
        );
    }

    #[test]
    fn test_category_limits_are_enforced() {
        let mut engine = PredictiveEngine::empty(Tz::UTC);
        fn many(_: &PredictionInput<'_>) -> Vec<Prediction> {
            (0..20)
                .map(|i| {
                    prediction(
                        PredictionCategory::Collaboration,
                        "x",
                        i as f32 / 20.0,
                        Urgency::Low,
                        "",
                        "",
                        "",
                    )
                })
                .collect()
        }
        engine.register("many", many);
        let profile = UserProfile::fallback("u1", 0);
        let behavior = BehaviorAnalytics::fallback("u1", 0);
        let set = predict(
            &engine,
            &Analysis::default(),
            &ContextSnapshot::default(),
            &profile,
            &behavior,
            0,
        );
        assert_eq!(set.collaboration_opportunities.len(), 4);
        assert_eq!(set.collaboration_opportunities[0].probability, 19.0 / 20.0);
    }

    #[test]
    fn test_behavior_driven_rules() {
        let engine = PredictiveEngine::new(Tz::UTC);
        let profile = UserProfile::fallback("u1", MONDAY_8AM);
        let mut behavior = BehaviorAnalytics::fallback("u1", MONDAY_8AM);
        behavior.communication.meeting_mentions = 3;
        behavior.communication.deadline_mentions = 2;
        behavior.task_management.categories.insert("ops".into(), 3);
        behavior.task_management.categories.insert("misc".into(), 2);
        behavior.task_management.overdue = 5;
        behavior.stress = StressAnalysis {
            workload_pressure: 0.9,
            urgency_stress: 0.8,
            deadline_stress: 0.5,
            overcommitment_risk: 0.7,
            stress_level: "high".into(),
        };
        behavior.optimization_insights.push(OptimizationInsight {
            category: "stress-reduction".into(),
            insight: "x".into(),
            recommendation: "y".into(),
            impact: "high".into(),
            confidence: 0.7,
        });
        let snapshot = ContextSnapshot {
            contacts: vec![Contact {
                id: "c1".into(),
                user_id: "u1".into(),
                name: "Boss".into(),
                email: None,
                phone: None,
                company: None,
                relationship: "professional".into(),
                importance: Importance::Critical,
                last_contact: Some(MONDAY_8AM - 30 * DAY_SECS),
                preferred_contact: "phone".into(),
                source: "manual".into(),
                created_at: 0,
            }],
            ..Default::default()
        };
        let set = predict(&engine, &Analysis::default(), &snapshot, &profile, &behavior, MONDAY_8AM);

        let upcoming: Vec<&str> = set.upcoming_actions.iter().map(|p| p.kind.as_str()).collect();
        assert_eq!(upcoming, vec!["schedule_meeting", "deadline_management", "ops", "reconnect"]);
        assert_eq!(set.potential_blockers[0].kind, "workload_overload");
        assert_eq!(set.optimization_suggestions.len(), 1);

        assert_eq!(set.risk_assessment.burnout.score, 7);
        assert_eq!(set.risk_assessment.burnout.level, RiskLevel::High);
        assert_eq!(set.risk_assessment.overcommitment.level, RiskLevel::High);
        assert_eq!(set.risk_assessment.deadline.level, RiskLevel::High);
        assert_eq!(set.risk_assessment.overall, RiskLevel::High);
    }

    #[test]
    fn test_confidence_grows_with_populated_profile() {
        let mut profile = UserProfile::fallback("u1", 0);
        profile.data_points = 10;
        profile.preferences.communication.average_words = 12;
        profile.habits.productivity_peaks.hourly_pattern[9] = 4;
        let scores = confidence_scores(&profile);
        assert!((scores.immediate_needs - 0.72).abs() < 1e-6);
        assert!((scores.upcoming_actions - 0.64).abs() < 1e-6);
        assert!((scores.potential_blockers - 0.56).abs() < 1e-6);
        assert!((scores.overall - 0.8).abs() < 1e-6);
        assert!(scores.overall <= 0.95);
    }
}
