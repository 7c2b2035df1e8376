use std::collections::BTreeMap;
use std::sync::Arc;

use chrono_tz::Tz;

use crate::models::{
    BehaviorAnalytics, CollaborationAnalysis, CommunicationAnalysis, CompletionTrend,
    Conversation, EnergyDistribution, LearningAnalysis, OptimizationInsight, PeakHour,
    PerformanceWindow, ProductivityAnalysis, ResponsePattern, Role, StressAnalysis, Task,
    TaskCompletionStats, TaskManagementAnalysis, TimeManagementAnalysis, Urgency, DAY_SECS,
};
use crate::services::cache::TtlCache;
use crate::services::history::{mentions_any, ratio, History};
use crate::store::{ConversationQuery, Stores, TaskOrder, TaskQuery};
use crate::utils::clock::Clock;
use crate::utils::{local_hour, local_weekday, time_label};

pub(crate) const MEETING_MARKERS: &[&str] = &["reunión", "meeting", "junta", "call", "videollamada"];
pub(crate) const DEADLINE_MARKERS: &[&str] = &["deadline", "entrega", "fecha límite", "vencimiento"];
const LEARNING_MARKERS: &[&str] = &[
    "aprender", "curso", "estudiar", "investigar", "learn", "course", "study", "research",
    "tutorial",
];

/// Open tasks at which workload pressure saturates.
const WORKLOAD_SATURATION: f32 = 15.0;

/// 0-7 burnout score from stress metrics. 5+ is high, 3+ medium.
pub fn burnout_score(stress: &StressAnalysis) -> u32 {
    let mut score = 0;
    if stress.workload_pressure > 0.8 {
        score += 3;
    }
    if stress.urgency_stress > 0.7 {
        score += 2;
    }
    if stress.overcommitment_risk > 0.6 {
        score += 2;
    }
    score
}

fn burnout_label(score: u32) -> &'static str {
    if score >= 5 {
        "high"
    } else if score >= 3 {
        "medium"
    } else {
        "low"
    }
}

/// Timestamped activity: conversations weigh 1, completed tasks 2.
fn weighted_activity(history: &History) -> Vec<(i64, u32)> {
    history
        .conversations
        .iter()
        .map(|c| (c.timestamp, 1))
        .chain(history.tasks.iter().filter_map(|t| t.completed_at).map(|ts| (ts, 2)))
        .collect()
}

/// Behavioural metrics over the recent history window, cached per user.
pub struct BehaviorAnalyzer {
    stores: Stores,
    cache: TtlCache<String, Arc<BehaviorAnalytics>>,
    window_days: i64,
    timezone: Tz,
    clock: Arc<dyn Clock>,
}

impl BehaviorAnalyzer {
    pub fn new(
        stores: Stores,
        window_days: i64,
        ttl_secs: u64,
        capacity: usize,
        timezone: Tz,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stores,
            cache: TtlCache::new(ttl_secs, capacity, clock.clone()),
            window_days,
            timezone,
            clock,
        }
    }

    pub fn invalidate(&self, user_id: &str) {
        self.cache.invalidate(&user_id.to_string());
    }

    pub async fn analyze(&self, user_id: &str) -> Arc<BehaviorAnalytics> {
        let key = user_id.to_string();
        if let Some(analytics) = self.cache.get(&key) {
            log::debug!("[BehaviorAnalyzer] cache hit for user {}", user_id);
            return analytics;
        }

        let now = self.clock.timestamp();
        let since = now - self.window_days * DAY_SECS;
        let conversation_query = ConversationQuery {
            roles: None,
            since: Some(since),
            limit: None,
        };
        let task_query = TaskQuery {
            include_archived: true,
            created_since: Some(since),
            order: TaskOrder::Newest,
            ..Default::default()
        };

        match History::load(&self.stores, user_id, &conversation_query, &task_query).await {
            Ok(history) => {
                let analytics = Arc::new(self.analytics_from(user_id, &history, now));
                log::info!(
                    "[BehaviorAnalyzer] analysed {} data points for {} ({} insights)",
                    analytics.data_points,
                    user_id,
                    analytics.optimization_insights.len()
                );
                self.cache.put(key, analytics.clone());
                analytics
            }
            Err(e) => {
                log::warn!("[BehaviorAnalyzer] history unavailable for {}, using fallback: {}", user_id, e);
                Arc::new(BehaviorAnalytics::fallback(user_id, now))
            }
        }
    }

    pub fn analytics_from(&self, user_id: &str, history: &History, now: i64) -> BehaviorAnalytics {
        let stress = stress_analysis(history, now);
        let mut productivity = self.productivity(history, now);
        productivity.burnout_risk = burnout_label(burnout_score(&stress)).to_string();
        let communication = self.communication(history);
        let learning = learning_analysis(history);
        let mut analytics = BehaviorAnalytics {
            user_id: user_id.to_string(),
            productivity,
            communication,
            task_management: task_management(history, now),
            time_management: self.time_management(history),
            collaboration: collaboration(history, now, self.window_days),
            learning,
            stress,
            optimization_insights: vec![],
            data_points: history.data_points(),
            timestamp: now,
        };
        analytics.optimization_insights = optimization_insights(&analytics);
        analytics
    }

    fn productivity(&self, history: &History, now: i64) -> ProductivityAnalysis {
        let mut scores = vec![0u32; 24];
        for (ts, weight) in weighted_activity(history) {
            scores[local_hour(ts, self.timezone) as usize] += weight;
        }
        let mut ranked: Vec<(u32, u32)> = scores
            .iter()
            .enumerate()
            .filter(|(_, s)| **s > 0)
            .map(|(h, s)| (h as u32, *s))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let peak_hours: Vec<PeakHour> = ranked
            .iter()
            .take(4)
            .map(|(hour, score)| PeakHour {
                hour: *hour,
                score: *score,
                time_label: time_label(*hour),
            })
            .collect();

        let top_performance_window = if peak_hours.len() >= 2 {
            let start = peak_hours.iter().map(|p| p.hour).min().unwrap_or(0);
            let end = peak_hours.iter().map(|p| p.hour).max().unwrap_or(0);
            Some(PerformanceWindow {
                start: time_label(start),
                end: time_label(end),
                duration_hours: end - start,
            })
        } else {
            None
        };

        let period = |from: usize, to: usize| scores[from..to].iter().sum::<u32>();
        let (morning, afternoon, evening) = (period(6, 12), period(12, 18), period(18, 22));
        let total = morning + afternoon + evening;
        let energy_distribution = if total == 0 {
            EnergyDistribution {
                energy_type: "unknown".to_string(),
                ..Default::default()
            }
        } else {
            let max = morning.max(afternoon).max(evening);
            let energy_type = if max == morning {
                "morning-person"
            } else if max == afternoon {
                "afternoon-peak"
            } else {
                "evening-productive"
            };
            EnergyDistribution {
                morning: morning as f32 / total as f32,
                afternoon: afternoon as f32 / total as f32,
                evening: evening as f32 / total as f32,
                energy_type: energy_type.to_string(),
            }
        };

        ProductivityAnalysis {
            peak_hours,
            top_performance_window,
            energy_distribution,
            task_completion: completion_stats(&history.tasks, now),
            burnout_risk: String::new(),
        }
    }

    fn communication(&self, history: &History) -> CommunicationAnalysis {
        let user: Vec<&Conversation> =
            history.conversations.iter().filter(|c| c.role == Role::User).collect();
        let questions = user.iter().filter(|c| c.message.contains('?')).count();
        CommunicationAnalysis {
            response_times: response_pattern(&history.conversations),
            message_volume: user.len() as u32,
            daily_average: user.len() as f32 / self.window_days.max(1) as f32,
            question_rate: ratio(questions, user.len()),
            meeting_mentions: history
                .conversations
                .iter()
                .filter(|c| mentions_any(&c.message, MEETING_MARKERS))
                .count() as u32,
            deadline_mentions: history
                .conversations
                .iter()
                .filter(|c| mentions_any(&c.message, DEADLINE_MARKERS))
                .count() as u32,
        }
    }

    fn time_management(&self, history: &History) -> TimeManagementAnalysis {
        let activity = weighted_activity(history);
        let total = activity.len();
        let (mut working, mut after_hours, mut weekend) = (0usize, 0usize, 0usize);
        for (ts, _) in &activity {
            let hour = local_hour(*ts, self.timezone);
            let day = local_weekday(*ts, self.timezone);
            let is_weekend = day == 0 || day == 6;
            if is_weekend {
                weekend += 1;
            } else if (9..18).contains(&hour) {
                working += 1;
            }
            if hour < 8 || hour >= 20 {
                after_hours += 1;
            }
        }

        let urgent: Vec<&Task> = history.tasks.iter().filter(|t| t.priority.is_high()).collect();
        let urgent_done = ratio(urgent.iter().filter(|t| t.completed_at.is_some()).count(), urgent.len());
        let urgency_handling = if urgent.is_empty() {
            "no-data"
        } else if urgent_done > 0.7 {
            "proactive"
        } else if urgent_done > 0.4 {
            "reactive"
        } else {
            "delayed"
        };

        let off_hours = ratio(after_hours, total) + ratio(weekend, total);
        let work_life_balance = if total == 0 {
            "unknown"
        } else if off_hours > 0.4 {
            "poor"
        } else if off_hours > 0.2 {
            "fair"
        } else {
            "good"
        };

        TimeManagementAnalysis {
            working_hours_share: ratio(working, total),
            after_hours_share: ratio(after_hours, total),
            weekend_share: ratio(weekend, total),
            urgency_handling: urgency_handling.to_string(),
            work_life_balance: work_life_balance.to_string(),
        }
    }
}

fn completion_stats(tasks: &[Task], now: i64) -> TaskCompletionStats {
    let completed = tasks.iter().filter(|t| t.completed_at.is_some()).count();
    let hours: Vec<f64> = tasks.iter().filter_map(|t| t.completion_hours()).collect();
    TaskCompletionStats {
        total_tasks: tasks.len() as u32,
        completed_tasks: completed as u32,
        completion_rate: ratio(completed, tasks.len()),
        avg_completion_hours: (!hours.is_empty())
            .then(|| (hours.iter().sum::<f64>() / hours.len() as f64) as f32),
        trend: completion_trend(tasks, now),
    }
}

/// Last seven days of completions against the seven before.
pub fn completion_trend(tasks: &[Task], now: i64) -> CompletionTrend {
    let last_week = now - 7 * DAY_SECS;
    let previous_week = now - 14 * DAY_SECS;
    let recent = tasks
        .iter()
        .filter_map(|t| t.completed_at)
        .filter(|ts| *ts >= last_week)
        .count();
    let previous = tasks
        .iter()
        .filter_map(|t| t.completed_at)
        .filter(|ts| *ts >= previous_week && *ts < last_week)
        .count();
    if previous == 0 {
        return CompletionTrend::InsufficientData;
    }
    let change = (recent as f32 - previous as f32) / previous as f32 * 100.0;
    if change > 10.0 {
        CompletionTrend::Improving
    } else if change < -10.0 {
        CompletionTrend::Declining
    } else {
        CompletionTrend::Stable
    }
}

/// Latency of assistant replies to the user message right before them.
pub fn response_pattern(conversations: &[Conversation]) -> ResponsePattern {
    let mut ordered: Vec<&Conversation> = conversations.iter().collect();
    ordered.sort_by_key(|c| c.timestamp);
    let latencies: Vec<i64> = ordered
        .windows(2)
        .filter(|w| w[0].role == Role::User && w[1].role == Role::Assistant)
        .map(|w| w[1].timestamp - w[0].timestamp)
        .collect();
    if latencies.is_empty() {
        return ResponsePattern::default();
    }
    let avg = latencies.iter().sum::<i64>() as f32 / latencies.len() as f32;
    let pattern = if avg < 10.0 {
        "very-responsive"
    } else if avg < 30.0 {
        "responsive"
    } else if avg < 60.0 {
        "moderate"
    } else {
        "thoughtful"
    };
    ResponsePattern {
        avg_response_secs: Some(avg),
        fast_responses: latencies.iter().filter(|l| **l < 5).count() as u32,
        slow_responses: latencies.iter().filter(|l| **l > 30).count() as u32,
        pattern: pattern.to_string(),
    }
}

fn task_management(history: &History, now: i64) -> TaskManagementAnalysis {
    let tasks = &history.tasks;
    let completed = tasks.iter().filter(|t| t.completed_at.is_some()).count();
    let overdue = tasks.iter().filter(|t| t.is_overdue(now)).count();
    let dated: Vec<&Task> = tasks.iter().filter(|t| t.due_date.is_some()).collect();
    let late = dated
        .iter()
        .filter(|t| match (t.completed_at, t.due_date) {
            (Some(done), Some(due)) => done > due,
            _ => t.is_overdue(now),
        })
        .count();
    let dated_done: Vec<&&Task> = dated.iter().filter(|t| t.completed_at.is_some()).collect();
    let on_time = dated_done
        .iter()
        .filter(|t| matches!((t.completed_at, t.due_date), (Some(done), Some(due)) if done <= due))
        .count();

    let mut categories = BTreeMap::new();
    for t in tasks {
        let name = t.category.clone().unwrap_or_else(|| "general".to_string());
        *categories.entry(name).or_insert(0u32) += 1;
    }

    TaskManagementAnalysis {
        created: tasks.len() as u32,
        completed: completed as u32,
        overdue: overdue as u32,
        high_priority_share: ratio(tasks.iter().filter(|t| t.priority.is_high()).count(), tasks.len()),
        procrastination_score: ratio(late, dated.len()),
        deadline_adherence: ratio(on_time, dated_done.len()),
        categories,
    }
}

fn collaboration(history: &History, now: i64, window_days: i64) -> CollaborationAnalysis {
    let since = now - window_days * DAY_SECS;
    let active = history
        .contacts
        .iter()
        .filter(|c| c.last_contact.map(|ts| ts >= since).unwrap_or(false))
        .count();
    let linked = ratio(
        history.tasks.iter().filter(|t| !t.related_contacts.is_empty()).count(),
        history.tasks.len(),
    );
    let shared = history
        .projects
        .iter()
        .filter(|p| !p.archived && !p.stakeholders.is_empty())
        .count();
    let level = if active > 10 || linked > 0.5 {
        "high"
    } else if active > 3 || linked > 0.2 {
        "medium"
    } else {
        "low"
    };
    CollaborationAnalysis {
        active_contacts: active as u32,
        linked_task_share: linked,
        shared_projects: shared as u32,
        collaboration_level: level.to_string(),
    }
}

fn learning_analysis(history: &History) -> LearningAnalysis {
    let user: Vec<&Conversation> =
        history.conversations.iter().filter(|c| c.role == Role::User).collect();
    let mentions = user.iter().filter(|c| mentions_any(&c.message, LEARNING_MARKERS)).count();
    let questions = ratio(user.iter().filter(|c| c.message.contains('?')).count(), user.len());
    let curiosity = if questions > 0.4 || mentions > 5 {
        "high"
    } else if questions > 0.15 || mentions > 1 {
        "medium"
    } else {
        "low"
    };
    LearningAnalysis {
        learning_mentions: mentions as u32,
        question_rate: questions,
        curiosity_level: curiosity.to_string(),
    }
}

fn stress_analysis(history: &History, now: i64) -> StressAnalysis {
    let tasks = &history.tasks;
    let open = tasks.iter().filter(|t| t.status.is_open() && !t.archived).count();
    let workload = (open as f32 / WORKLOAD_SATURATION).min(1.0);
    let urgency = ratio(
        history
            .conversations
            .iter()
            .filter(|c| matches!(c.urgency, Some(Urgency::High | Urgency::Critical)))
            .count(),
        history.conversations.len(),
    );
    let deadline = ratio(
        tasks.iter().filter(|t| t.is_overdue(now)).count(),
        tasks.iter().filter(|t| t.due_date.is_some()).count(),
    );
    let completed = tasks.iter().filter(|t| t.completed_at.is_some()).count();
    let overcommitment = if tasks.is_empty() {
        0.0
    } else {
        (tasks.len() - completed) as f32 / tasks.len() as f32
    };

    let mean = (workload + urgency + deadline + overcommitment) / 4.0;
    let level = if mean > 0.6 {
        "high"
    } else if mean > 0.3 {
        "medium"
    } else {
        "low"
    };
    StressAnalysis {
        workload_pressure: workload,
        urgency_stress: urgency,
        deadline_stress: deadline,
        overcommitment_risk: overcommitment,
        stress_level: level.to_string(),
    }
}

fn optimization_insights(analytics: &BehaviorAnalytics) -> Vec<OptimizationInsight> {
    let mut insights = Vec::new();
    let peaks = &analytics.productivity.peak_hours;
    if let Some(first) = peaks.first() {
        let until = peaks
            .get(1)
            .map(|p| p.time_label.clone())
            .unwrap_or_else(|| "the following hours".to_string());
        insights.push(OptimizationInsight {
            category: "peak-performance".to_string(),
            insight: format!("Your productivity peaks between {} and {}", first.time_label, until),
            recommendation: "Schedule complex work during these hours".to_string(),
            impact: "high".to_string(),
            confidence: 0.85,
        });
    }
    if analytics.communication.response_times.pattern == "very-responsive" {
        insights.push(OptimizationInsight {
            category: "communication-efficiency".to_string(),
            insight: "You reply very quickly (under 10 seconds on average)".to_string(),
            recommendation: "Take more time on complex replies".to_string(),
            impact: "medium".to_string(),
            confidence: 0.75,
        });
    }
    let completion = &analytics.productivity.task_completion;
    if completion.total_tasks >= 5 && completion.completion_rate < 0.5 {
        insights.push(OptimizationInsight {
            category: "task-completion".to_string(),
            insight: format!(
                "Only {:.0}% of recent tasks were completed",
                completion.completion_rate * 100.0
            ),
            recommendation: "Limit work in progress and close tasks before opening new ones"
                .to_string(),
            impact: "high".to_string(),
            confidence: 0.7,
        });
    }
    if analytics.time_management.work_life_balance == "poor" {
        insights.push(OptimizationInsight {
            category: "work-life-balance".to_string(),
            insight: "A large share of activity happens after hours or on weekends".to_string(),
            recommendation: "Protect evenings and weekends from routine work".to_string(),
            impact: "medium".to_string(),
            confidence: 0.65,
        });
    }
    if analytics.stress.stress_level == "high" {
        insights.push(OptimizationInsight {
            category: "stress-reduction".to_string(),
            insight: "Workload and urgency indicators are elevated".to_string(),
            recommendation: "Defer or delegate non-critical tasks".to_string(),
            impact: "high".to_string(),
            confidence: 0.7,
        });
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, TaskStatus};
    use crate::store::memory::MemoryStore;
    use crate::store::StoreSource;
    use crate::utils::clock::ManualClock;

    // 2024-01-15 10:00:00 UTC, a Monday
    const NOW: i64 = 1_705_312_800;
    const HOUR: i64 = 3600;

    fn conversation(i: usize, role: Role, ts: i64, message: &str) -> Conversation {
        Conversation {
            id: format!("m{}", i),
            user_id: "u1".into(),
            role,
            message: message.into(),
            intent: None,
            urgency: None,
            timestamp: ts,
        }
    }

    fn task(i: usize, created_at: i64, completed_at: Option<i64>) -> Task {
        Task {
            id: format!("t{}", i),
            user_id: "u1".into(),
            title: format!("Task {}", i),
            description: String::new(),
            status: if completed_at.is_some() { TaskStatus::Completed } else { TaskStatus::Pending },
            priority: Priority::Medium,
            category: None,
            project_id: None,
            due_date: None,
            progress: 0,
            related_contacts: vec![],
            last_activity: created_at,
            created_at,
            completed_at,
            archived: false,
            source: "manual".into(),
            original_text: None,
        }
    }

    fn analyzer(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> BehaviorAnalyzer {
        BehaviorAnalyzer::new(Stores::from_shared(store), 30, 3600, 64, Tz::UTC, clock)
    }

    #[test]
    fn test_completion_trend_weeks() {
        let t = |i, days_ago: i64| task(i, NOW - 20 * DAY_SECS, Some(NOW - days_ago * DAY_SECS));
        assert_eq!(completion_trend(&[t(1, 2), t(2, 3), t(3, 9)], NOW), CompletionTrend::Improving);
        assert_eq!(completion_trend(&[t(1, 2), t(2, 9), t(3, 10)], NOW), CompletionTrend::Declining);
        assert_eq!(completion_trend(&[t(1, 2), t(2, 9)], NOW), CompletionTrend::Stable);
        assert_eq!(completion_trend(&[t(1, 2)], NOW), CompletionTrend::InsufficientData);
    }

    #[test]
    fn test_response_pattern_buckets() {
        let convs = vec![
            conversation(1, Role::User, 100, "hola"),
            conversation(2, Role::Assistant, 104, "hola!"),
            conversation(3, Role::User, 200, "y?"),
            conversation(4, Role::Assistant, 212, "listo"),
        ];
        let pattern = response_pattern(&convs);
        assert_eq!(pattern.pattern, "very-responsive");
        assert_eq!(pattern.fast_responses, 1);
        assert_eq!(pattern.avg_response_secs, Some(8.0));
        assert_eq!(response_pattern(&[]).pattern, "no-data");
    }

    #[test]
    fn test_burnout_score_tiers() {
        let stress = StressAnalysis {
            workload_pressure: 0.9,
            urgency_stress: 0.8,
            overcommitment_risk: 0.1,
            ..Default::default()
        };
        assert_eq!(burnout_score(&stress), 5);
        assert_eq!(burnout_label(5), "high");
        assert_eq!(burnout_label(3), "medium");
        assert_eq!(burnout_label(2), "low");
    }

    #[tokio::test]
    async fn test_analytics_from_window() {
        let clock = Arc::new(ManualClock::at_timestamp(NOW));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        // two 9:00 messages and a 14:00 completion; the 40-day-old message is outside the window
        store.insert_conversation(conversation(1, Role::User, NOW - HOUR, "meeting con el equipo?"));
        store.insert_conversation(conversation(2, Role::User, NOW - HOUR - DAY_SECS, "otra reunión"));
        store.insert_conversation(conversation(3, Role::User, NOW - 40 * DAY_SECS, "old"));
        store.insert_task(task(1, NOW - 2 * DAY_SECS, Some(NOW - 20 * HOUR)));
        store.insert_task(task(2, NOW - 2 * DAY_SECS, None));

        let analytics = analyzer(store.clone(), clock).analyze("u1").await;
        assert_eq!(analytics.data_points, 4);
        assert_eq!(analytics.communication.message_volume, 2);
        assert_eq!(analytics.communication.meeting_mentions, 2);
        assert_eq!(analytics.productivity.peak_hours[0].hour, 9);
        assert_eq!(analytics.productivity.peak_hours[0].score, 2);
        assert_eq!(analytics.productivity.peak_hours[1].hour, 14);
        assert_eq!(analytics.productivity.energy_distribution.energy_type, "morning-person");
        assert!(analytics.productivity.top_performance_window.is_some());
        assert_eq!(analytics.task_management.completed, 1);
        assert_eq!(analytics.task_management.categories.get("general"), Some(&2));
        assert!(analytics
            .optimization_insights
            .iter()
            .any(|i| i.category == "peak-performance"));
        assert_eq!(store.query_count(StoreSource::Conversations), 1);
    }

    #[tokio::test]
    async fn test_failure_returns_fallback() {
        let clock = Arc::new(ManualClock::at_timestamp(NOW));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        store.set_unavailable(StoreSource::Contacts, true);
        let analytics = analyzer(store, clock).analyze("u1").await;
        assert_eq!(analytics.data_points, 0);
        assert_eq!(analytics.communication.response_times.pattern, "no-data");
        assert!(analytics.productivity.peak_hours.is_empty());
    }
}
