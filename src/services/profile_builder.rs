use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono_tz::Tz;

use crate::models::{
    CommunicationHabits, CommunicationStyle, CompletionHabits, ContactRanking, Conversation,
    EnergyLevels, Goals, Habits, HistorySettings, Importance, PlanningHabits, Preferences,
    Priority, ProductivityPeaks, ProjectTeam, Relationships, Role, Task, TaskPreferences,
    TopicInterest, Urgency, UserProfile, WorkingHours, WorkingPatterns, DAY_SECS,
};
use crate::services::cache::TtlCache;
use crate::services::entity_extractor::EntityExtractor;
use crate::services::history::{find_peaks, mentions_any, ratio, History};
use crate::store::{ConversationQuery, Stores, TaskOrder, TaskQuery};
use crate::utils::clock::Clock;
use crate::utils::{local_hour, local_weekday, truncate_chars};

const FORMAL_MARKERS: &[&str] = &[
    "usted", "por favor", "gracias", "estimado", "cordialmente", "please", "thank you",
    "kindly", "regards",
];
const CASUAL_MARKERS: &[&str] = &["hey", "jaja", "lol", "ok", "thx", "btw", "genial", "cool"];
const LEARNING_MARKERS: &[&str] = &[
    "aprender", "curso", "estudiar", "capacitación", "learn", "course", "study", "training",
    "tutorial",
];

fn newest<T>(items: &[T], n: usize) -> &[T] {
    &items[..items.len().min(n)]
}

fn user_messages(conversations: &[Conversation]) -> impl Iterator<Item = &Conversation> {
    conversations.iter().filter(|c| c.role == Role::User)
}

/// Builds and caches the long-term [`UserProfile`] of each user.
pub struct ProfileBuilder {
    stores: Stores,
    extractor: Arc<EntityExtractor>,
    cache: TtlCache<String, Arc<UserProfile>>,
    history: HistorySettings,
    timezone: Tz,
    clock: Arc<dyn Clock>,
}

impl ProfileBuilder {
    pub fn new(
        stores: Stores,
        extractor: Arc<EntityExtractor>,
        history: HistorySettings,
        ttl_secs: u64,
        capacity: usize,
        timezone: Tz,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stores,
            extractor,
            cache: TtlCache::new(ttl_secs, capacity, clock.clone()),
            history,
            timezone,
            clock,
        }
    }

    pub fn invalidate(&self, user_id: &str) {
        self.cache.invalidate(&user_id.to_string());
    }

    /// Cached profile, rebuilt when older than the profile TTL. Store
    /// failures yield [`UserProfile::fallback`], which is not cached.
    pub async fn build(&self, user_id: &str) -> Arc<UserProfile> {
        let key = user_id.to_string();
        if let Some(profile) = self.cache.get(&key) {
            log::debug!("[ProfileBuilder] cache hit for user {}", user_id);
            return profile;
        }

        let h = &self.history;
        let conversation_query = ConversationQuery {
            roles: None,
            since: None,
            limit: Some(
                h.preference_conversations
                    .max(h.habit_conversations)
                    .max(h.relationship_conversations)
                    .max(h.pattern_conversations),
            ),
        };
        let task_query = TaskQuery {
            include_archived: true,
            order: TaskOrder::Newest,
            limit: Some(h.preference_tasks.max(h.habit_tasks)),
            ..Default::default()
        };

        let now = self.clock.timestamp();
        match History::load(&self.stores, user_id, &conversation_query, &task_query).await {
            Ok(history) => {
                let profile = Arc::new(self.profile_from(user_id, &history, now));
                log::info!(
                    "[ProfileBuilder] built profile for {} from {} data points",
                    user_id,
                    profile.data_points
                );
                self.cache.put(key, profile.clone());
                profile
            }
            Err(e) => {
                log::warn!("[ProfileBuilder] history unavailable for {}, using fallback: {}", user_id, e);
                Arc::new(UserProfile::fallback(user_id, now))
            }
        }
    }

    /// Pure aggregation over already loaded history.
    pub fn profile_from(&self, user_id: &str, history: &History, now: i64) -> UserProfile {
        let h = &self.history;
        let conv = |n: usize| newest(&history.conversations, n);
        let tasks = |n: usize| newest(&history.tasks, n);

        let preferences = Preferences {
            working_hours: self.working_hours(conv(h.preference_conversations)),
            communication: communication_habits(conv(h.preference_conversations)),
            task_preferences: task_preferences(tasks(h.preference_tasks)),
            topic_interests: self.topic_interests(conv(h.preference_conversations)),
        };
        let habits = Habits {
            productivity_peaks: self
                .productivity_peaks(conv(h.habit_conversations), tasks(h.habit_tasks)),
            task_completion: completion_habits(tasks(h.habit_tasks)),
            planning: planning_habits(tasks(h.habit_tasks)),
        };
        let relationships = Relationships {
            contact_importance: rank_contacts(history, conv(h.relationship_conversations)),
            project_teams: project_teams(history),
        };

        UserProfile {
            user_id: user_id.to_string(),
            preferences,
            habits,
            relationships,
            goals: goals(history, conv(h.preference_conversations), now),
            working_patterns: self.working_patterns(conv(h.pattern_conversations)),
            communication_style: communication_style(conv(h.habit_conversations)),
            data_points: history.data_points(),
            last_updated: now,
        }
    }

    fn hour_histogram<'a>(&self, conversations: impl Iterator<Item = &'a Conversation>) -> Vec<u32> {
        let mut hours = vec![0u32; 24];
        for c in conversations {
            hours[local_hour(c.timestamp, self.timezone) as usize] += 1;
        }
        hours
    }

    fn working_hours(&self, conversations: &[Conversation]) -> WorkingHours {
        let counts = self.hour_histogram(conversations.iter());
        let mut ranked: Vec<(u32, u32)> = counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(hour, c)| (hour as u32, *c))
            .collect();
        if ranked.is_empty() {
            return WorkingHours::default();
        }
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut typical: Vec<u32> = ranked.iter().take(8).map(|(hour, _)| *hour).collect();
        typical.sort_unstable();
        WorkingHours {
            start_hour: typical.first().copied().unwrap_or(9),
            end_hour: typical.last().copied().unwrap_or(17),
            typical_hours: typical,
        }
    }

    fn topic_interests(&self, conversations: &[Conversation]) -> Vec<TopicInterest> {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for c in user_messages(conversations) {
            let entities = self.extractor.extract(&c.message);
            for keyword in entities.keywords() {
                *counts.entry(keyword.to_lowercase()).or_insert(0) += 1;
            }
        }
        let mut topics: Vec<TopicInterest> = counts
            .into_iter()
            .map(|(topic, mentions)| TopicInterest { topic, mentions })
            .collect();
        topics.sort_by(|a, b| b.mentions.cmp(&a.mentions).then_with(|| a.topic.cmp(&b.topic)));
        topics.truncate(10);
        topics
    }

    fn productivity_peaks(&self, conversations: &[Conversation], tasks: &[Task]) -> ProductivityPeaks {
        let mut hourly = vec![0u32; 24];
        let mut daily = vec![0u32; 7];
        for c in conversations {
            hourly[local_hour(c.timestamp, self.timezone) as usize] += 1;
            daily[local_weekday(c.timestamp, self.timezone) as usize] += 1;
        }
        for done in tasks.iter().filter_map(|t| t.completed_at) {
            hourly[local_hour(done, self.timezone) as usize] += 2;
            daily[local_weekday(done, self.timezone) as usize] += 2;
        }
        let peak_hours = find_peaks(&hourly);
        if peak_hours.is_empty() {
            return ProductivityPeaks::default();
        }
        ProductivityPeaks {
            peak_hours,
            peak_days: find_peaks(&daily),
            hourly_pattern: hourly,
            daily_pattern: daily,
        }
    }

    fn working_patterns(&self, conversations: &[Conversation]) -> WorkingPatterns {
        let hours = self.hour_histogram(conversations.iter());
        let peak_hours = find_peaks(&hours);
        if peak_hours.is_empty() {
            return WorkingPatterns::default();
        }
        let sum = |range: std::ops::Range<usize>| hours[range].iter().sum::<u32>();
        WorkingPatterns {
            peak_hours,
            energy_levels: EnergyLevels {
                morning: sum(6..12),
                afternoon: sum(12..18),
                evening: sum(18..22),
                night: sum(22..24) + sum(0..6),
            },
        }
    }
}

fn communication_habits(conversations: &[Conversation]) -> CommunicationHabits {
    if conversations.is_empty() {
        return CommunicationHabits::default();
    }
    let total = conversations.len();
    let mut words = 0usize;
    let mut questions = 0usize;
    let mut urgent = 0usize;
    for c in conversations {
        words += c.message.split_whitespace().count();
        if c.message.contains('?') {
            questions += 1;
        }
        if matches!(c.urgency, Some(Urgency::High | Urgency::Critical))
            || mentions_any(&c.message, &["urgente", "urgent"])
        {
            urgent += 1;
        }
    }
    let density = if words > 500 {
        "detailed"
    } else if words > 200 {
        "moderate"
    } else {
        "concise"
    };
    CommunicationHabits {
        average_words: (words as f32 / total as f32).round() as u32,
        question_rate: ratio(questions, total),
        urgency_rate: ratio(urgent, total),
        density: density.to_string(),
    }
}

fn task_preferences(tasks: &[Task]) -> TaskPreferences {
    let mut distribution: BTreeMap<String, u32> = BTreeMap::new();
    let mut categories: HashMap<&str, u32> = HashMap::new();
    for t in tasks {
        *distribution.entry(t.priority.as_str().to_string()).or_insert(0) += 1;
        if let Some(category) = &t.category {
            *categories.entry(category.as_str()).or_insert(0) += 1;
        }
    }
    let high = tasks.iter().filter(|t| t.priority.is_high()).count();
    let low = tasks.iter().filter(|t| t.priority == Priority::Low).count();

    let mut ranked: Vec<(&str, u32)> = categories.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    TaskPreferences {
        priority_distribution: distribution,
        preferred_categories: ranked.iter().take(5).map(|(c, _)| c.to_string()).collect(),
        urgency_tendency: if high > low { "high-urgency" } else { "planned" }.to_string(),
    }
}

fn completion_habits(tasks: &[Task]) -> CompletionHabits {
    let completed = tasks.iter().filter(|t| t.completed_at.is_some()).count();
    let hours: Vec<f64> = tasks.iter().filter_map(|t| t.completion_hours()).collect();
    CompletionHabits {
        total: tasks.len() as u32,
        completed: completed as u32,
        completion_rate: ratio(completed, tasks.len()),
        average_hours: (!hours.is_empty())
            .then(|| (hours.iter().sum::<f64>() / hours.len() as f64) as f32),
    }
}

fn planning_habits(tasks: &[Task]) -> PlanningHabits {
    let with_due = ratio(tasks.iter().filter(|t| t.due_date.is_some()).count(), tasks.len());
    let with_project = ratio(tasks.iter().filter(|t| t.project_id.is_some()).count(), tasks.len());
    let style = if tasks.is_empty() {
        "unknown"
    } else if with_due > 0.6 {
        "structured"
    } else if with_due > 0.3 {
        "flexible"
    } else {
        "spontaneous"
    };
    PlanningHabits {
        with_due_date_rate: with_due,
        with_project_rate: with_project,
        style: style.to_string(),
    }
}

fn rank_contacts(history: &History, conversations: &[Conversation]) -> Vec<ContactRanking> {
    let messages: Vec<String> = conversations.iter().map(|c| c.message.to_lowercase()).collect();
    let mut ranked: Vec<ContactRanking> = history
        .contacts
        .iter()
        .filter_map(|contact| {
            let name = contact.name.to_lowercase();
            let email = contact.email.as_ref().map(|e| e.to_lowercase());
            let mentions = messages
                .iter()
                .filter(|m| {
                    m.contains(&name) || email.as_ref().map(|e| m.contains(e)).unwrap_or(false)
                })
                .count() as u32;
            (mentions > 0).then(|| ContactRanking {
                contact_id: contact.id.clone(),
                name: contact.name.clone(),
                mentions,
                importance: if mentions > 10 {
                    Importance::High
                } else if mentions > 5 {
                    Importance::Medium
                } else {
                    Importance::Low
                },
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.mentions.cmp(&a.mentions).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(10);
    ranked
}

fn project_teams(history: &History) -> Vec<ProjectTeam> {
    history
        .projects
        .iter()
        .filter(|p| !p.archived && !p.stakeholders.is_empty())
        .map(|p| ProjectTeam {
            project: p.name.clone(),
            members: p
                .stakeholders
                .iter()
                .map(|s| {
                    history
                        .contacts
                        .iter()
                        .find(|c| &c.id == s)
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| s.clone())
                })
                .collect(),
        })
        .collect()
}

fn goals(history: &History, conversations: &[Conversation], now: i64) -> Goals {
    let horizon = now + 14 * DAY_SECS;
    let short_term = history
        .tasks
        .iter()
        .filter(|t| t.status.is_open() && !t.archived)
        .filter(|t| t.due_date.map(|d| d <= horizon).unwrap_or(false) || t.priority.is_high())
        .take(5)
        .map(|t| t.title.clone())
        .collect();
    let long_term = history
        .projects
        .iter()
        .filter(|p| p.status.is_active() && !p.archived)
        .take(5)
        .map(|p| p.name.clone())
        .collect();
    let learning = user_messages(conversations)
        .filter(|c| mentions_any(&c.message, LEARNING_MARKERS))
        .take(5)
        .map(|c| truncate_chars(&c.message, 80))
        .collect();
    Goals {
        short_term,
        long_term,
        learning,
    }
}

fn communication_style(conversations: &[Conversation]) -> CommunicationStyle {
    let messages: Vec<&Conversation> = user_messages(conversations).collect();
    if messages.is_empty() {
        return CommunicationStyle::default();
    }
    let formal = messages.iter().filter(|c| mentions_any(&c.message, FORMAL_MARKERS)).count();
    let casual = messages.iter().filter(|c| mentions_any(&c.message, CASUAL_MARKERS)).count();
    let words: usize = messages.iter().map(|c| c.message.split_whitespace().count()).sum();
    let average = words as f32 / messages.len() as f32;
    let questions = ratio(messages.iter().filter(|c| c.message.contains('?')).count(), messages.len());

    CommunicationStyle {
        formality_level: if formal > casual * 2 {
            "formal"
        } else if casual > formal {
            "casual"
        } else {
            "professional"
        }
        .to_string(),
        response_length: if average > 50.0 {
            "detailed"
        } else if average > 15.0 {
            "moderate"
        } else {
            "brief"
        }
        .to_string(),
        questioning_style: if questions > 0.5 {
            "inquisitive"
        } else if questions > 0.2 {
            "balanced"
        } else {
            "directive"
        }
        .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contact, ExtractionSettings, TaskStatus};
    use crate::store::memory::MemoryStore;
    use crate::store::StoreSource;
    use crate::utils::clock::ManualClock;

    // 2024-01-15 10:00:00 UTC, a Monday
    const NOW: i64 = 1_705_312_800;
    const HOUR: i64 = 3600;

    fn builder(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> ProfileBuilder {
        let extractor = Arc::new(EntityExtractor::new(&ExtractionSettings::default()).unwrap());
        ProfileBuilder::new(
            Stores::from_shared(store),
            extractor,
            HistorySettings::default(),
            3600,
            64,
            Tz::UTC,
            clock,
        )
    }

    fn conversation(i: usize, ts: i64, message: &str) -> Conversation {
        Conversation {
            id: format!("m{}", i),
            user_id: "u1".into(),
            role: Role::User,
            message: message.into(),
            intent: None,
            urgency: None,
            timestamp: ts,
        }
    }

    fn task(i: usize, priority: Priority, completed_at: Option<i64>) -> Task {
        Task {
            id: format!("t{}", i),
            user_id: "u1".into(),
            title: format!("Task {}", i),
            description: String::new(),
            status: if completed_at.is_some() { TaskStatus::Completed } else { TaskStatus::Pending },
            priority,
            category: Some("ops".into()),
            project_id: None,
            due_date: None,
            progress: 0,
            related_contacts: vec![],
            last_activity: 0,
            created_at: NOW - 48 * HOUR + i as i64,
            completed_at,
            archived: false,
            source: "manual".into(),
            original_text: None,
        }
    }

    fn seeded() -> (Arc<MemoryStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_timestamp(NOW));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        // 9:00 UTC three times, 15:00 UTC twice
        for i in 0..3 {
            store.insert_conversation(conversation(i, NOW - HOUR - i as i64 * 24 * HOUR, "Revisar el budget con Ana Gómez?"));
        }
        for i in 3..5 {
            store.insert_conversation(conversation(i, NOW + 5 * HOUR - i as i64 * 24 * HOUR, "hey, meeting ok"));
        }
        store.insert_task(task(1, Priority::High, Some(NOW - 3 * HOUR)));
        store.insert_task(task(2, Priority::High, None));
        store.insert_task(task(3, Priority::Low, None));
        store.insert_contact(Contact {
            id: "c1".into(),
            user_id: "u1".into(),
            name: "Ana Gómez".into(),
            email: None,
            phone: None,
            company: None,
            relationship: "professional".into(),
            importance: Importance::Medium,
            last_contact: None,
            preferred_contact: "email".into(),
            source: "manual".into(),
            created_at: 0,
        });
        (store, clock)
    }

    #[tokio::test]
    async fn test_profile_dimensions_from_history() {
        let (store, clock) = seeded();
        let profile = builder(store, clock).build("u1").await;

        assert_eq!(profile.data_points, 8);
        assert!(!profile.is_fallback());
        assert_eq!(profile.preferences.working_hours.typical_hours, vec![9, 15]);
        assert_eq!(profile.preferences.task_preferences.urgency_tendency, "high-urgency");
        assert_eq!(profile.preferences.task_preferences.preferred_categories, vec!["ops"]);
        assert_eq!(profile.preferences.communication.density, "concise");
        // 9:00 has 3 conversations, 7:00 one completed task (weight 2), 15:00 two
        assert_eq!(profile.habits.productivity_peaks.peak_hours, vec![9]);
        assert_eq!(profile.habits.task_completion.completed, 1);
        assert_eq!(profile.relationships.contact_importance[0].name, "Ana Gómez");
        assert_eq!(profile.relationships.contact_importance[0].mentions, 3);
        assert_eq!(profile.relationships.contact_importance[0].importance, Importance::Low);
        assert_eq!(profile.working_patterns.peak_hours, vec![9]);
        assert_eq!(profile.working_patterns.energy_levels.afternoon, 2);
        assert!(profile
            .preferences
            .topic_interests
            .iter()
            .any(|t| t.topic == "budget" && t.mentions == 3));
    }

    #[tokio::test]
    async fn test_profile_is_cached_for_ttl() {
        let (store, clock) = seeded();
        let builder = builder(store.clone(), clock.clone());
        let first = builder.build("u1").await;
        let second = builder.build("u1").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.query_count(StoreSource::Conversations), 1);

        clock.advance(chrono::Duration::seconds(3600));
        builder.build("u1").await;
        assert_eq!(store.query_count(StoreSource::Conversations), 2);
    }

    #[tokio::test]
    async fn test_store_failure_yields_uncached_fallback() {
        let (store, clock) = seeded();
        store.set_unavailable(StoreSource::Tasks, true);
        let builder = builder(store.clone(), clock);
        let profile = builder.build("u1").await;
        assert!(profile.is_fallback());
        assert_eq!(profile.working_patterns.peak_hours, vec![9, 10, 15]);

        store.set_unavailable(StoreSource::Tasks, false);
        assert!(!builder.build("u1").await.is_fallback());
    }

    #[test]
    fn test_empty_history_keeps_defaults() {
        let (store, clock) = seeded();
        let profile = builder(store, clock).profile_from("u9", &History::default(), NOW);
        assert_eq!(profile.preferences.working_hours, WorkingHours::default());
        assert_eq!(profile.habits.productivity_peaks, ProductivityPeaks::default());
        assert_eq!(profile.communication_style, CommunicationStyle::default());
        assert!(profile.is_fallback());
    }
}
