use std::sync::Arc;

use chrono_tz::Tz;

use crate::models::{
    Analysis, CompactContext, CompactionSettings, ContactSummary, ContextSnapshot,
    ConversationSummary, NoteSummary, ProjectSummary, TaskSummary, TimeContext, TimeOfDay,
};
use crate::utils::clock::Clock;
use crate::utils::{local_datetime, local_hour, local_weekday, truncate_chars};

/// Heuristic match quality of a snapshot against the message's entities.
/// Always within [0.1, 1.0].
pub fn relevance_score(snapshot: &ContextSnapshot, analysis: &Analysis) -> f32 {
    let entities = &analysis.entities;
    let mut score: f32 = 0.0;
    if entities.has_contacts() && !snapshot.contacts.is_empty() {
        score += 0.3;
    }
    if entities.has_tasks() && !snapshot.tasks.is_empty() {
        score += 0.3;
    }
    if entities.has_keywords() && !snapshot.notes.is_empty() {
        score += 0.2;
    }
    if !snapshot.recent_conversations.is_empty() {
        score += 0.2;
    }
    if score == 0.0 {
        0.1
    } else {
        score.min(1.0)
    }
}

pub fn time_context(now: i64, tz: Tz) -> TimeContext {
    let hour = local_hour(now, tz);
    let weekday = local_weekday(now, tz);
    let (time_of_day, greeting) = if hour < 12 {
        (TimeOfDay::Morning, "Good morning")
    } else if hour < 17 {
        (TimeOfDay::Afternoon, "Good afternoon")
    } else {
        (TimeOfDay::Evening, "Good evening")
    };
    let is_weekend = weekday == 0 || weekday == 6;

    TimeContext {
        current_time: local_datetime(now, tz).to_rfc3339(),
        timezone: tz.name().to_string(),
        hour,
        weekday,
        time_of_day,
        greeting: greeting.to_string(),
        is_weekend,
        is_working_hours: !is_weekend && (9..17).contains(&hour),
    }
}

/// Second-stage reduction of a loaded snapshot into prompt-sized summaries.
pub struct ContextCompactor {
    settings: CompactionSettings,
    timezone: Tz,
    clock: Arc<dyn Clock>,
}

impl ContextCompactor {
    pub fn new(settings: CompactionSettings, timezone: Tz, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            timezone,
            clock,
        }
    }

    pub fn compact(&self, snapshot: &ContextSnapshot, analysis: &Analysis) -> CompactContext {
        let now = self.clock.timestamp();
        let s = &self.settings;

        let relevant_contacts = snapshot
            .contacts
            .iter()
            .take(s.max_contacts)
            .map(|c| ContactSummary {
                name: c.name.clone(),
                company: c.company.clone(),
                relationship: c.relationship.clone(),
                importance: c.importance,
                last_contact: c.last_contact,
                preferred_contact: c.preferred_contact.clone(),
            })
            .collect();

        let active_tasks = snapshot
            .tasks
            .iter()
            .take(s.max_tasks)
            .map(|t| TaskSummary {
                title: t.title.clone(),
                status: t.status,
                priority: t.priority,
                due_date: t.due_date,
                project: t.project_id.as_ref().and_then(|id| {
                    snapshot.project_names.get(id).cloned().or_else(|| {
                        snapshot
                            .projects
                            .iter()
                            .find(|p| &p.id == id)
                            .map(|p| p.name.clone())
                    })
                }),
                progress: t.progress,
                is_overdue: t.is_overdue(now),
            })
            .collect();

        let current_projects = snapshot
            .projects
            .iter()
            .take(s.max_projects)
            .map(|p| ProjectSummary {
                name: p.name.clone(),
                status: p.status,
                priority: p.priority,
                progress: p.progress,
                target_date: p.target_date,
                health: p.health(now),
            })
            .collect();

        let key_notes = snapshot
            .notes
            .iter()
            .take(s.max_notes)
            .map(|n| NoteSummary {
                title: n.title.clone(),
                note_type: n.note_type.clone(),
                tags: n.tags.clone(),
                key_topics: n.key_topics.clone(),
                last_modified: n.last_modified,
            })
            .collect();

        let recent_context = snapshot
            .recent_conversations
            .iter()
            .take(s.max_conversations)
            .map(|c| ConversationSummary {
                message: truncate_chars(&c.message, s.message_preview_chars),
                intent: c.intent,
                timestamp: c.timestamp,
            })
            .collect();

        CompactContext {
            intent: analysis.intent,
            urgency: analysis.urgency,
            relevant_contacts,
            active_tasks,
            current_projects,
            key_notes,
            recent_context,
            relevance_score: relevance_score(snapshot, analysis),
            time_context: Some(time_context(now, self.timezone)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Contact, Conversation, Importance, Intent, Note, Priority, Project, ProjectHealth,
        ProjectStatus, Role, Task, TaskStatus,
    };
    use crate::utils::clock::ManualClock;

    // 2024-01-15 10:00:00 UTC, a Monday
    const NOW: i64 = 1_705_312_800;

    fn contact(i: usize) -> Contact {
        Contact {
            id: format!("c{}", i),
            user_id: "u1".into(),
            name: format!("Contact {}", i),
            email: None,
            phone: None,
            company: Some("Acme".into()),
            relationship: "professional".into(),
            importance: Importance::Medium,
            last_contact: None,
            preferred_contact: "email".into(),
            source: "manual".into(),
            created_at: 0,
        }
    }

    fn task(i: usize, project_id: Option<&str>, due: Option<i64>) -> Task {
        Task {
            id: format!("t{}", i),
            user_id: "u1".into(),
            title: format!("Task {}", i),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            category: None,
            project_id: project_id.map(String::from),
            due_date: due,
            progress: 0,
            related_contacts: vec![],
            last_activity: 0,
            created_at: 0,
            completed_at: None,
            archived: false,
            source: "manual".into(),
            original_text: None,
        }
    }

    fn project() -> Project {
        Project {
            id: "p1".into(),
            user_id: "u1".into(),
            name: "Phoenix".into(),
            description: String::new(),
            status: ProjectStatus::InProgress,
            priority: Priority::High,
            progress: 90,
            start_date: 0,
            target_date: None,
            risk_level: Importance::Low,
            stakeholders: vec![],
            created_at: 0,
            archived: false,
            source: "manual".into(),
        }
    }

    fn conversation(message: &str) -> Conversation {
        Conversation {
            id: "m1".into(),
            user_id: "u1".into(),
            role: Role::User,
            message: message.into(),
            intent: Some(Intent::Question),
            urgency: None,
            timestamp: NOW - 60,
        }
    }

    fn compactor(tz: Tz) -> ContextCompactor {
        ContextCompactor::new(
            CompactionSettings::default(),
            tz,
            Arc::new(ManualClock::at_timestamp(NOW)),
        )
    }

    #[test]
    fn test_truncates_to_compaction_caps() {
        let snapshot = ContextSnapshot {
            contacts: (0..10).map(contact).collect(),
            tasks: (0..15).map(|i| task(i, None, None)).collect(),
            recent_conversations: (0..5).map(|_| conversation("hi")).collect(),
            ..Default::default()
        };
        let compact = compactor(Tz::UTC).compact(&snapshot, &Analysis::default());
        assert_eq!(compact.relevant_contacts.len(), 5);
        assert_eq!(compact.active_tasks.len(), 8);
        assert_eq!(compact.recent_context.len(), 3);
    }

    #[test]
    fn test_projection_fields() {
        let long = "é".repeat(150);
        let snapshot = ContextSnapshot {
            tasks: vec![task(1, Some("p1"), Some(NOW - 10)), task(2, Some("missing"), None)],
            projects: vec![project()],
            notes: vec![Note {
                id: "n1".into(),
                user_id: "u1".into(),
                title: "Budget".into(),
                content: "long body".into(),
                note_type: "meeting".into(),
                tags: vec!["budget".into()],
                key_topics: vec![],
                pinned: true,
                last_modified: 5,
                archived: false,
            }],
            recent_conversations: vec![conversation(&long)],
            ..Default::default()
        };
        let compact = compactor(Tz::UTC).compact(&snapshot, &Analysis::default());

        assert_eq!(compact.active_tasks[0].project.as_deref(), Some("Phoenix"));
        assert!(compact.active_tasks[0].is_overdue);
        assert_eq!(compact.active_tasks[1].project, None);
        assert_eq!(compact.current_projects[0].health, ProjectHealth::Healthy);
        assert_eq!(compact.key_notes[0].note_type, "meeting");
        assert_eq!(compact.recent_context[0].message.chars().count(), 100);
    }

    #[test]
    fn test_task_project_resolved_outside_current_projects() {
        let mut snapshot = ContextSnapshot {
            tasks: vec![task(1, Some("p-hold"), None)],
            projects: vec![project()],
            ..Default::default()
        };
        snapshot.project_names.insert("p-hold".into(), "Atlas".into());
        let compact = compactor(Tz::UTC).compact(&snapshot, &Analysis::default());
        assert_eq!(compact.active_tasks[0].project.as_deref(), Some("Atlas"));
        assert_eq!(compact.current_projects.len(), 1);
    }

    #[test]
    fn test_relevance_floor_and_cap() {
        let empty = ContextSnapshot::default();
        assert_eq!(relevance_score(&empty, &Analysis::default()), 0.1);

        let mut analysis = Analysis::default();
        analysis.entities.contacts.names.push("Contact 1".into());
        analysis.entities.tasks.actions.push("call".into());
        analysis.entities.keywords.business.push("budget".into());
        let full = ContextSnapshot {
            contacts: vec![contact(1)],
            tasks: vec![task(1, None, None)],
            notes: vec![Note {
                id: "n".into(),
                user_id: "u1".into(),
                title: "budget".into(),
                content: String::new(),
                note_type: "general".into(),
                tags: vec![],
                key_topics: vec![],
                pinned: false,
                last_modified: 0,
                archived: false,
            }],
            recent_conversations: vec![conversation("hello")],
            ..Default::default()
        };
        let score = relevance_score(&full, &analysis);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_contacts_without_requested_names_do_not_score() {
        let snapshot = ContextSnapshot {
            contacts: vec![contact(1)],
            ..Default::default()
        };
        assert_eq!(relevance_score(&snapshot, &Analysis::default()), 0.1);
    }

    #[test]
    fn test_time_context_uses_timezone() {
        let utc = time_context(NOW, Tz::UTC);
        assert_eq!(utc.hour, 10);
        assert_eq!(utc.time_of_day, TimeOfDay::Morning);
        assert_eq!(utc.greeting, "Good morning");
        assert!(utc.is_working_hours);
        assert_eq!(utc.weekday, 1);

        let tokyo = time_context(NOW, Tz::Asia__Tokyo);
        assert_eq!(tokyo.hour, 19);
        assert_eq!(tokyo.time_of_day, TimeOfDay::Evening);
        assert!(!tokyo.is_working_hours);
    }
}
