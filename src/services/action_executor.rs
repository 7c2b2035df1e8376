use std::collections::HashMap;
use std::sync::Arc;

use chrono_tz::Tz;

use crate::error::StoreResult;
use crate::models::{
    ActionKind, ActionRecord, ActionSettings, Contact, EntitySet, Importance, NewContact,
    NewProject, NewTask, Priority, ProjectStatus, Task, DAY_SECS,
};
use crate::store::{name_key, Stores};
use crate::utils::clock::Clock;
use crate::utils::local_weekday;

const SOURCE: &str = "conversation";

/// Resolve a relative date or day name to a timestamp, keeping the time of
/// day of `now`. Only a fixed vocabulary is understood.
pub fn resolve_due_date(phrase: &str, now: i64, tz: Tz) -> Option<i64> {
    let lower = phrase.trim().to_lowercase();
    let days = if lower.contains("pasado mañana") {
        2
    } else if lower.contains("tomorrow") || lower.contains("mañana") {
        1
    } else if lower.contains("today") || lower.contains("hoy") {
        0
    } else if lower.contains("next week") || lower.contains("próxima semana") {
        7
    } else if lower.contains("friday") || lower.contains("viernes") {
        // Sunday = 0, Friday = 5; already past means next week's
        let today = local_weekday(now, tz) as i64;
        (5 - today).rem_euclid(7)
    } else {
        return None;
    };
    Some(now + days * DAY_SECS)
}

/// Email that plausibly belongs to `name`.
fn email_for(name: &str, entities: &EntitySet) -> Option<String> {
    let emails = &entities.contacts.emails;
    if emails.len() == 1 && entities.contacts.names.len() == 1 {
        return emails.first().cloned();
    }
    let tokens: Vec<String> = name
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() >= 3)
        .collect();
    emails
        .iter()
        .find(|email| {
            let local = email.split('@').next().unwrap_or("").to_lowercase();
            tokens.iter().any(|t| local.contains(t.as_str()))
        })
        .cloned()
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Turns extracted entities into CRM records.
///
/// Lookups are case-insensitive and deduplicated within one call only; two
/// separate calls naming a new person may both create them.
pub struct ActionExecutor {
    stores: Stores,
    settings: ActionSettings,
    timezone: Tz,
    clock: Arc<dyn Clock>,
}

impl ActionExecutor {
    pub fn new(stores: Stores, settings: ActionSettings, timezone: Tz, clock: Arc<dyn Clock>) -> Self {
        Self {
            stores,
            settings,
            timezone,
            clock,
        }
    }

    pub async fn execute(&self, entities: &EntitySet, user_id: &str, raw_text: &str) -> Vec<ActionRecord> {
        if !self.settings.enabled {
            return Vec::new();
        }
        let now = self.clock.timestamp();
        let mut records = Vec::new();

        let created_contacts = self.contacts(entities, user_id, now, &mut records).await;
        let mut created_tasks = self.tasks(entities, user_id, raw_text, now, &mut records).await;
        self.projects(entities, user_id, now, &mut records).await;
        self.link(&mut created_tasks, &created_contacts, &mut records).await;

        let failures = records.iter().filter(|r| !r.success).count();
        log::info!(
            "[ActionExecutor] {} actions for user {} ({} failed)",
            records.len(),
            user_id,
            failures
        );
        records
    }

    async fn contacts(
        &self,
        entities: &EntitySet,
        user_id: &str,
        now: i64,
        records: &mut Vec<ActionRecord>,
    ) -> Vec<Contact> {
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut created = Vec::new();
        for name in &entities.contacts.names {
            let key = name_key(name);
            if key.is_empty() || seen.contains_key(&key) {
                continue;
            }
            match self.find_or_create_contact(name, entities, user_id, now).await {
                Ok((contact, true)) => {
                    log::info!("[ActionExecutor] created contact {}", contact.name);
                    records.push(ActionRecord::ok(
                        ActionKind::ContactCreated,
                        &contact.id,
                        format!("Created contact: {}", contact.name),
                    ));
                    seen.insert(key, contact.id.clone());
                    created.push(contact);
                }
                Ok((contact, false)) => {
                    records.push(ActionRecord::ok(
                        ActionKind::ContactFound,
                        &contact.id,
                        format!("Found existing contact: {}", contact.name),
                    ));
                    seen.insert(key, contact.id);
                }
                Err(e) => {
                    log::warn!("[ActionExecutor] contact {} failed: {}", name, e);
                    records.push(ActionRecord::error(format!("Contact {}: {}", name, e)));
                }
            }
        }
        created
    }

    async fn find_or_create_contact(
        &self,
        name: &str,
        entities: &EntitySet,
        user_id: &str,
        now: i64,
    ) -> StoreResult<(Contact, bool)> {
        if let Some(existing) = self.stores.contacts.find_by_name(user_id, name).await? {
            return Ok((existing, false));
        }
        let new = NewContact {
            email: email_for(name, entities),
            company: entities.contacts.companies.first().cloned(),
            importance: Importance::Medium,
            last_contact: Some(now),
            source: SOURCE.to_string(),
            ..NewContact::named(name.trim())
        };
        let contact = self.stores.contacts.create(user_id, new).await?;
        Ok((contact, true))
    }

    async fn tasks(
        &self,
        entities: &EntitySet,
        user_id: &str,
        raw_text: &str,
        now: i64,
        records: &mut Vec<ActionRecord>,
    ) -> Vec<Task> {
        let mut created = Vec::new();
        if entities.tasks.actions.is_empty() {
            return created;
        }

        let priority = if entities.tasks.urgency_indicators.is_empty() {
            Priority::Medium
        } else {
            Priority::High
        };
        let project_id = match entities.projects.names.first() {
            Some(name) => match self.stores.projects.find_by_name(user_id, name).await {
                Ok(found) => found.map(|p| p.id),
                Err(e) => {
                    log::warn!("[ActionExecutor] project lookup for {} failed: {}", name, e);
                    None
                }
            },
            None => None,
        };
        let due_date = entities
            .dates
            .relative
            .first()
            .or_else(|| entities.dates.days.first())
            .and_then(|phrase| resolve_due_date(phrase, now, self.timezone));

        for action in &entities.tasks.actions {
            let new = NewTask {
                description: "Created from conversation".to_string(),
                priority,
                category: Some(SOURCE.to_string()),
                project_id: project_id.clone(),
                due_date,
                source: SOURCE.to_string(),
                original_text: Some(raw_text.to_string()),
                ..NewTask::titled(capitalise(action))
            };
            match self.stores.tasks.create(user_id, new).await {
                Ok(task) => {
                    log::info!("[ActionExecutor] created task {} ({})", task.title, task.priority.as_str());
                    records.push(ActionRecord::ok(
                        ActionKind::TaskCreated,
                        &task.id,
                        format!("Created task: {} ({} priority)", task.title, task.priority.as_str()),
                    ));
                    created.push(task);
                }
                Err(e) => {
                    log::warn!("[ActionExecutor] task {} failed: {}", action, e);
                    records.push(ActionRecord::error(format!("Task {}: {}", action, e)));
                }
            }
        }
        created
    }

    async fn projects(&self, entities: &EntitySet, user_id: &str, now: i64, records: &mut Vec<ActionRecord>) {
        let mut seen = Vec::new();
        for name in &entities.projects.names {
            let key = name_key(name);
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);

            let record = match self.stores.projects.find_by_name(user_id, name).await {
                Ok(Some(project)) => ActionRecord::ok(
                    ActionKind::ProjectFound,
                    &project.id,
                    format!("Found existing project: {}", project.name),
                ),
                Ok(None) => {
                    let new = NewProject {
                        name: name.trim().to_string(),
                        description: "Created from conversation".to_string(),
                        status: ProjectStatus::Planning,
                        priority: Priority::Medium,
                        start_date: now,
                        target_date: Some(now + self.settings.default_project_days * DAY_SECS),
                        source: SOURCE.to_string(),
                    };
                    match self.stores.projects.create(user_id, new).await {
                        Ok(project) => {
                            log::info!("[ActionExecutor] created project {}", project.name);
                            ActionRecord::ok(
                                ActionKind::ProjectCreated,
                                &project.id,
                                format!("Created project: {}", project.name),
                            )
                        }
                        Err(e) => {
                            log::warn!("[ActionExecutor] project {} failed: {}", name, e);
                            ActionRecord::error(format!("Project {}: {}", name, e))
                        }
                    }
                }
                Err(e) => {
                    log::warn!("[ActionExecutor] project lookup for {} failed: {}", name, e);
                    ActionRecord::error(format!("Project {}: {}", name, e))
                }
            };
            records.push(record);
        }
    }

    /// Attach every contact created in this call to every task created in it.
    async fn link(&self, tasks: &mut [Task], contacts: &[Contact], records: &mut Vec<ActionRecord>) {
        for task in tasks.iter_mut() {
            for contact in contacts {
                if task.related_contacts.contains(&contact.id) {
                    continue;
                }
                task.related_contacts.push(contact.id.clone());
                match self.stores.tasks.update(task).await {
                    Ok(()) => records.push(ActionRecord::linked(
                        &task.id,
                        &contact.id,
                        format!("Linked task \"{}\" to contact \"{}\"", task.title, contact.name),
                    )),
                    Err(e) => {
                        task.related_contacts.pop();
                        log::warn!("[ActionExecutor] linking {} to {} failed: {}", task.id, contact.id, e);
                        records.push(ActionRecord::error(format!(
                            "Link {} -> {}: {}",
                            task.title, contact.name, e
                        )));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Project;
    use crate::store::memory::MemoryStore;
    use crate::store::StoreSource;
    use crate::utils::clock::ManualClock;

    // 2024-01-15 10:00:00 UTC, a Monday
    const NOW: i64 = 1_705_312_800;

    fn setup() -> (ActionExecutor, Arc<MemoryStore>) {
        let clock = Arc::new(ManualClock::at_timestamp(NOW));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let executor = ActionExecutor::new(
            Stores::from_shared(store.clone()),
            ActionSettings::default(),
            Tz::UTC,
            clock,
        );
        (executor, store)
    }

    fn kinds(records: &[ActionRecord]) -> Vec<ActionKind> {
        records.iter().map(|r| r.kind).collect()
    }

    #[test]
    fn test_resolve_due_date_table() {
        assert_eq!(resolve_due_date("hoy", NOW, Tz::UTC), Some(NOW));
        assert_eq!(resolve_due_date("Tomorrow", NOW, Tz::UTC), Some(NOW + DAY_SECS));
        assert_eq!(resolve_due_date("pasado mañana", NOW, Tz::UTC), Some(NOW + 2 * DAY_SECS));
        assert_eq!(resolve_due_date("la próxima semana", NOW, Tz::UTC), Some(NOW + 7 * DAY_SECS));
        // Monday -> Friday of the same week
        assert_eq!(resolve_due_date("el viernes", NOW, Tz::UTC), Some(NOW + 4 * DAY_SECS));
        // Saturday -> next Friday
        let saturday = NOW + 5 * DAY_SECS;
        assert_eq!(resolve_due_date("friday", saturday, Tz::UTC), Some(saturday + 6 * DAY_SECS));
        assert_eq!(resolve_due_date("el martes", NOW, Tz::UTC), None);
        assert_eq!(resolve_due_date("someday", NOW, Tz::UTC), None);
    }

    #[test]
    fn test_email_association_is_narrow() {
        let mut entities = EntitySet::default();
        entities.contacts.names = vec!["Ana Gómez".into()];
        entities.contacts.emails = vec!["agomez@acme.com".into()];
        assert_eq!(email_for("Ana Gómez", &entities), Some("agomez@acme.com".into()));

        entities.contacts.names.push("Luis Torres".into());
        entities.contacts.emails.push("luis.t@acme.com".into());
        assert_eq!(email_for("Luis Torres", &entities), Some("luis.t@acme.com".into()));
        // "ana" is not in any local part once there are two names
        assert_eq!(email_for("Ana Pérez", &entities), None);
    }

    #[tokio::test]
    async fn test_creates_contact_task_and_links() {
        let (executor, store) = setup();
        let mut entities = EntitySet::default();
        entities.contacts.names = vec!["Carlos Perez".into()];
        entities.contacts.companies = vec!["Acme".into()];
        entities.tasks.actions = vec!["llamar".into()];
        entities.tasks.urgency_indicators = vec!["urgente".into()];
        entities.dates.relative = vec!["mañana".into()];

        let records = executor.execute(&entities, "u1", "llamar a Carlos Perez mañana").await;
        assert_eq!(
            kinds(&records),
            vec![ActionKind::ContactCreated, ActionKind::TaskCreated, ActionKind::EntitiesLinked]
        );

        let contacts = store.contacts_for("u1");
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].company.as_deref(), Some("Acme"));

        let tasks = store.tasks_for("u1");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Llamar");
        assert_eq!(tasks[0].priority, Priority::High);
        assert_eq!(tasks[0].due_date, Some(NOW + DAY_SECS));
        assert_eq!(tasks[0].related_contacts, vec![contacts[0].id.clone()]);
        assert_eq!(records[2].related_entity_id.as_deref(), Some(contacts[0].id.as_str()));
    }

    #[tokio::test]
    async fn test_existing_records_are_found_not_duplicated() {
        let (executor, store) = setup();
        store.insert_project(Project {
            id: "p1".into(),
            user_id: "u1".into(),
            name: "Apollo".into(),
            description: String::new(),
            status: ProjectStatus::InProgress,
            priority: Priority::High,
            progress: 40,
            start_date: 0,
            target_date: None,
            risk_level: Importance::Low,
            stakeholders: vec![],
            created_at: 0,
            archived: false,
            source: "manual".into(),
        });
        let mut entities = EntitySet::default();
        entities.contacts.names = vec!["ana gómez".into(), "Ana Gómez".into()];
        entities.projects.names = vec!["APOLLO".into(), "Hermes".into()];
        entities.tasks.actions = vec!["revisar".into()];

        let first = executor.execute(&entities, "u1", "").await;
        assert_eq!(
            kinds(&first),
            vec![
                ActionKind::ContactCreated,
                ActionKind::TaskCreated,
                ActionKind::ProjectFound,
                ActionKind::ProjectCreated,
                ActionKind::EntitiesLinked,
            ]
        );
        assert_eq!(store.tasks_for("u1")[0].project_id.as_deref(), Some("p1"));

        let hermes = store.projects_for("u1").into_iter().find(|p| p.name == "Hermes");
        let hermes = hermes.expect("created project");
        assert_eq!(hermes.status, ProjectStatus::Planning);
        assert_eq!(hermes.target_date, Some(NOW + 30 * DAY_SECS));

        entities.tasks.actions.clear();
        let second = executor.execute(&entities, "u1", "").await;
        assert_eq!(
            kinds(&second),
            vec![ActionKind::ContactFound, ActionKind::ProjectFound, ActionKind::ProjectFound]
        );
        assert_eq!(store.contacts_for("u1").len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_becomes_error_record() {
        let (executor, store) = setup();
        store.set_unavailable(StoreSource::Contacts, true);
        let mut entities = EntitySet::default();
        entities.contacts.names = vec!["Ana Gómez".into()];
        entities.tasks.actions = vec!["enviar".into()];

        let records = executor.execute(&entities, "u1", "").await;
        assert_eq!(kinds(&records), vec![ActionKind::Error, ActionKind::TaskCreated]);
        assert!(!records[0].success);
        assert_eq!(store.tasks_for("u1").len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_executor_does_nothing() {
        let (mut executor, store) = setup();
        executor.settings.enabled = false;
        let mut entities = EntitySet::default();
        entities.contacts.names = vec!["Ana Gómez".into()];
        assert!(executor.execute(&entities, "u1", "").await.is_empty());
        assert!(store.contacts_for("u1").is_empty());
    }
}
