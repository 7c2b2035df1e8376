use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Analysis, ContextSnapshot, Importance, LoaderSettings, ProjectStatus, Role, TaskStatus,
    DAY_SECS,
};
use crate::services::cache::TtlCache;
use crate::services::context_compactor::relevance_score;
use crate::store::{
    ContactQuery, ConversationQuery, NoteQuery, ProjectQuery, StoreSource, Stores, TaskOrder,
    TaskQuery,
};
use crate::utils::clock::Clock;
use crate::utils::entity_fingerprint;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub user_id: String,
    pub fingerprint: u64,
}

impl ContextKey {
    pub fn new(user_id: &str, analysis: &Analysis) -> Self {
        Self {
            user_id: user_id.to_string(),
            fingerprint: entity_fingerprint(user_id, &analysis.entities),
        }
    }
}

pub type ContextCache = TtlCache<ContextKey, Arc<ContextSnapshot>>;

async fn bounded<T, F>(source: StoreSource, timeout_ms: u64, fut: F) -> StoreResult<Vec<T>>
where
    F: Future<Output = StoreResult<Vec<T>>>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            source_name: source.as_str(),
            ms: timeout_ms,
        }),
    }
}

/// Unwraps one source's result, turning a failure into an empty list.
fn settle<T>(source: StoreSource, result: StoreResult<Vec<T>>, complete: &mut bool) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!("[ContextLoader] {} source failed, using empty list: {}", source, e);
            *complete = false;
            Vec::new()
        }
    }
}

/// Loads the relevant slice of a user's CRM data for one analysed message.
pub struct ContextLoader {
    stores: Stores,
    cache: Arc<ContextCache>,
    settings: LoaderSettings,
    clock: Arc<dyn Clock>,
}

impl ContextLoader {
    pub fn new(
        stores: Stores,
        cache: Arc<ContextCache>,
        settings: LoaderSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stores,
            cache,
            settings,
            clock,
        }
    }

    pub fn cache(&self) -> &Arc<ContextCache> {
        &self.cache
    }

    /// Drop every cached snapshot belonging to `user_id`.
    pub fn invalidate_user(&self, user_id: &str) -> usize {
        self.cache.invalidate_where(|key| key.user_id == user_id)
    }

    pub async fn load(&self, user_id: &str, analysis: &Analysis) -> Arc<ContextSnapshot> {
        let key = ContextKey::new(user_id, analysis);
        if let Some(snapshot) = self.cache.get(&key) {
            log::debug!("[ContextLoader] cache hit for user {}", user_id);
            return snapshot;
        }

        let s = &self.settings;
        let now = self.clock.timestamp();
        let entities = &analysis.entities;

        let contact_query = ContactQuery {
            names: entities.contacts.names.clone(),
            importance: Some(Importance::High),
            contacted_since: Some(now - s.recent_contact_days * DAY_SECS),
            limit: Some(s.max_contacts),
        };
        let task_query = TaskQuery {
            statuses: analysis
                .intent
                .wants_open_tasks()
                .then(|| vec![TaskStatus::Pending, TaskStatus::InProgress]),
            include_archived: false,
            created_since: None,
            order: TaskOrder::Relevance,
            limit: Some(s.max_tasks),
        };
        let project_query = ProjectQuery {
            ids: None,
            statuses: Some(vec![ProjectStatus::Planning, ProjectStatus::InProgress]),
            include_archived: false,
            limit: Some(s.max_projects),
        };
        let note_query = NoteQuery {
            terms: entities.keywords().cloned().collect(),
            limit: Some(s.max_notes),
        };
        let conversation_query = ConversationQuery {
            roles: Some(vec![Role::User, Role::Assistant]),
            since: None,
            limit: Some(s.max_conversations),
        };

        let ms = s.store_timeout_ms;
        let notes = async {
            if note_query.terms.is_empty() {
                return Ok(Vec::new());
            }
            bounded(StoreSource::Notes, ms, self.stores.notes.find(user_id, &note_query)).await
        };

        let (contacts, tasks, projects, notes, conversations) = tokio::join!(
            bounded(
                StoreSource::Contacts,
                ms,
                self.stores.contacts.find(user_id, &contact_query)
            ),
            bounded(StoreSource::Tasks, ms, self.stores.tasks.find(user_id, &task_query)),
            bounded(
                StoreSource::Projects,
                ms,
                self.stores.projects.find(user_id, &project_query)
            ),
            notes,
            bounded(
                StoreSource::Conversations,
                ms,
                self.stores.conversations.find(user_id, &conversation_query)
            ),
        );

        let mut complete = true;
        let mut snapshot = ContextSnapshot {
            contacts: settle(StoreSource::Contacts, contacts, &mut complete),
            tasks: settle(StoreSource::Tasks, tasks, &mut complete),
            projects: settle(StoreSource::Projects, projects, &mut complete),
            notes: settle(StoreSource::Notes, notes, &mut complete),
            recent_conversations: settle(StoreSource::Conversations, conversations, &mut complete),
            project_names: HashMap::new(),
            relevance_score: 0.0,
        };

        // stores are not trusted to honour the limit
        snapshot.contacts.truncate(s.max_contacts);
        snapshot.tasks.truncate(s.max_tasks);
        snapshot.projects.truncate(s.max_projects);
        snapshot.notes.truncate(s.max_notes);
        snapshot.recent_conversations.truncate(s.max_conversations);
        snapshot.project_names = self.linked_project_names(user_id, &snapshot, &mut complete).await;
        snapshot.relevance_score = relevance_score(&snapshot, analysis);

        log::debug!(
            "[ContextLoader] loaded {} contacts, {} tasks, {} projects, {} notes, {} conversations",
            snapshot.contacts.len(),
            snapshot.tasks.len(),
            snapshot.projects.len(),
            snapshot.notes.len(),
            snapshot.recent_conversations.len()
        );

        let snapshot = Arc::new(snapshot);
        if complete {
            self.cache.put(key, snapshot.clone());
        } else {
            log::warn!("[ContextLoader] partial load for user {}, not caching", user_id);
        }
        snapshot
    }

    /// Resolve the name of every project the loaded tasks link to. Ids not
    /// covered by the loaded projects cost one extra lookup, whatever their
    /// status or archive flag.
    async fn linked_project_names(
        &self,
        user_id: &str,
        snapshot: &ContextSnapshot,
        complete: &mut bool,
    ) -> HashMap<String, String> {
        let mut names: HashMap<String, String> = HashMap::new();
        let mut missing: Vec<String> = Vec::new();
        for id in snapshot.tasks.iter().filter_map(|t| t.project_id.as_ref()) {
            if names.contains_key(id) || missing.contains(id) {
                continue;
            }
            match snapshot.projects.iter().find(|p| &p.id == id) {
                Some(project) => {
                    names.insert(id.clone(), project.name.clone());
                }
                None => missing.push(id.clone()),
            }
        }
        if missing.is_empty() {
            return names;
        }

        let query = ProjectQuery {
            ids: Some(missing),
            statuses: None,
            include_archived: true,
            limit: None,
        };
        let linked = bounded(
            StoreSource::Projects,
            self.settings.store_timeout_ms,
            self.stores.projects.find(user_id, &query),
        )
        .await;
        for project in settle(StoreSource::Projects, linked, complete) {
            names.insert(project.id, project.name);
        }
        names
    }
}
