//! Read/write contracts for the CRM collections the engine consumes.
//!
//! Each query type carries its own filter and implies its sort order, so a
//! store only has to honour the predicates documented on the struct.

pub mod memory;

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{
    Contact, Conversation, Importance, NewContact, NewConversation, NewNote, NewProject,
    NewTask, Note, Project, ProjectStatus, Role, Task, TaskStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreSource {
    Contacts,
    Tasks,
    Projects,
    Notes,
    Conversations,
}

impl StoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreSource::Contacts => "contacts",
            StoreSource::Tasks => "tasks",
            StoreSource::Projects => "projects",
            StoreSource::Notes => "notes",
            StoreSource::Conversations => "conversations",
        }
    }
}

impl std::fmt::Display for StoreSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contacts matching ANY of the set criteria. With no criteria set, every
/// contact of the user matches. Sorted importance desc, last contact desc.
#[derive(Debug, Clone, Default)]
pub struct ContactQuery {
    pub names: Vec<String>,
    /// Exact importance level, not a lower bound.
    pub importance: Option<Importance>,
    pub contacted_since: Option<i64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskOrder {
    /// priority desc, due date asc (undated last), last activity desc
    #[default]
    Relevance,
    /// created_at desc
    Newest,
}

#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub statuses: Option<Vec<TaskStatus>>,
    pub include_archived: bool,
    pub created_since: Option<i64>,
    pub order: TaskOrder,
    pub limit: Option<usize>,
}

/// Sorted priority desc, target date asc (undated last).
#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    /// Restrict to these project ids.
    pub ids: Option<Vec<String>>,
    pub statuses: Option<Vec<ProjectStatus>>,
    pub include_archived: bool,
    pub limit: Option<usize>,
}

/// Non-archived notes whose tags, title or key topics overlap `terms`
/// (case-insensitive). Sorted pinned first, then last modified desc.
#[derive(Debug, Clone, Default)]
pub struct NoteQuery {
    pub terms: Vec<String>,
    pub limit: Option<usize>,
}

/// Most recent first.
#[derive(Debug, Clone, Default)]
pub struct ConversationQuery {
    pub roles: Option<Vec<Role>>,
    pub since: Option<i64>,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn find(&self, user_id: &str, query: &ContactQuery) -> StoreResult<Vec<Contact>>;
    /// Case-insensitive exact name lookup.
    async fn find_by_name(&self, user_id: &str, name: &str) -> StoreResult<Option<Contact>>;
    async fn create(&self, user_id: &str, contact: NewContact) -> StoreResult<Contact>;
    async fn update(&self, contact: &Contact) -> StoreResult<()>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find(&self, user_id: &str, query: &TaskQuery) -> StoreResult<Vec<Task>>;
    async fn create(&self, user_id: &str, task: NewTask) -> StoreResult<Task>;
    async fn update(&self, task: &Task) -> StoreResult<()>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find(&self, user_id: &str, query: &ProjectQuery) -> StoreResult<Vec<Project>>;
    async fn find_by_name(&self, user_id: &str, name: &str) -> StoreResult<Option<Project>>;
    async fn create(&self, user_id: &str, project: NewProject) -> StoreResult<Project>;
    async fn update(&self, project: &Project) -> StoreResult<()>;
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn find(&self, user_id: &str, query: &NoteQuery) -> StoreResult<Vec<Note>>;
    async fn create(&self, user_id: &str, note: NewNote) -> StoreResult<Note>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find(&self, user_id: &str, query: &ConversationQuery)
        -> StoreResult<Vec<Conversation>>;
    async fn create(&self, user_id: &str, conversation: NewConversation)
        -> StoreResult<Conversation>;
}

/// The five collaborators the engine talks to.
#[derive(Clone)]
pub struct Stores {
    pub contacts: Arc<dyn ContactStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub notes: Arc<dyn NoteStore>,
    pub conversations: Arc<dyn ConversationStore>,
}

impl Stores {
    /// Use one backend for every collection.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: ContactStore + TaskStore + ProjectStore + NoteStore + ConversationStore + 'static,
    {
        Self {
            contacts: store.clone(),
            tasks: store.clone(),
            projects: store.clone(),
            notes: store.clone(),
            conversations: store,
        }
    }
}

pub(crate) fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Descending on a value, with `None` after every `Some`.
fn desc_none_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn asc_none_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub(crate) fn contact_matches(contact: &Contact, query: &ContactQuery) -> bool {
    let no_criteria =
        query.names.is_empty() && query.importance.is_none() && query.contacted_since.is_none();
    if no_criteria {
        return true;
    }
    let key = name_key(&contact.name);
    query.names.iter().any(|n| name_key(n) == key)
        || query.importance.map(|level| contact.importance == level).unwrap_or(false)
        || match (query.contacted_since, contact.last_contact) {
            (Some(since), Some(last)) => last >= since,
            _ => false,
        }
}

pub(crate) fn contact_order(a: &Contact, b: &Contact) -> Ordering {
    b.importance
        .cmp(&a.importance)
        .then_with(|| desc_none_last(&a.last_contact, &b.last_contact))
}

pub(crate) fn task_matches(task: &Task, query: &TaskQuery) -> bool {
    if task.archived && !query.include_archived {
        return false;
    }
    if let Some(statuses) = &query.statuses {
        if !statuses.contains(&task.status) {
            return false;
        }
    }
    if let Some(since) = query.created_since {
        if task.created_at < since {
            return false;
        }
    }
    true
}

pub(crate) fn task_order(order: TaskOrder) -> impl Fn(&Task, &Task) -> Ordering {
    move |a: &Task, b: &Task| match order {
        TaskOrder::Relevance => b
            .priority
            .cmp(&a.priority)
            .then_with(|| asc_none_last(&a.due_date, &b.due_date))
            .then_with(|| b.last_activity.cmp(&a.last_activity)),
        TaskOrder::Newest => b.created_at.cmp(&a.created_at),
    }
}

pub(crate) fn project_matches(project: &Project, query: &ProjectQuery) -> bool {
    if project.archived && !query.include_archived {
        return false;
    }
    if let Some(ids) = &query.ids {
        if !ids.contains(&project.id) {
            return false;
        }
    }
    match &query.statuses {
        Some(statuses) => statuses.contains(&project.status),
        None => true,
    }
}

pub(crate) fn project_order(a: &Project, b: &Project) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| asc_none_last(&a.target_date, &b.target_date))
}

pub(crate) fn note_matches(note: &Note, query: &NoteQuery) -> bool {
    if note.archived || query.terms.is_empty() {
        return false;
    }
    let title = note.title.to_lowercase();
    query.terms.iter().map(|t| t.to_lowercase()).any(|term| {
        title.contains(&term)
            || note.tags.iter().any(|tag| tag.to_lowercase() == term)
            || note.key_topics.iter().any(|topic| topic.to_lowercase() == term)
    })
}

pub(crate) fn note_order(a: &Note, b: &Note) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| b.last_modified.cmp(&a.last_modified))
}

pub(crate) fn conversation_matches(conv: &Conversation, query: &ConversationQuery) -> bool {
    if let Some(roles) = &query.roles {
        if !roles.contains(&conv.role) {
            return false;
        }
    }
    query.since.map(|since| conv.timestamp >= since).unwrap_or(true)
}

pub(crate) fn apply_limit<T>(items: &mut Vec<T>, limit: Option<usize>) {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, importance: Importance, last: Option<i64>) -> Contact {
        Contact {
            id: name.to_string(),
            user_id: "u1".into(),
            name: name.into(),
            email: None,
            phone: None,
            company: None,
            relationship: "professional".into(),
            importance,
            last_contact: last,
            preferred_contact: "email".into(),
            source: "manual".into(),
            created_at: 0,
        }
    }

    #[test]
    fn test_contact_query_is_a_disjunction() {
        let query = ContactQuery {
            names: vec!["ana gómez".into()],
            importance: Some(Importance::High),
            contacted_since: Some(100),
            limit: None,
        };
        assert!(contact_matches(&contact("Ana Gómez", Importance::Low, None), &query));
        assert!(contact_matches(&contact("Lead", Importance::High, None), &query));
        assert!(contact_matches(&contact("Recent", Importance::Low, Some(150)), &query));
        assert!(!contact_matches(&contact("Stale", Importance::Low, Some(50)), &query));
    }

    #[test]
    fn test_importance_filter_is_exact() {
        let query = ContactQuery {
            importance: Some(Importance::High),
            ..Default::default()
        };
        assert!(contact_matches(&contact("Lead", Importance::High, None), &query));
        assert!(!contact_matches(&contact("Boss", Importance::Critical, None), &query));
        assert!(!contact_matches(&contact("Peer", Importance::Medium, None), &query));
    }

    #[test]
    fn test_project_id_filter() {
        let project = Project {
            id: "p1".into(),
            user_id: "u1".into(),
            name: "Phoenix".into(),
            description: String::new(),
            status: ProjectStatus::OnHold,
            priority: crate::models::Priority::Medium,
            progress: 0,
            start_date: 0,
            target_date: None,
            risk_level: Importance::Low,
            stakeholders: vec![],
            created_at: 0,
            archived: true,
            source: "manual".into(),
        };
        let by_id = |ids: &[&str]| ProjectQuery {
            ids: Some(ids.iter().map(|s| s.to_string()).collect()),
            include_archived: true,
            ..Default::default()
        };
        assert!(project_matches(&project, &by_id(&["p0", "p1"])));
        assert!(!project_matches(&project, &by_id(&["p2"])));
        assert!(!project_matches(&project, &ProjectQuery { ids: Some(vec!["p1".into()]), ..Default::default() }));
    }

    #[test]
    fn test_contact_order_puts_undated_last_within_importance() {
        let mut list = vec![
            contact("a", Importance::Medium, None),
            contact("b", Importance::Medium, Some(10)),
            contact("c", Importance::High, Some(1)),
        ];
        list.sort_by(contact_order);
        let names: Vec<_> = list.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }
}
