use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use super::*;
use crate::error::{StoreError, StoreResult};
use crate::utils::clock::{Clock, SystemClock};

#[derive(Default)]
struct Tables {
    contacts: Vec<Contact>,
    tasks: Vec<Task>,
    projects: Vec<Project>,
    notes: Vec<Note>,
    conversations: Vec<Conversation>,
}

/// In-process store implementing every collection.
///
/// Sources can be switched off or slowed down to exercise the engine's
/// degradation paths, and every read is counted per source.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unavailable: Mutex<HashSet<StoreSource>>,
    delays: Mutex<HashMap<StoreSource, Duration>>,
    queries: Mutex<HashMap<StoreSource, usize>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            unavailable: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
            queries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn set_unavailable(&self, source: StoreSource, unavailable: bool) {
        let mut set = self.unavailable.lock();
        if unavailable {
            set.insert(source);
        } else {
            set.remove(&source);
        }
    }

    pub fn set_delay(&self, source: StoreSource, delay: Option<Duration>) {
        let mut delays = self.delays.lock();
        match delay {
            Some(d) => delays.insert(source, d),
            None => delays.remove(&source),
        };
    }

    /// Number of reads issued against `source` so far.
    pub fn query_count(&self, source: StoreSource) -> usize {
        self.queries.lock().get(&source).copied().unwrap_or(0)
    }

    pub fn insert_contact(&self, contact: Contact) {
        self.tables.write().contacts.push(contact);
    }

    pub fn insert_task(&self, task: Task) {
        self.tables.write().tasks.push(task);
    }

    pub fn insert_project(&self, project: Project) {
        self.tables.write().projects.push(project);
    }

    pub fn insert_note(&self, note: Note) {
        self.tables.write().notes.push(note);
    }

    pub fn insert_conversation(&self, conversation: Conversation) {
        self.tables.write().conversations.push(conversation);
    }

    pub fn contacts_for(&self, user_id: &str) -> Vec<Contact> {
        self.tables.read().contacts.iter().filter(|c| c.user_id == user_id).cloned().collect()
    }

    pub fn tasks_for(&self, user_id: &str) -> Vec<Task> {
        self.tables.read().tasks.iter().filter(|t| t.user_id == user_id).cloned().collect()
    }

    pub fn projects_for(&self, user_id: &str) -> Vec<Project> {
        self.tables.read().projects.iter().filter(|p| p.user_id == user_id).cloned().collect()
    }

    pub fn conversations_for(&self, user_id: &str) -> Vec<Conversation> {
        self.tables
            .read()
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn read(&self, source: StoreSource) -> StoreResult<()> {
        *self.queries.lock().entry(source).or_insert(0) += 1;
        self.gate(source).await
    }

    async fn gate(&self, source: StoreSource) -> StoreResult<()> {
        let delay = self.delays.lock().get(&source).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.lock().contains(&source) {
            return Err(StoreError::Unavailable(source.as_str().to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn find(&self, user_id: &str, query: &ContactQuery) -> StoreResult<Vec<Contact>> {
        self.read(StoreSource::Contacts).await?;
        let mut found: Vec<Contact> = self
            .tables
            .read()
            .contacts
            .iter()
            .filter(|c| c.user_id == user_id && contact_matches(c, query))
            .cloned()
            .collect();
        found.sort_by(contact_order);
        apply_limit(&mut found, query.limit);
        Ok(found)
    }

    async fn find_by_name(&self, user_id: &str, name: &str) -> StoreResult<Option<Contact>> {
        self.read(StoreSource::Contacts).await?;
        let key = name_key(name);
        Ok(self
            .tables
            .read()
            .contacts
            .iter()
            .find(|c| c.user_id == user_id && name_key(&c.name) == key)
            .cloned())
    }

    async fn create(&self, user_id: &str, new: NewContact) -> StoreResult<Contact> {
        self.gate(StoreSource::Contacts).await?;
        let contact = Contact {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: new.name.trim().to_string(),
            email: new.email,
            phone: new.phone,
            company: new.company,
            relationship: new.relationship,
            importance: new.importance,
            last_contact: new.last_contact,
            preferred_contact: new.preferred_contact,
            source: new.source,
            created_at: self.clock.timestamp(),
        };
        self.tables.write().contacts.push(contact.clone());
        Ok(contact)
    }

    async fn update(&self, contact: &Contact) -> StoreResult<()> {
        self.gate(StoreSource::Contacts).await?;
        let mut tables = self.tables.write();
        let slot = tables
            .contacts
            .iter_mut()
            .find(|c| c.id == contact.id)
            .ok_or_else(|| StoreError::NotFound { entity: "contact", id: contact.id.clone() })?;
        *slot = contact.clone();
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn find(&self, user_id: &str, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        self.read(StoreSource::Tasks).await?;
        let mut found: Vec<Task> = self
            .tables
            .read()
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id && task_matches(t, query))
            .cloned()
            .collect();
        found.sort_by(task_order(query.order));
        apply_limit(&mut found, query.limit);
        Ok(found)
    }

    async fn create(&self, user_id: &str, new: NewTask) -> StoreResult<Task> {
        self.gate(StoreSource::Tasks).await?;
        let now = self.clock.timestamp();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            category: new.category,
            project_id: new.project_id,
            due_date: new.due_date,
            progress: 0,
            related_contacts: vec![],
            last_activity: now,
            created_at: now,
            completed_at: None,
            archived: false,
            source: new.source,
            original_text: new.original_text,
        };
        self.tables.write().tasks.push(task.clone());
        Ok(task)
    }

    async fn update(&self, task: &Task) -> StoreResult<()> {
        self.gate(StoreSource::Tasks).await?;
        let mut tables = self.tables.write();
        let slot = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| StoreError::NotFound { entity: "task", id: task.id.clone() })?;
        *slot = task.clone();
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn find(&self, user_id: &str, query: &ProjectQuery) -> StoreResult<Vec<Project>> {
        self.read(StoreSource::Projects).await?;
        let mut found: Vec<Project> = self
            .tables
            .read()
            .projects
            .iter()
            .filter(|p| p.user_id == user_id && project_matches(p, query))
            .cloned()
            .collect();
        found.sort_by(project_order);
        apply_limit(&mut found, query.limit);
        Ok(found)
    }

    async fn find_by_name(&self, user_id: &str, name: &str) -> StoreResult<Option<Project>> {
        self.read(StoreSource::Projects).await?;
        let key = name_key(name);
        Ok(self
            .tables
            .read()
            .projects
            .iter()
            .find(|p| p.user_id == user_id && name_key(&p.name) == key)
            .cloned())
    }

    async fn create(&self, user_id: &str, new: NewProject) -> StoreResult<Project> {
        self.gate(StoreSource::Projects).await?;
        let project = Project {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: new.name.trim().to_string(),
            description: new.description,
            status: new.status,
            priority: new.priority,
            progress: 0,
            start_date: new.start_date,
            target_date: new.target_date,
            risk_level: Importance::Low,
            stakeholders: vec![],
            created_at: self.clock.timestamp(),
            archived: false,
            source: new.source,
        };
        self.tables.write().projects.push(project.clone());
        Ok(project)
    }

    async fn update(&self, project: &Project) -> StoreResult<()> {
        self.gate(StoreSource::Projects).await?;
        let mut tables = self.tables.write();
        let slot = tables
            .projects
            .iter_mut()
            .find(|p| p.id == project.id)
            .ok_or_else(|| StoreError::NotFound { entity: "project", id: project.id.clone() })?;
        *slot = project.clone();
        Ok(())
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn find(&self, user_id: &str, query: &NoteQuery) -> StoreResult<Vec<Note>> {
        self.read(StoreSource::Notes).await?;
        let mut found: Vec<Note> = self
            .tables
            .read()
            .notes
            .iter()
            .filter(|n| n.user_id == user_id && note_matches(n, query))
            .cloned()
            .collect();
        found.sort_by(note_order);
        apply_limit(&mut found, query.limit);
        Ok(found)
    }

    async fn create(&self, user_id: &str, new: NewNote) -> StoreResult<Note> {
        self.gate(StoreSource::Notes).await?;
        let note = Note {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: new.title,
            content: new.content,
            note_type: new.note_type,
            tags: new.tags,
            key_topics: new.key_topics,
            pinned: new.pinned,
            last_modified: self.clock.timestamp(),
            archived: false,
        };
        self.tables.write().notes.push(note.clone());
        Ok(note)
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn find(
        &self,
        user_id: &str,
        query: &ConversationQuery,
    ) -> StoreResult<Vec<Conversation>> {
        self.read(StoreSource::Conversations).await?;
        let mut found: Vec<Conversation> = self
            .tables
            .read()
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id && conversation_matches(c, query))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        apply_limit(&mut found, query.limit);
        Ok(found)
    }

    async fn create(&self, user_id: &str, new: NewConversation) -> StoreResult<Conversation> {
        self.gate(StoreSource::Conversations).await?;
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            role: new.role,
            message: new.message,
            intent: new.intent,
            urgency: new.urgency,
            timestamp: new.timestamp,
        };
        self.tables.write().conversations.push(conversation.clone());
        Ok(conversation)
    }
}
