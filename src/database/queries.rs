use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{ToSql, Type};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Contact, Conversation, Importance, Intent, NewContact, NewConversation, NewNote, NewProject,
    NewTask, Note, Priority, Project, ProjectStatus, Role, Task, TaskStatus, Urgency,
};
use crate::store::{
    apply_limit, name_key, note_matches, ContactQuery, ContactStore, ConversationQuery,
    ConversationStore, NoteQuery, NoteStore, ProjectQuery, ProjectStore, TaskOrder, TaskQuery,
    TaskStore,
};
use crate::utils::clock::{Clock, SystemClock};

/// SQLite-backed implementation of every CRM store.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self::with_clock(conn, Arc::new(SystemClock))
    }

    pub fn with_clock(conn: Connection, clock: Arc<dyn Clock>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            clock,
        }
    }
}

fn enum_col<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, format!("unknown value '{}'", raw).into())
    })
}

fn opt_enum_col<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.and_then(|s| parse(&s)))
}

fn json_list_col(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Append `?n` placeholders for `values` and return "IN (...)" text.
fn in_clause<T: ToSql + Clone + Send + 'static>(
    column: &str,
    values: &[T],
    params: &mut Params,
) -> String {
    let placeholders: Vec<String> = values
        .iter()
        .map(|v| {
            params.push(Box::new(v.clone()));
            format!("?{}", params.len())
        })
        .collect();
    format!("{} IN ({})", column, placeholders.join(","))
}

fn limit_clause(limit: Option<usize>) -> String {
    limit.map(|l| format!("LIMIT {}", l)).unwrap_or_default()
}

const CONTACT_COLUMNS: &str = "id, user_id, name, email, phone, company, relationship,
    importance, last_contact, preferred_contact, source, created_at";

fn contact_from_row(row: &Row) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        company: row.get(5)?,
        relationship: row.get(6)?,
        importance: enum_col(row, 7, Importance::parse)?,
        last_contact: row.get(8)?,
        preferred_contact: row.get(9)?,
        source: row.get(10)?,
        created_at: row.get(11)?,
    })
}

const TASK_COLUMNS: &str = "id, user_id, title, description, status, priority, category,
    project_id, due_date, progress, related_contacts, last_activity, created_at,
    completed_at, archived, source, original_text";

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: enum_col(row, 4, TaskStatus::parse)?,
        priority: enum_col(row, 5, Priority::parse)?,
        category: row.get(6)?,
        project_id: row.get(7)?,
        due_date: row.get(8)?,
        progress: row.get::<_, i64>(9)?.clamp(0, 100) as u8,
        related_contacts: json_list_col(row, 10)?,
        last_activity: row.get(11)?,
        created_at: row.get(12)?,
        completed_at: row.get(13)?,
        archived: row.get(14)?,
        source: row.get(15)?,
        original_text: row.get(16)?,
    })
}

const PROJECT_COLUMNS: &str = "id, user_id, name, description, status, priority, progress,
    start_date, target_date, risk_level, stakeholders, created_at, archived, source";

fn project_from_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status: enum_col(row, 4, ProjectStatus::parse)?,
        priority: enum_col(row, 5, Priority::parse)?,
        progress: row.get::<_, i64>(6)?.clamp(0, 100) as u8,
        start_date: row.get(7)?,
        target_date: row.get(8)?,
        risk_level: enum_col(row, 9, Importance::parse)?,
        stakeholders: json_list_col(row, 10)?,
        created_at: row.get(11)?,
        archived: row.get(12)?,
        source: row.get(13)?,
    })
}

const NOTE_COLUMNS: &str =
    "id, user_id, title, content, note_type, tags, key_topics, pinned, last_modified, archived";

fn note_from_row(row: &Row) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        note_type: row.get(4)?,
        tags: json_list_col(row, 5)?,
        key_topics: json_list_col(row, 6)?,
        pinned: row.get(7)?,
        last_modified: row.get(8)?,
        archived: row.get(9)?,
    })
}

fn conversation_from_row(row: &Row) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        role: enum_col(row, 2, Role::parse)?,
        message: row.get(3)?,
        intent: opt_enum_col(row, 4, Intent::parse)?,
        urgency: opt_enum_col(row, 5, Urgency::parse)?,
        timestamp: row.get(6)?,
    })
}

type Params = Vec<Box<dyn ToSql + Send>>;

fn query_rows<T>(
    conn: &Connection,
    sql: &str,
    params: &[Box<dyn ToSql + Send>],
    map: fn(&Row) -> rusqlite::Result<T>,
) -> StoreResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref() as &dyn ToSql).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), map)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn insert_contact(conn: &Connection, contact: &Contact) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO contacts (id, user_id, name, name_key, email, phone, company,
            relationship, importance, importance_rank, last_contact, preferred_contact,
            source, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        rusqlite::params![
            contact.id,
            contact.user_id,
            contact.name,
            name_key(&contact.name),
            contact.email,
            contact.phone,
            contact.company,
            contact.relationship,
            contact.importance.as_str(),
            contact.importance as i64,
            contact.last_contact,
            contact.preferred_contact,
            contact.source,
            contact.created_at,
        ],
    )?;
    Ok(())
}

fn insert_task(conn: &Connection, task: &Task) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO tasks (id, user_id, title, description, status, priority, priority_rank,
            category, project_id, due_date, progress, related_contacts, last_activity,
            created_at, completed_at, archived, source, original_text)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        rusqlite::params![
            task.id,
            task.user_id,
            task.title,
            task.description,
            task.status.as_str(),
            task.priority.as_str(),
            task.priority.rank(),
            task.category,
            task.project_id,
            task.due_date,
            task.progress as i64,
            serde_json::to_string(&task.related_contacts)?,
            task.last_activity,
            task.created_at,
            task.completed_at,
            task.archived,
            task.source,
            task.original_text,
        ],
    )?;
    Ok(())
}

fn insert_project(conn: &Connection, project: &Project) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO projects (id, user_id, name, name_key, description, status, priority,
            priority_rank, progress, start_date, target_date, risk_level, stakeholders,
            created_at, archived, source)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        rusqlite::params![
            project.id,
            project.user_id,
            project.name,
            name_key(&project.name),
            project.description,
            project.status.as_str(),
            project.priority.as_str(),
            project.priority.rank(),
            project.progress as i64,
            project.start_date,
            project.target_date,
            project.risk_level.as_str(),
            serde_json::to_string(&project.stakeholders)?,
            project.created_at,
            project.archived,
            project.source,
        ],
    )?;
    Ok(())
}

impl SqliteStore {
    /// Run `f` against the connection on tokio's blocking pool so a caller's
    /// timeout can still fire while SQLite is busy.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || f(&conn.lock()))
            .await
            .map_err(|e| StoreError::Unavailable(format!("sqlite worker failed: {}", e)))?
    }

    /// Insert a fully-formed task, keeping its id and timestamps.
    pub fn import_task(&self, task: &Task) -> StoreResult<()> {
        insert_task(&self.conn.lock(), task)
    }

    pub fn import_contact(&self, contact: &Contact) -> StoreResult<()> {
        insert_contact(&self.conn.lock(), contact)
    }

    pub fn import_project(&self, project: &Project) -> StoreResult<()> {
        insert_project(&self.conn.lock(), project)
    }
}

#[async_trait]
impl ContactStore for SqliteStore {
    async fn find(&self, user_id: &str, query: &ContactQuery) -> StoreResult<Vec<Contact>> {
        let mut params: Params = vec![Box::new(user_id.to_string())];
        let mut any_of = Vec::new();

        if !query.names.is_empty() {
            let keys: Vec<String> = query.names.iter().map(|n| name_key(n)).collect();
            any_of.push(in_clause("name_key", &keys, &mut params));
        }
        if let Some(level) = query.importance {
            params.push(Box::new(level as i64));
            any_of.push(format!("importance_rank = ?{}", params.len()));
        }
        if let Some(since) = query.contacted_since {
            params.push(Box::new(since));
            any_of.push(format!("last_contact >= ?{}", params.len()));
        }

        let extra_where = if any_of.is_empty() {
            String::new()
        } else {
            format!("AND ({})", any_of.join(" OR "))
        };

        let sql = format!(
            "SELECT {} FROM contacts
             WHERE user_id = ?1 {}
             ORDER BY importance_rank DESC, last_contact IS NULL, last_contact DESC
             {}",
            CONTACT_COLUMNS,
            extra_where,
            limit_clause(query.limit)
        );
        self.with_conn(move |conn| query_rows(conn, &sql, &params, contact_from_row))
            .await
    }

    async fn find_by_name(&self, user_id: &str, name: &str) -> StoreResult<Option<Contact>> {
        let user_id = user_id.to_string();
        let key = name_key(name);
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM contacts WHERE user_id = ?1 AND name_key = ?2 ORDER BY created_at LIMIT 1",
                CONTACT_COLUMNS
            );
            let found = conn
                .query_row(&sql, rusqlite::params![user_id, key], contact_from_row)
                .optional()?;
            Ok(found)
        })
        .await
    }

    async fn create(&self, user_id: &str, new: NewContact) -> StoreResult<Contact> {
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
        self.with_conn(move |conn| {
            insert_contact(conn, &contact)?;
            Ok(contact)
        })
        .await
    }

    async fn update(&self, contact: &Contact) -> StoreResult<()> {
        let contact = contact.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE contacts SET name = ?2, name_key = ?3, email = ?4, phone = ?5, company = ?6,
                    relationship = ?7, importance = ?8, importance_rank = ?9, last_contact = ?10,
                    preferred_contact = ?11
                 WHERE id = ?1",
                rusqlite::params![
                    contact.id,
                    contact.name,
                    name_key(&contact.name),
                    contact.email,
                    contact.phone,
                    contact.company,
                    contact.relationship,
                    contact.importance.as_str(),
                    contact.importance as i64,
                    contact.last_contact,
                    contact.preferred_contact,
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound { entity: "contact", id: contact.id });
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn find(&self, user_id: &str, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let mut params: Params = vec![Box::new(user_id.to_string())];
        let mut conditions = vec!["user_id = ?1".to_string()];

        if !query.include_archived {
            conditions.push("archived = 0".to_string());
        }
        if let Some(statuses) = &query.statuses {
            let names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            conditions.push(in_clause("status", &names, &mut params));
        }
        if let Some(since) = query.created_since {
            params.push(Box::new(since));
            conditions.push(format!("created_at >= ?{}", params.len()));
        }

        let order = match query.order {
            TaskOrder::Relevance => {
                "priority_rank DESC, due_date IS NULL, due_date ASC, last_activity DESC"
            }
            TaskOrder::Newest => "created_at DESC",
        };

        let sql = format!(
            "SELECT {} FROM tasks WHERE {} ORDER BY {} {}",
            TASK_COLUMNS,
            conditions.join(" AND "),
            order,
            limit_clause(query.limit)
        );
        self.with_conn(move |conn| query_rows(conn, &sql, &params, task_from_row))
            .await
    }

    async fn create(&self, user_id: &str, new: NewTask) -> StoreResult<Task> {
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
        self.with_conn(move |conn| {
            insert_task(conn, &task)?;
            Ok(task)
        })
        .await
    }

    async fn update(&self, task: &Task) -> StoreResult<()> {
        let task = task.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET title = ?2, description = ?3, status = ?4, priority = ?5,
                    priority_rank = ?6, category = ?7, project_id = ?8, due_date = ?9, progress = ?10,
                    related_contacts = ?11, last_activity = ?12, completed_at = ?13, archived = ?14
                 WHERE id = ?1",
                rusqlite::params![
                    task.id,
                    task.title,
                    task.description,
                    task.status.as_str(),
                    task.priority.as_str(),
                    task.priority.rank(),
                    task.category,
                    task.project_id,
                    task.due_date,
                    task.progress as i64,
                    serde_json::to_string(&task.related_contacts)?,
                    task.last_activity,
                    task.completed_at,
                    task.archived,
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound { entity: "task", id: task.id });
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn find(&self, user_id: &str, query: &ProjectQuery) -> StoreResult<Vec<Project>> {
        let mut params: Params = vec![Box::new(user_id.to_string())];
        let mut conditions = vec!["user_id = ?1".to_string()];

        if !query.include_archived {
            conditions.push("archived = 0".to_string());
        }
        if let Some(ids) = &query.ids {
            if ids.is_empty() {
                return Ok(vec![]);
            }
            conditions.push(in_clause("id", ids, &mut params));
        }
        if let Some(statuses) = &query.statuses {
            let names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            conditions.push(in_clause("status", &names, &mut params));
        }

        let sql = format!(
            "SELECT {} FROM projects WHERE {}
             ORDER BY priority_rank DESC, target_date IS NULL, target_date ASC {}",
            PROJECT_COLUMNS,
            conditions.join(" AND "),
            limit_clause(query.limit)
        );
        self.with_conn(move |conn| query_rows(conn, &sql, &params, project_from_row))
            .await
    }

    async fn find_by_name(&self, user_id: &str, name: &str) -> StoreResult<Option<Project>> {
        let user_id = user_id.to_string();
        let key = name_key(name);
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM projects WHERE user_id = ?1 AND name_key = ?2 ORDER BY created_at LIMIT 1",
                PROJECT_COLUMNS
            );
            let found = conn
                .query_row(&sql, rusqlite::params![user_id, key], project_from_row)
                .optional()?;
            Ok(found)
        })
        .await
    }

    async fn create(&self, user_id: &str, new: NewProject) -> StoreResult<Project> {
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
        self.with_conn(move |conn| {
            insert_project(conn, &project)?;
            Ok(project)
        })
        .await
    }

    async fn update(&self, project: &Project) -> StoreResult<()> {
        let project = project.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE projects SET name = ?2, name_key = ?3, description = ?4, status = ?5,
                    priority = ?6, priority_rank = ?7, progress = ?8, target_date = ?9,
                    risk_level = ?10, stakeholders = ?11, archived = ?12
                 WHERE id = ?1",
                rusqlite::params![
                    project.id,
                    project.name,
                    name_key(&project.name),
                    project.description,
                    project.status.as_str(),
                    project.priority.as_str(),
                    project.priority.rank(),
                    project.progress as i64,
                    project.target_date,
                    project.risk_level.as_str(),
                    serde_json::to_string(&project.stakeholders)?,
                    project.archived,
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound { entity: "project", id: project.id });
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl NoteStore for SqliteStore {
    async fn find(&self, user_id: &str, query: &NoteQuery) -> StoreResult<Vec<Note>> {
        if query.terms.is_empty() {
            return Ok(vec![]);
        }
        // Term overlap is matched in Rust; SQLite's LOWER() only folds ASCII.
        let sql = format!(
            "SELECT {} FROM notes WHERE user_id = ?1 AND archived = 0
             ORDER BY pinned DESC, last_modified DESC",
            NOTE_COLUMNS
        );
        let params: Params = vec![Box::new(user_id.to_string())];
        let query = query.clone();
        self.with_conn(move |conn| {
            let mut notes: Vec<Note> = query_rows(conn, &sql, &params, note_from_row)?
                .into_iter()
                .filter(|n| note_matches(n, &query))
                .collect();
            apply_limit(&mut notes, query.limit);
            Ok(notes)
        })
        .await
    }

    async fn create(&self, user_id: &str, new: NewNote) -> StoreResult<Note> {
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
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO notes (id, user_id, title, content, note_type, tags, key_topics,
                    pinned, last_modified, archived)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    note.id,
                    note.user_id,
                    note.title,
                    note.content,
                    note.note_type,
                    serde_json::to_string(&note.tags)?,
                    serde_json::to_string(&note.key_topics)?,
                    note.pinned,
                    note.last_modified,
                    note.archived,
                ],
            )?;
            Ok(note)
        })
        .await
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn find(
        &self,
        user_id: &str,
        query: &ConversationQuery,
    ) -> StoreResult<Vec<Conversation>> {
        let mut params: Params = vec![Box::new(user_id.to_string())];
        let mut conditions = vec!["user_id = ?1".to_string()];

        if let Some(roles) = &query.roles {
            let names: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
            conditions.push(in_clause("role", &names, &mut params));
        }
        if let Some(since) = query.since {
            params.push(Box::new(since));
            conditions.push(format!("timestamp >= ?{}", params.len()));
        }

        let sql = format!(
            "SELECT id, user_id, role, message, intent, urgency, timestamp
             FROM conversations WHERE {} ORDER BY timestamp DESC {}",
            conditions.join(" AND "),
            limit_clause(query.limit)
        );
        self.with_conn(move |conn| query_rows(conn, &sql, &params, conversation_from_row))
            .await
    }

    async fn create(&self, user_id: &str, new: NewConversation) -> StoreResult<Conversation> {
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            role: new.role,
            message: new.message,
            intent: new.intent,
            urgency: new.urgency,
            timestamp: new.timestamp,
        };
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, user_id, role, message, intent, urgency, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    conversation.id,
                    conversation.user_id,
                    conversation.role.as_str(),
                    conversation.message,
                    conversation.intent.map(|i| i.as_str()),
                    conversation.urgency.map(|u| u.as_str()),
                    conversation.timestamp,
                ],
            )?;
            Ok(conversation)
        })
        .await
    }
}
