use anyhow::Result;
use rusqlite::Connection;

pub fn create_tables(conn: &Connection) -> Result<()> {
    // Contacts table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS contacts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            company TEXT,
            relationship TEXT NOT NULL,
            importance TEXT NOT NULL,
            importance_rank INTEGER NOT NULL,
            last_contact INTEGER,
            preferred_contact TEXT NOT NULL,
            source TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_contacts_user_name ON contacts(user_id, name_key)",
        [],
    )?;

    // Tasks table; related_contacts is a JSON array of contact ids
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL,
            priority TEXT NOT NULL,
            priority_rank INTEGER NOT NULL,
            category TEXT,
            project_id TEXT,
            due_date INTEGER,
            progress INTEGER NOT NULL DEFAULT 0,
            related_contacts TEXT NOT NULL DEFAULT '[]',
            last_activity INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            completed_at INTEGER,
            archived INTEGER NOT NULL DEFAULT 0,
            source TEXT NOT NULL,
            original_text TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tasks_user_status ON tasks(user_id, status)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at)",
        [],
    )?;

    // Projects table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL,
            priority TEXT NOT NULL,
            priority_rank INTEGER NOT NULL,
            progress INTEGER NOT NULL DEFAULT 0,
            start_date INTEGER NOT NULL,
            target_date INTEGER,
            risk_level TEXT NOT NULL,
            stakeholders TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL,
            archived INTEGER NOT NULL DEFAULT 0,
            source TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_projects_user_name ON projects(user_id, name_key)",
        [],
    )?;

    // Notes table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            note_type TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            key_topics TEXT NOT NULL DEFAULT '[]',
            pinned INTEGER NOT NULL DEFAULT 0,
            last_modified INTEGER NOT NULL,
            archived INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // Conversations table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            role TEXT NOT NULL,
            message TEXT NOT NULL,
            intent TEXT,
            urgency TEXT,
            timestamp INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_conversations_user_ts ON conversations(user_id, timestamp)",
        [],
    )?;

    Ok(())
}
