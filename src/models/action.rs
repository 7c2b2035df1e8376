use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ContactCreated,
    ContactFound,
    TaskCreated,
    ProjectCreated,
    ProjectFound,
    EntitiesLinked,
    Error,
}

/// One side effect (or failed attempt) of the action executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub entity_id: Option<String>,
    /// Second entity of a link record (the contact attached to a task).
    pub related_entity_id: Option<String>,
    pub success: bool,
    pub details: String,
}

impl ActionRecord {
    pub fn ok(kind: ActionKind, entity_id: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id: Some(entity_id.into()),
            related_entity_id: None,
            success: true,
            details: details.into(),
        }
    }

    pub fn linked(task_id: &str, contact_id: &str, details: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::EntitiesLinked,
            entity_id: Some(task_id.to_string()),
            related_entity_id: Some(contact_id.to_string()),
            success: true,
            details: details.into(),
        }
    }

    pub fn error(details: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Error,
            entity_id: None,
            related_entity_id: None,
            success: false,
            details: details.into(),
        }
    }

    /// True for records that wrote something to a store.
    pub fn is_write(&self) -> bool {
        self.success
            && matches!(
                self.kind,
                ActionKind::ContactCreated
                    | ActionKind::TaskCreated
                    | ActionKind::ProjectCreated
                    | ActionKind::EntitiesLinked
            )
    }
}
