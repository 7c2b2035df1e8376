use crate::error::StoreResult;
use crate::models::{Contact, Conversation, Project, Task};
use crate::store::{ContactQuery, ConversationQuery, ProjectQuery, Stores, TaskQuery};

/// Historical records one aggregation pass works over.
#[derive(Debug, Clone, Default)]
pub struct History {
    /// Newest first.
    pub conversations: Vec<Conversation>,
    /// Newest first.
    pub tasks: Vec<Task>,
    pub contacts: Vec<Contact>,
    pub projects: Vec<Project>,
}

impl History {
    /// Reads all four collections concurrently. Any failure fails the load;
    /// callers substitute their fallback.
    pub async fn load(
        stores: &Stores,
        user_id: &str,
        conversations: &ConversationQuery,
        tasks: &TaskQuery,
    ) -> StoreResult<History> {
        let contact_query = ContactQuery::default();
        let project_query = ProjectQuery {
            ids: None,
            statuses: None,
            include_archived: true,
            limit: None,
        };
        let (conversations, tasks, contacts, projects) = tokio::try_join!(
            stores.conversations.find(user_id, conversations),
            stores.tasks.find(user_id, tasks),
            stores.contacts.find(user_id, &contact_query),
            stores.projects.find(user_id, &project_query),
        )?;
        Ok(History {
            conversations,
            tasks,
            contacts,
            projects,
        })
    }

    pub fn data_points(&self) -> u32 {
        (self.conversations.len() + self.tasks.len()) as u32
    }
}

/// Case-insensitive "contains any of" over a message.
pub(crate) fn mentions_any(message: &str, needles: &[&str]) -> bool {
    let lower = message.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

/// Indices of buckets at or above 70% of the maximum. Empty when every
/// bucket is zero.
pub(crate) fn find_peaks(buckets: &[u32]) -> Vec<u32> {
    let max = buckets.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    let threshold = max as f32 * 0.7;
    buckets
        .iter()
        .enumerate()
        .filter(|(_, v)| **v as f32 >= threshold)
        .map(|(i, _)| i as u32)
        .collect()
}

pub(crate) fn ratio(part: usize, whole: usize) -> f32 {
    if whole == 0 {
        0.0
    } else {
        part as f32 / whole as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_peaks_threshold() {
        assert_eq!(find_peaks(&[0, 10, 7, 6, 10]), vec![1, 2, 4]);
        assert!(find_peaks(&[0, 0, 0]).is_empty());
        assert!(find_peaks(&[]).is_empty());
    }

    #[test]
    fn test_mentions_any_ignores_case() {
        assert!(mentions_any("Mañana hay REUNIÓN", &["reunión"]));
        assert!(!mentions_any("nothing here", &["meeting"]));
    }

    #[test]
    fn test_ratio_of_empty_is_zero() {
        assert_eq!(ratio(3, 0), 0.0);
        assert_eq!(ratio(1, 4), 0.25);
    }
}
