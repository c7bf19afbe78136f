//! Ownership policy: only the author of record may overwrite or delete.
//!
//! Decisions are computed from a single `head` of the key at call time. No
//! reservation is taken, so two writers racing on the same new key can both
//! be allowed; the store's last write wins.

use crate::{models::object::ObjectHead, services::object_store::ObjectStore};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Write,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Key absent: first writer wins. For deletes this is a no-op downstream.
    AllowCreate,
    /// Key present and recorded author equals the claim.
    AllowOverwrite,
    /// Key present and owned by someone else (or by nobody on record).
    Deny { owner: Option<String> },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Decision::Deny { .. })
    }
}

/// Decide from already-fetched metadata. Author comparison is exact and
/// case-sensitive.
pub fn evaluate(head: Option<&ObjectHead>, claimed_author: &str) -> Decision {
    match head {
        None => Decision::AllowCreate,
        Some(head) if head.author.as_deref() == Some(claimed_author) => Decision::AllowOverwrite,
        Some(head) => Decision::Deny {
            owner: head.author.clone(),
        },
    }
}

/// Fetch `key` once and decide. A failed metadata read counts as absence.
pub async fn authorize(
    store: &dyn ObjectStore,
    key: &str,
    claimed_author: &str,
    intent: Intent,
) -> Decision {
    let head = match store.head(key).await {
        Ok(head) => head,
        Err(err) => {
            debug!(key, ?intent, "metadata unavailable, treating as absent: {}", err);
            None
        }
    };
    let decision = evaluate(head.as_ref(), claimed_author);
    debug!(key, ?intent, ?decision, "ownership decision");
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::MemoryObjectStore;

    #[tokio::test]
    async fn absent_key_allows_create() {
        let store = MemoryObjectStore::new();
        let decision = authorize(&store, "new.png", "A", Intent::Write).await;
        assert_eq!(decision, Decision::AllowCreate);
        assert_eq!(
            authorize(&store, "new.png", "A", Intent::Delete).await,
            Decision::AllowCreate
        );
    }

    #[tokio::test]
    async fn matching_author_allows_overwrite() {
        let store = MemoryObjectStore::new();
        store.insert("K.jpeg", Some("A"), b"a");
        assert_eq!(
            authorize(&store, "K.jpeg", "A", Intent::Write).await,
            Decision::AllowOverwrite
        );
    }

    #[tokio::test]
    async fn author_comparison_is_case_sensitive() {
        let store = MemoryObjectStore::new();
        store.insert("K.jpeg", Some("alice"), b"a");
        let decision = authorize(&store, "K.jpeg", "Alice", Intent::Delete).await;
        assert_eq!(
            decision,
            Decision::Deny {
                owner: Some("alice".into())
            }
        );
        assert!(!decision.is_allowed());
    }

    #[tokio::test]
    async fn object_without_author_is_denied_to_everyone() {
        let store = MemoryObjectStore::new();
        store.insert("orphan.png", None, b"x");
        let head = store.head("orphan.png").await.unwrap();
        assert_eq!(evaluate(head.as_ref(), ""), Decision::Deny { owner: None });
    }
}
