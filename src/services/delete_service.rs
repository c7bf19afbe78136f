//! Bulk delete pipeline.
//!
//! Keys are handled one at a time and independently: a missing key, a
//! denial or a store failure on one key never stops the others.

use crate::{
    models::request::DeleteRequest,
    services::{
        object_store::ObjectStore,
        ownership::{self, Decision, Intent},
    },
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Key was not there; nothing to do.
    Missing,
    /// Key belongs to another author.
    Denied,
    /// Delete issued. `confirmed` is false when the absence wait failed.
    Deleted { confirmed: bool },
    /// The store refused the delete.
    Failed(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub outcomes: Vec<(String, DeleteOutcome)>,
}

impl DeleteReport {
    pub fn denied(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == DeleteOutcome::Denied)
            .map(|(key, _)| key.as_str())
    }

    /// Plaintext response body: one notice per denied key.
    pub fn render(&self) -> String {
        self.denied()
            .map(|key| format!("Not the author of {key}!\n"))
            .collect()
    }
}

#[derive(Clone)]
pub struct DeleteService {
    store: Arc<dyn ObjectStore>,
}

impl DeleteService {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn delete_many(&self, req: &DeleteRequest) -> DeleteReport {
        let mut report = DeleteReport::default();
        for key in &req.filenames {
            let outcome = self.delete_one(key, &req.author).await;
            if let DeleteOutcome::Failed(reason) = &outcome {
                warn!("Unable to delete object {:?}: {}", key, reason);
            }
            report.outcomes.push((key.clone(), outcome));
        }
        report
    }

    async fn delete_one(&self, key: &str, author: &str) -> DeleteOutcome {
        match ownership::authorize(self.store.as_ref(), key, author, Intent::Delete).await {
            Decision::AllowCreate => return DeleteOutcome::Missing,
            Decision::AllowOverwrite => {}
            Decision::Deny { owner } => {
                warn!(key, author, ?owner, "delete denied: not the author");
                return DeleteOutcome::Denied;
            }
        }

        if let Err(err) = self.store.delete(key).await {
            return DeleteOutcome::Failed(err.to_string());
        }

        match self.store.wait_until_absent(key).await {
            Ok(()) => {
                info!(key, "deleted");
                DeleteOutcome::Deleted { confirmed: true }
            }
            Err(err) => {
                warn!(key, "delete issued but not confirmed: {}", err);
                DeleteOutcome::Deleted { confirmed: false }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::MemoryObjectStore;

    fn service() -> (Arc<MemoryObjectStore>, DeleteService) {
        let store = Arc::new(MemoryObjectStore::new());
        (store.clone(), DeleteService::new(store))
    }

    fn request(keys: &[&str], author: &str) -> DeleteRequest {
        DeleteRequest {
            filenames: keys.iter().map(|k| k.to_string()).collect(),
            author: author.into(),
        }
    }

    #[tokio::test]
    async fn owner_deletes_all_requested_keys() {
        let (store, svc) = service();
        store.insert("cat.jpg", Some("Z"), b"meow");
        store.insert("bird.jpg", Some("Z"), b"tweet");

        let report = svc.delete_many(&request(&["cat.jpg", "bird.jpg"], "Z")).await;

        assert!(store.keys().is_empty());
        assert!(report
            .outcomes
            .iter()
            .all(|(_, o)| *o == DeleteOutcome::Deleted { confirmed: true }));
        assert_eq!(report.render(), "");
    }

    #[tokio::test]
    async fn non_owner_leaves_object_and_gets_notice() {
        let (store, svc) = service();
        store.insert("K.jpeg", Some("A"), b"a");

        let report = svc.delete_many(&request(&["K.jpeg"], "not_owner")).await;

        assert!(store.exists("K.jpeg").await);
        assert_eq!(store.author_of("K.jpeg").await.unwrap().as_deref(), Some("A"));
        assert_eq!(report.render(), "Not the author of K.jpeg!\n");
    }

    #[tokio::test]
    async fn missing_key_does_not_affect_others() {
        let (store, svc) = service();
        store.insert("a.png", Some("A"), b"a");
        store.insert("c.png", Some("A"), b"c");

        let report = svc
            .delete_many(&request(&["a.png", "ghost.png", "c.png"], "A"))
            .await;

        assert!(store.keys().is_empty());
        assert_eq!(report.outcomes[1], ("ghost.png".to_string(), DeleteOutcome::Missing));
    }

    #[tokio::test]
    async fn denial_does_not_abort_the_batch() {
        let (store, svc) = service();
        store.insert("theirs.png", Some("B"), b"b");
        store.insert("mine.png", Some("A"), b"a");

        let report = svc
            .delete_many(&request(&["theirs.png", "mine.png"], "A"))
            .await;

        assert_eq!(store.keys(), vec!["theirs.png"]);
        assert_eq!(report.denied().collect::<Vec<_>>(), vec!["theirs.png"]);
    }

    #[tokio::test]
    async fn store_failure_is_isolated_to_its_key() {
        let (store, svc) = service();
        store.insert("stuck.png", Some("A"), b"s");
        store.insert("free.png", Some("A"), b"f");
        store.fail_deletes_of("stuck.png");

        let report = svc
            .delete_many(&request(&["stuck.png", "free.png"], "A"))
            .await;

        assert!(matches!(report.outcomes[0].1, DeleteOutcome::Failed(_)));
        assert_eq!(store.keys(), vec!["stuck.png"]);
    }

    #[tokio::test]
    async fn unconfirmed_delete_is_still_reported_as_deleted() {
        let (store, svc) = service();
        store.insert("slow.png", Some("A"), b"s");
        store.linger_after_delete("slow.png");

        let report = svc.delete_many(&request(&["slow.png"], "A")).await;

        assert_eq!(
            report.outcomes,
            vec![("slow.png".to_string(), DeleteOutcome::Deleted { confirmed: false })]
        );
        assert_eq!(report.render(), "");
    }

    #[tokio::test]
    async fn object_without_author_cannot_be_deleted() {
        let (store, svc) = service();
        store.insert("orphan.png", None, b"o");

        let report = svc.delete_many(&request(&["orphan.png"], "")).await;

        assert!(store.exists("orphan.png").await);
        assert_eq!(report.render(), "Not the author of orphan.png!\n");
    }

    #[tokio::test]
    async fn duplicates_are_processed_independently() {
        let (store, svc) = service();
        store.insert("dup.png", Some("A"), b"d");

        let report = svc.delete_many(&request(&["dup.png", "dup.png"], "A")).await;

        assert_eq!(
            report.outcomes,
            vec![
                ("dup.png".to_string(), DeleteOutcome::Deleted { confirmed: true }),
                ("dup.png".to_string(), DeleteOutcome::Missing),
            ]
        );
    }
}
