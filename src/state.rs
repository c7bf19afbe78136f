//! Shared, immutable request state.

use crate::services::{
    delete_service::DeleteService, object_store::ObjectStore, upload_service::UploadService,
};
use std::sync::Arc;

/// Everything a handler needs, built once in `main` from the chosen store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub uploads: UploadService,
    pub deletes: DeleteService,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            uploads: UploadService::new(store.clone()),
            deletes: DeleteService::new(store.clone()),
            store,
        }
    }
}
