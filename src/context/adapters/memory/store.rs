//! In-memory workspace context pool with scripted rankings.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::context::{
    domain::{ContextDocument, ContextKey, ContextQuery, ContextSuggestion},
    ports::{ContextStore, ContextStoreError, ContextStoreResult},
};
use crate::task::domain::WorkspaceId;

/// Context store backed by maps, with rankings supplied up front.
///
/// Rankings are returned verbatim for every query against the workspace, so
/// tests control scores exactly.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContextStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    documents: HashMap<WorkspaceId, HashMap<ContextKey, ContextDocument>>,
    rankings: HashMap<WorkspaceId, Vec<ContextSuggestion>>,
    failure: Option<ContextStoreError>,
    queries: Vec<ContextQuery>,
}

impl InMemoryContextStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a workspace item.
    pub fn insert_document(&self, workspace_id: WorkspaceId, document: ContextDocument) {
        let mut state = self.lock();
        state
            .documents
            .entry(workspace_id)
            .or_default()
            .insert(document.key.clone(), document);
    }

    /// Sets the ranker output for the workspace.
    pub fn set_rankings(&self, workspace_id: WorkspaceId, rankings: Vec<ContextSuggestion>) {
        self.lock().rankings.insert(workspace_id, rankings);
    }

    /// Makes every call fail with `error` until [`Self::recover`].
    pub fn fail_with(&self, error: ContextStoreError) {
        self.lock().failure = Some(error);
    }

    /// Clears a failure set by [`Self::fail_with`].
    pub fn recover(&self) {
        self.lock().failure = None;
    }

    /// Returns the queries received so far.
    #[must_use]
    pub fn queries(&self) -> Vec<ContextQuery> {
        self.lock().queries.clone()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn suggest_context(
        &self,
        query: &ContextQuery,
    ) -> ContextStoreResult<Vec<ContextSuggestion>> {
        let mut state = self.lock();
        if let Some(error) = state.failure.clone() {
            return Err(error);
        }
        state.queries.push(query.clone());
        Ok(state
            .rankings
            .get(&query.workspace_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch(
        &self,
        workspace_id: WorkspaceId,
        key: &ContextKey,
    ) -> ContextStoreResult<Option<ContextDocument>> {
        let state = self.lock();
        if let Some(error) = state.failure.clone() {
            return Err(error);
        }
        Ok(state
            .documents
            .get(&workspace_id)
            .and_then(|documents| documents.get(key))
            .cloned())
    }
}
