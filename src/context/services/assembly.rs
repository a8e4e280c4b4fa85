//! Context assembly: ranking, pinning, and prompt rendering.

use super::prompt::{PromptExcerpt, PromptInput, PromptRepository, PromptTask, render_prompt};
use crate::agent_run::domain::RunType;
use crate::config::LifecycleConfig;
use crate::context::{
    domain::{
        ContextDocument, ContextItem, ContextKey, ContextQuery, ContextReference,
        ContextSuggestion, ReferenceOrigin,
    },
    ports::{
        ContextReferenceRepository, ContextReferenceRepositoryError, ContextStore,
        ContextStoreError,
    },
};
use crate::task::domain::{LinkedRepository, Task, TaskId};
use mockable::Clock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Service-level errors for context operations.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    /// The context store or ranker failed.
    #[error(transparent)]
    Store(#[from] ContextStoreError),
    /// The reference repository failed or refused the change.
    #[error(transparent)]
    References(#[from] ContextReferenceRepositoryError),
    /// The prompt template could not be rendered.
    #[error("failed to render {run_type} prompt: {reason}")]
    PromptRender {
        /// Run type whose prompt failed.
        run_type: RunType,
        /// Template engine message.
        reason: String,
    },
}

/// Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;

/// Rendered prompt together with the context it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPrompt {
    /// Rendered agent prompt.
    pub prompt: String,
    /// Assembled context items, pinned ones first.
    pub items: Vec<ContextItem>,
}

/// Assembles ranked context and renders agent prompts.
pub struct ContextAssemblyService<C>
where
    C: Clock + Send + Sync,
{
    store: Arc<dyn ContextStore>,
    references: Arc<dyn ContextReferenceRepository>,
    clock: Arc<C>,
    suggestion_limit: usize,
    min_relevance: f64,
}

impl<C> ContextAssemblyService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a context assembly service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ContextStore>,
        references: Arc<dyn ContextReferenceRepository>,
        clock: Arc<C>,
        config: &LifecycleConfig,
    ) -> Self {
        Self {
            store,
            references,
            clock,
            suggestion_limit: config.suggestion_limit,
            min_relevance: config.min_relevance,
        }
    }

    /// Returns ranked suggestions for the task, excluding items it already
    /// references.
    ///
    /// Suggestions are sorted by descending relevance, deduplicated by
    /// `(refType, refId)`, thresholded, and limited.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] when the ranker or reference lookup fails.
    pub async fn suggest_context(&self, task: &Task) -> ContextResult<Vec<ContextSuggestion>> {
        let attached = self.attached_keys(task.id()).await?;
        self.ranked_suggestions(task, &attached).await
    }

    /// Assembles the task's context: every stored reference, then ranked
    /// suggestions not already referenced.
    ///
    /// A failing ranker degrades to references only.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::References`] when references cannot be read.
    pub async fn assemble(&self, task: &Task) -> ContextResult<Vec<ContextItem>> {
        Ok(self.gather(task).await?.0)
    }

    /// Assembles context and renders the agent prompt for `run_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] when references cannot be read or the
    /// template fails to render.
    pub async fn prepare_prompt(
        &self,
        task: &Task,
        run_type: RunType,
        repository: Option<&LinkedRepository>,
        instructions: Option<&str>,
    ) -> ContextResult<PreparedPrompt> {
        let (items, mut documents) = self.gather(task).await?;
        let mut excerpts = Vec::with_capacity(items.len());
        for item in &items {
            if !documents.contains_key(&item.key) {
                if let Some(document) = self.fetch_document(task, &item.key).await {
                    documents.insert(item.key.clone(), document);
                }
            }
            match documents.get(&item.key) {
                Some(document) => excerpts.push(PromptExcerpt::new(
                    item.title.clone(),
                    item.key.ref_type.as_str(),
                    item.key.ref_id.to_string(),
                    &document.body,
                )),
                None => debug!(
                    task_id = %task.id(),
                    key = %item.key,
                    "context body unavailable, skipped"
                ),
            }
        }

        let input = PromptInput {
            task: PromptTask {
                title: task.title(),
                description: task.description(),
                prompt: task.prompt(),
                plan: task.plan(),
            },
            repository: repository.map(|linked| PromptRepository {
                full_name: linked.full_name().to_string(),
                default_branch: linked.default_branch().to_string(),
            }),
            instructions,
            context: excerpts,
        };
        let prompt = render_prompt(run_type, &input)?;
        Ok(PreparedPrompt { prompt, items })
    }

    /// Stores accepted suggestions as references with origin `suggested`.
    ///
    /// Suggestions the task already references are skipped. Returns the
    /// references created.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::References`] when persistence fails.
    pub async fn accept_suggestions(
        &self,
        task: &Task,
        suggestions: &[ContextSuggestion],
    ) -> ContextResult<Vec<ContextReference>> {
        let mut created = Vec::new();
        for suggestion in suggestions {
            let reference = ContextReference::new(
                task.id(),
                suggestion.key.clone(),
                ReferenceOrigin::Suggested,
                &*self.clock,
            );
            match self.references.add(&reference).await {
                Ok(()) => created.push(reference),
                Err(ContextReferenceRepositoryError::DuplicateReference { key, .. }) => {
                    debug!(task_id = %task.id(), %key, "suggestion already referenced");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(created)
    }

    /// Pins a workspace item to the task.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::References`] wrapping
    /// [`ContextReferenceRepositoryError::DuplicateReference`] when the key
    /// is already referenced.
    pub async fn add_reference(
        &self,
        task: &Task,
        key: ContextKey,
    ) -> ContextResult<ContextReference> {
        let reference =
            ContextReference::new(task.id(), key, ReferenceOrigin::Manual, &*self.clock);
        self.references.add(&reference).await?;
        Ok(reference)
    }

    /// Unpins a workspace item; returns `false` when it was not pinned.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::References`] when persistence fails.
    pub async fn remove_reference(&self, task_id: TaskId, key: &ContextKey) -> ContextResult<bool> {
        Ok(self.references.remove(task_id, key).await?)
    }

    /// Returns the task's references, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::References`] when persistence fails.
    pub async fn references(&self, task_id: TaskId) -> ContextResult<Vec<ContextReference>> {
        Ok(self.references.list_for_task(task_id).await?)
    }

    async fn attached_keys(&self, task_id: TaskId) -> ContextResult<HashSet<ContextKey>> {
        Ok(self
            .references
            .list_for_task(task_id)
            .await?
            .into_iter()
            .map(|reference| reference.key().clone())
            .collect())
    }

    async fn ranked_suggestions(
        &self,
        task: &Task,
        attached: &HashSet<ContextKey>,
    ) -> ContextResult<Vec<ContextSuggestion>> {
        let query = ContextQuery {
            workspace_id: task.workspace_id(),
            title: task.title().to_owned(),
            description: task.description().map(str::to_owned),
        };
        let mut candidates = self.store.suggest_context(&query).await?;
        candidates.sort_by(|left, right| {
            left.relevance_score
                .descending(right.relevance_score)
                .then_with(|| left.key.cmp(&right.key))
        });

        let mut seen = HashSet::new();
        let ranked = candidates
            .into_iter()
            .filter(|candidate| candidate.relevance_score.value() >= self.min_relevance)
            .filter(|candidate| !attached.contains(&candidate.key))
            .filter(|candidate| seen.insert(candidate.key.clone()))
            .take(self.suggestion_limit)
            .collect();
        Ok(ranked)
    }

    async fn gather(
        &self,
        task: &Task,
    ) -> ContextResult<(Vec<ContextItem>, HashMap<ContextKey, ContextDocument>)> {
        let references = self.references.list_for_task(task.id()).await?;
        let attached: HashSet<ContextKey> = references
            .iter()
            .map(|reference| reference.key().clone())
            .collect();

        let mut documents = HashMap::new();
        let mut items = Vec::with_capacity(references.len());
        for reference in references {
            let key = reference.key().clone();
            let document = self.fetch_document(task, &key).await;
            let title = document
                .as_ref()
                .map_or_else(|| key.ref_id.to_string(), |found| found.title.clone());
            if let Some(found) = document {
                documents.insert(key.clone(), found);
            }
            items.push(ContextItem::pinned(key, title));
        }

        match self.ranked_suggestions(task, &attached).await {
            Ok(suggestions) => items.extend(suggestions.into_iter().map(ContextItem::from)),
            Err(err) => {
                warn!(
                    task_id = %task.id(),
                    error = %err,
                    "context ranking failed, using pinned references only"
                );
            }
        }
        Ok((items, documents))
    }

    async fn fetch_document(&self, task: &Task, key: &ContextKey) -> Option<ContextDocument> {
        match self.store.fetch(task.workspace_id(), key).await {
            Ok(document) => document,
            Err(err) => {
                warn!(task_id = %task.id(), %key, error = %err, "context fetch failed");
                None
            }
        }
    }
}
