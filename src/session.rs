//! Chat sessions and the session store
//!
//! A session binds a prompt, a model snapshot, identity/scope fields, and an
//! append-only message history. The store persists durable records through a
//! [`StorageBackend`] handle; [`ChatSession`] is the in-memory aggregate
//! loaded from it.
//!
//! In-memory pushes are not visible to other readers of the store until an
//! explicit [`ChatSession::save`] commits them: `finish` is a pure
//! projection that can be previewed repeatedly with different bindings, and
//! multiple pushes batch into one persistence write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{PromptStageError, Result};
use crate::message::{Bindings, Message, Role};
use crate::prompt::PromptStore;
use crate::staging::MessageStagingArea;
use crate::storage::{StorageBackend, NS_SESSIONS};

/// Generate a new UUID v4 for a session
///
/// # Examples
///
/// ```
/// use promptstage::session::new_session_id;
///
/// let id = new_session_id();
/// assert_eq!(id.len(), 36);
/// ```
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Durable session record
///
/// `model` is copied from the bound prompt at creation time and never
/// re-read, so later prompt mutation does not retroactively change a live
/// session's model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique session identifier (UUID v4)
    pub id: String,
    /// Document the session is scoped to
    pub doc_id: String,
    /// Workspace the session is scoped to
    pub workspace_id: String,
    /// Identity field supplied by the caller, treated opaquely
    pub user_id: String,
    /// Name of the bound prompt
    pub prompt_name: String,
    /// Model snapshot taken at creation
    pub model: String,
    /// Ordered message history
    pub history: Vec<Message>,
    /// Creation timestamp, preserved across saves
    pub created_at: DateTime<Utc>,
    /// Refreshed on every save
    pub updated_at: DateTime<Utc>,
}

/// Read-only view of a session's identity and scope fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session identifier
    pub session_id: String,
    /// Name of the bound prompt
    pub prompt_name: String,
    /// Document scope
    pub doc_id: String,
    /// Workspace scope
    pub workspace_id: String,
    /// Caller-supplied identity
    pub user_id: String,
}

/// Input for creating a new session
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    /// Document scope
    pub doc_id: String,
    /// Workspace scope
    pub workspace_id: String,
    /// Caller-supplied identity
    pub user_id: String,
    /// Name of the prompt to bind; must exist at creation time
    pub prompt_name: String,
}

/// Lightweight session listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSessionSummary {
    /// Session identifier
    pub id: String,
    /// Name of the bound prompt
    pub prompt_name: String,
    /// Model snapshot
    pub model: String,
    /// Number of messages in the durable history
    pub message_count: usize,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last save timestamp
    pub updated_at: DateTime<Utc>,
}

/// Keyed collection of chat sessions
///
/// Holds explicit handles to the prompt store (for model snapshots and
/// prompt re-resolution) and the staging area (for committing staged
/// messages). Cloning the store clones the handles, not the data.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn StorageBackend>,
    prompts: PromptStore,
    staging: MessageStagingArea,
}

impl SessionStore {
    /// Creates a store over the given backend and collaborators
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        prompts: PromptStore,
        staging: MessageStagingArea,
    ) -> Self {
        Self {
            backend,
            prompts,
            staging,
        }
    }

    /// Creates a new session bound to an existing prompt
    ///
    /// Allocates a fresh id, snapshots the prompt's model, and persists an
    /// empty-history record.
    ///
    /// # Errors
    ///
    /// Returns `PromptStageError::PromptNotFound` when `prompt_name` does
    /// not resolve.
    pub fn create(&self, spec: NewSession) -> Result<String> {
        let prompt = self
            .prompts
            .get(&spec.prompt_name)?
            .ok_or_else(|| PromptStageError::PromptNotFound(spec.prompt_name.clone()))?;

        let now = Utc::now();
        let record = SessionRecord {
            id: new_session_id(),
            doc_id: spec.doc_id,
            workspace_id: spec.workspace_id,
            user_id: spec.user_id,
            prompt_name: spec.prompt_name,
            model: prompt.model,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.put(&record)?;
        info!(
            "Created session {} bound to prompt '{}'",
            record.id, record.prompt_name
        );
        Ok(record.id)
    }

    /// Loads the session stored under `session_id`, if any
    ///
    /// Each call returns an independent in-memory copy; concurrent saves on
    /// separately mutated copies are last-writer-wins.
    pub fn get(&self, session_id: &str) -> Result<Option<ChatSession>> {
        match self.backend.get(NS_SESSIONS, session_id)? {
            Some(bytes) => {
                let record: SessionRecord = serde_json::from_slice(&bytes)?;
                debug!(
                    "Loaded session {} ({} messages)",
                    record.id,
                    record.history.len()
                );
                Ok(Some(ChatSession {
                    record,
                    backend: Arc::clone(&self.backend),
                    prompts: self.prompts.clone(),
                    staging: self.staging.clone(),
                }))
            }
            None => Ok(None),
        }
    }

    /// Lists stored sessions, most recently updated first
    pub fn list(&self) -> Result<Vec<StoredSessionSummary>> {
        let mut summaries = Vec::new();
        for bytes in self.backend.list(NS_SESSIONS)? {
            let record: SessionRecord = serde_json::from_slice(&bytes)?;
            summaries.push(StoredSessionSummary {
                id: record.id,
                prompt_name: record.prompt_name,
                model: record.model,
                message_count: record.history.len(),
                created_at: record.created_at,
                updated_at: record.updated_at,
            });
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Removes the session stored under `session_id`; missing ids are a no-op
    pub fn delete(&self, session_id: &str) -> Result<()> {
        self.backend.delete(NS_SESSIONS, session_id)?;
        info!("Deleted session {}", session_id);
        Ok(())
    }

    fn put(&self, record: &SessionRecord) -> Result<()> {
        let value = serde_json::to_vec(record)?;
        self.backend.set(NS_SESSIONS, &record.id, &value)
    }
}

/// In-memory session aggregate
///
/// Owns its history until [`save`](Self::save) transfers the state back to
/// the store's durable copy.
pub struct ChatSession {
    record: SessionRecord,
    backend: Arc<dyn StorageBackend>,
    prompts: PromptStore,
    staging: MessageStagingArea,
}

impl ChatSession {
    /// Returns the session's identity and scope fields
    pub fn config(&self) -> SessionConfig {
        SessionConfig {
            session_id: self.record.id.clone(),
            prompt_name: self.record.prompt_name.clone(),
            doc_id: self.record.doc_id.clone(),
            workspace_id: self.record.workspace_id.clone(),
            user_id: self.record.user_id.clone(),
        }
    }

    /// Returns the model snapshotted at session creation
    pub fn model(&self) -> &str {
        &self.record.model
    }

    /// Returns the in-memory message history
    pub fn history(&self) -> &[Message] {
        &self.record.history
    }

    /// Appends a message to the in-memory history
    ///
    /// No persistence side effect; call [`save`](Self::save) to commit.
    pub fn push(&mut self, message: Message) {
        self.record.history.push(message);
    }

    /// Commits a staged message into this session's history
    ///
    /// Resolves `id` against the staging area, verifies the pending
    /// message was staged for this session, appends its content/role to the
    /// in-memory history, and atomically spends the staged record. The role
    /// defaults to `user` and the content to empty when the staged record
    /// left them unset.
    ///
    /// # Errors
    ///
    /// Returns `PromptStageError::MessageNotFound` when no pending message
    /// exists under `id` (including when it was already spent), and
    /// `PromptStageError::MessageOwnership` when the pending message was
    /// staged for a different session. An ownership failure does not
    /// consume the staged message.
    pub fn push_by_message_id(&mut self, id: &str) -> Result<()> {
        let pending = self
            .staging
            .resolve(id)?
            .ok_or_else(|| PromptStageError::MessageNotFound(id.to_string()))?;

        if pending.session_id != self.record.id {
            warn!(
                "Rejected staged message {}: staged for session {}, requested by {}",
                id, pending.session_id, self.record.id
            );
            return Err(PromptStageError::MessageOwnership {
                message_id: id.to_string(),
                owner: pending.session_id,
                requested: self.record.id.clone(),
            }
            .into());
        }

        // The ownership peek above does not reserve the record; the atomic
        // take decides the winner if two commits race on the same id.
        let pending = self
            .staging
            .take(id)?
            .ok_or_else(|| PromptStageError::MessageNotFound(id.to_string()))?;

        self.record.history.push(
            Message {
                role: pending.role.unwrap_or(Role::User),
                content: pending.content.unwrap_or_default(),
                created_at: None,
            }
            .timestamped(),
        );
        debug!("Committed staged message {} into session {}", id, self.record.id);
        Ok(())
    }

    /// Renders the bound prompt and appends the accumulated history
    ///
    /// Re-resolves the prompt by name, renders its template messages with
    /// the given bindings, then appends the session's history verbatim
    /// after the rendered prefix, preserving push order. Pure projection:
    /// nothing is persisted, so the same session can be previewed
    /// repeatedly with different bindings.
    ///
    /// # Errors
    ///
    /// Returns `PromptStageError::PromptNotFound` when the bound prompt has
    /// been deleted since session creation, or a validation error from
    /// rendering.
    pub fn finish(&self, bindings: &Bindings) -> Result<Vec<Message>> {
        let prompt = self
            .prompts
            .get(&self.record.prompt_name)?
            .ok_or_else(|| PromptStageError::PromptNotFound(self.record.prompt_name.clone()))?;

        let mut messages = prompt.finish(bindings)?;
        messages.extend(self.record.history.iter().cloned());
        Ok(messages)
    }

    /// Persists the in-memory history back to the store
    ///
    /// Replaces the durable record's history with the current in-memory
    /// state (not a merge) and refreshes `updated_at`. Concurrent saves on
    /// independently mutated copies of the same session are
    /// last-writer-wins; this store provides no optimistic-concurrency
    /// detection.
    pub fn save(&mut self) -> Result<()> {
        self.record.updated_at = Utc::now();
        let value = serde_json::to_vec(&self.record)?;
        self.backend.set(NS_SESSIONS, &self.record.id, &value)?;
        info!(
            "Saved session {} ({} messages)",
            self.record.id,
            self.record.history.len()
        );
        Ok(())
    }
}
