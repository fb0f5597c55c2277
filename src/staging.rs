//! Message staging area
//!
//! Pending messages are created independently of any in-memory session
//! object, for example by a transport handler that only knows the target
//! session id. They are resolved later by id and committed into exactly one
//! session. Creation deliberately performs no session-existence check, so
//! staging never forces a synchronous cross-component lookup in a hot path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ulid::Ulid;

use crate::error::{PromptStageError, Result};
use crate::message::Role;
use crate::storage::{StorageBackend, NS_PENDING};

/// Message staged for later attachment to a session
///
/// Single-use: a successful commit consumes the record, after which the id
/// no longer resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMessage {
    /// Unique message identifier (ULID)
    pub id: String,
    /// Session this message is destined for
    pub session_id: String,
    /// Message content, if already known at staging time
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<String>,
    /// Message role, defaults to `user` at commit time when absent
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<Role>,
    /// Staging timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for staging a new pending message
#[derive(Debug, Clone, Default)]
pub struct NewPendingMessage {
    /// Session the message is destined for
    pub session_id: String,
    /// Optional message content
    pub content: Option<String>,
    /// Optional message role
    pub role: Option<Role>,
}

/// Generate a new ULID for a staged message
///
/// ULIDs are sortable by timestamp, so staged messages list in creation
/// order.
///
/// # Examples
///
/// ```
/// use promptstage::staging::new_message_id;
///
/// let id = new_message_id();
/// assert_eq!(id.len(), 26);
/// ```
pub fn new_message_id() -> String {
    Ulid::new().to_string()
}

/// Keyed collection of pending messages
///
/// Cloning the area clones the backend handle, not the data.
#[derive(Clone)]
pub struct MessageStagingArea {
    backend: Arc<dyn StorageBackend>,
}

impl MessageStagingArea {
    /// Creates a staging area over the given backend
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Stages a new pending message
    ///
    /// The target session is not required to exist yet; only a
    /// syntactically valid (non-empty) session id is required.
    ///
    /// # Errors
    ///
    /// Returns `PromptStageError::Validation` when the session id is empty.
    pub fn create_message(&self, spec: NewPendingMessage) -> Result<PendingMessage> {
        if spec.session_id.trim().is_empty() {
            return Err(PromptStageError::Validation {
                param: "session_id".to_string(),
                message: "session id must not be empty".to_string(),
            }
            .into());
        }

        let pending = PendingMessage {
            id: new_message_id(),
            session_id: spec.session_id,
            content: spec.content,
            role: spec.role,
            created_at: Utc::now(),
        };

        let value = serde_json::to_vec(&pending)?;
        self.backend.set(NS_PENDING, &pending.id, &value)?;
        debug!(
            "Staged message {} for session {}",
            pending.id, pending.session_id
        );
        Ok(pending)
    }

    /// Returns the pending message staged under `id`, without consuming it
    pub fn resolve(&self, id: &str) -> Result<Option<PendingMessage>> {
        match self.backend.get(NS_PENDING, id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Atomically consumes the pending message staged under `id`
    ///
    /// A given id can be taken at most once; concurrent callers race on the
    /// backend's atomic remove.
    pub(crate) fn take(&self, id: &str) -> Result<Option<PendingMessage>> {
        match self.backend.take(NS_PENDING, id)? {
            Some(bytes) => {
                let pending: PendingMessage = serde_json::from_slice(&bytes)?;
                debug!("Consumed staged message {}", id);
                Ok(Some(pending))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn create_test_area() -> MessageStagingArea {
        MessageStagingArea::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn test_new_message_id_is_ulid_shaped() {
        let id = new_message_id();
        assert_eq!(id.len(), 26);
    }

    #[test]
    fn test_new_message_id_is_unique() {
        assert_ne!(new_message_id(), new_message_id());
    }

    #[test]
    fn test_create_message_assigns_id_and_timestamp() {
        let area = create_test_area();
        let pending = area
            .create_message(NewPendingMessage {
                session_id: "session-1".to_string(),
                content: Some("hello".to_string()),
                role: Some(Role::User),
            })
            .unwrap();

        assert_eq!(pending.id.len(), 26);
        assert_eq!(pending.session_id, "session-1");
        assert_eq!(pending.content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_create_message_without_existing_session() {
        // Staging is decoupled from session validity.
        let area = create_test_area();
        let pending = area
            .create_message(NewPendingMessage {
                session_id: "no-such-session".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert!(area.resolve(&pending.id).unwrap().is_some());
    }

    #[test]
    fn test_create_message_rejects_empty_session_id() {
        let area = create_test_area();
        let err = area
            .create_message(NewPendingMessage::default())
            .unwrap_err();
        let err = err.downcast_ref::<PromptStageError>().unwrap();
        assert!(matches!(
            err,
            PromptStageError::Validation { param, .. } if param == "session_id"
        ));
    }

    #[test]
    fn test_create_message_rejects_blank_session_id() {
        let area = create_test_area();
        assert!(area
            .create_message(NewPendingMessage {
                session_id: "   ".to_string(),
                ..Default::default()
            })
            .is_err());
    }

    #[test]
    fn test_resolve_unknown_id_returns_none() {
        let area = create_test_area();
        assert!(area.resolve("never-staged").unwrap().is_none());
    }

    #[test]
    fn test_resolve_does_not_consume() {
        let area = create_test_area();
        let pending = area
            .create_message(NewPendingMessage {
                session_id: "s".to_string(),
                ..Default::default()
            })
            .unwrap();

        assert!(area.resolve(&pending.id).unwrap().is_some());
        assert!(area.resolve(&pending.id).unwrap().is_some());
    }

    #[test]
    fn test_take_consumes_exactly_once() {
        let area = create_test_area();
        let pending = area
            .create_message(NewPendingMessage {
                session_id: "s".to_string(),
                content: Some("staged".to_string()),
                role: None,
            })
            .unwrap();

        let taken = area.take(&pending.id).unwrap().expect("first take");
        assert_eq!(taken.content.as_deref(), Some("staged"));
        assert!(area.take(&pending.id).unwrap().is_none());
        assert!(area.resolve(&pending.id).unwrap().is_none());
    }

    #[test]
    fn test_pending_message_serde_roundtrip() {
        let pending = PendingMessage {
            id: new_message_id(),
            session_id: "s".to_string(),
            content: None,
            role: Some(Role::Assistant),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&pending).unwrap();
        assert!(!json.contains("content"));
        let back: PendingMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pending);
    }
}
