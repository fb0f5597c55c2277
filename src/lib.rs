//! PromptStage - prompt template rendering and chat session staging
//!
//! This library assembles structured conversational payloads for an
//! LLM-style consumer from named prompt definitions and caller-supplied
//! parameter bindings, and manages session state so that externally staged
//! messages can be committed into exactly one session.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `template`: constrained text substitution with allow-list validation
//!   and list iteration
//! - `message`: role-tagged message types and render-time binding values
//! - `prompt`: named prompt definitions and their store
//! - `session`: durable chat sessions and the in-memory session aggregate
//! - `staging`: pending messages awaiting commitment into a session
//! - `storage`: the namespaced key-value contract with memory and sled
//!   engines
//! - `error`: error types and result aliases
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use promptstage::{
//!     Message, MessageStagingArea, NewSession, PromptStore, Role, SessionStore,
//!     StorageBackend, TemplateMessage,
//! };
//! use promptstage::storage::MemoryBackend;
//!
//! fn main() -> promptstage::Result<()> {
//!     let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
//!     let prompts = PromptStore::new(Arc::clone(&backend));
//!     let staging = MessageStagingArea::new(Arc::clone(&backend));
//!     let sessions = SessionStore::new(backend, prompts.clone(), staging);
//!
//!     prompts.set(
//!         "greet",
//!         "gpt-4",
//!         vec![TemplateMessage::new(Role::System, "hello {{word}}")],
//!     )?;
//!
//!     let session_id = sessions.create(NewSession {
//!         doc_id: "doc-1".to_string(),
//!         workspace_id: "ws-1".to_string(),
//!         user_id: "user-1".to_string(),
//!         prompt_name: "greet".to_string(),
//!     })?;
//!
//!     let mut session = sessions.get(&session_id)?.expect("session exists");
//!     session.push(Message::user("how are you?"));
//!
//!     let bindings = HashMap::from([("word".to_string(), "world".into())]);
//!     let payload = session.finish(&bindings)?;
//!     assert_eq!(payload[0].content, "hello world");
//!     assert_eq!(payload[1].content, "how are you?");
//!
//!     session.save()?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod message;
pub mod prompt;
pub mod session;
pub mod staging;
pub mod storage;
pub mod template;

// Re-export commonly used types
pub use error::{PromptStageError, Result};
pub use message::{BindingValue, Bindings, Message, Role, TemplateMessage};
pub use prompt::{Prompt, PromptStore};
pub use session::{
    new_session_id, ChatSession, NewSession, SessionConfig, SessionRecord, SessionStore,
    StoredSessionSummary,
};
pub use staging::{new_message_id, MessageStagingArea, NewPendingMessage, PendingMessage};
pub use storage::{MemoryBackend, SledBackend, StorageBackend};
